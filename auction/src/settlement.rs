//! Token settlement arithmetic
//!
//! `amount × UNIT_SCALE` does not fit in u128 past ~340 whole currency
//! units, so the product is taken in 256 bits.

use ruint::aliases::U256;

use crate::error::{AuctionError, Result};
use crate::types::Amount;
use crate::UNIT_SCALE;

/// `ceil(a × b / denominator)` with a 256-bit intermediate
///
/// `None` when `denominator` is zero or the quotient does not fit in u128.
pub fn mul_div_ceil(a: Amount, b: Amount, denominator: Amount) -> Option<Amount> {
    if denominator == 0 {
        return None;
    }
    let product = U256::from(a) * U256::from(b);
    let denominator = U256::from(denominator);
    let mut quotient = product / denominator;
    if product % denominator != U256::ZERO {
        quotient += U256::from(1u8);
    }
    Amount::try_from(quotient).ok()
}

pub struct SettlementCalculator;

impl SettlementCalculator {
    /// Tokens owed for `contribution` at `closing_price`
    ///
    /// `ceil(contribution × UNIT_SCALE / closing_price)`. Each call rounds up
    /// by at most one base unit.
    pub fn owed_tokens(contribution: Amount, closing_price: Amount) -> Result<Amount> {
        mul_div_ceil(contribution, UNIT_SCALE, closing_price)
            .ok_or(AuctionError::ArithmeticOverflow("token settlement"))
    }

    /// Escrow supply minted at close for the whole `total_received`
    pub fn escrow_supply(total_received: Amount, closing_price: Amount) -> Result<Amount> {
        Self::owed_tokens(total_received, closing_price)
    }
}
