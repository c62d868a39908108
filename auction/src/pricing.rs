//! Linear price decay
//!
//! `price = initial − decay × elapsed`, in currency base units per whole
//! token. Pure integer arithmetic so every host computes the same price.

use serde::{Deserialize, Serialize};

use crate::config::SaleParameters;
use crate::error::{AuctionError, Result};
use crate::types::Amount;

/// Price at `elapsed_seconds` for the given schedule
///
/// Does not clamp: callers only evaluate elapsed times inside the sale
/// window. Underflow below zero is reported as an overflow error.
pub fn current_price(initial_price: Amount, decay_rate: Amount, elapsed_seconds: u64) -> Result<Amount> {
    decay_rate
        .checked_mul(Amount::from(elapsed_seconds))
        .and_then(|decay| initial_price.checked_sub(decay))
        .ok_or(AuctionError::ArithmeticOverflow("price decay"))
}

/// Immutable copy of a sale's price schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingEngine {
    initial_price: Amount,
    decay_rate: Amount,
    duration_seconds: u64,
}

impl PricingEngine {
    pub fn new(params: &SaleParameters) -> Self {
        Self {
            initial_price: params.initial_unit_price,
            decay_rate: params.decay_rate_per_second,
            duration_seconds: params.duration_seconds(),
        }
    }

    pub fn initial_price(&self) -> Amount {
        self.initial_price
    }

    pub fn decay_rate(&self) -> Amount {
        self.decay_rate
    }

    pub fn duration_seconds(&self) -> u64 {
        self.duration_seconds
    }

    pub fn price_at(&self, elapsed_seconds: u64) -> Result<Amount> {
        let price = current_price(self.initial_price, self.decay_rate, elapsed_seconds)?;
        log::trace!("price at +{}s = {}", elapsed_seconds, price);
        Ok(price)
    }

    /// Price frozen when the sale runs out of time
    pub fn deadline_price(&self) -> Result<Amount> {
        self.price_at(self.duration_seconds)
    }

    pub fn is_expired(&self, elapsed_seconds: u64) -> bool {
        elapsed_seconds >= self.duration_seconds
    }

    /// Sampled `(elapsed, price)` points across the sale, always including the deadline
    pub fn curve(&self, step_seconds: u64) -> Result<Vec<(u64, Amount)>> {
        let step = step_seconds.max(1);
        let mut points = Vec::new();
        let mut elapsed = 0u64;
        while elapsed < self.duration_seconds {
            points.push((elapsed, self.price_at(elapsed)?));
            elapsed = elapsed.saturating_add(step);
        }
        points.push((self.duration_seconds, self.deadline_price()?));
        Ok(points)
    }
}
