//! Contribution accounting
//!
//! Per-contributor cumulative amounts plus the running total, clamped so
//! the total never exceeds the ceiling.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{AuctionError, Result};
use crate::types::{Address, Amount};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributionLedger {
    ceiling: Amount,
    contributions: HashMap<Address, Amount>,
    total_received: Amount,
}

impl ContributionLedger {
    pub fn new(ceiling: Amount) -> Self {
        Self {
            ceiling,
            contributions: HashMap::new(),
            total_received: 0,
        }
    }

    pub fn ceiling(&self) -> Amount {
        self.ceiling
    }

    pub fn total_received(&self) -> Amount {
        self.total_received
    }

    /// Capacity left before the ceiling
    pub fn remaining(&self) -> Amount {
        self.ceiling - self.total_received
    }

    pub fn is_full(&self) -> bool {
        self.total_received == self.ceiling
    }

    pub fn contribution_of(&self, address: &Address) -> Amount {
        self.contributions.get(address).copied().unwrap_or(0)
    }

    pub fn contributors(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.contributions.iter()
    }

    pub fn contributor_count(&self) -> usize {
        self.contributions.len()
    }

    /// Amount that `record` would accept, without mutating anything
    pub fn quote(&self, amount: Amount) -> Result<Amount> {
        if amount == 0 {
            return Err(AuctionError::ZeroAmount);
        }
        if self.is_full() {
            return Err(AuctionError::CapacityExhausted {
                ceiling: self.ceiling,
            });
        }
        Ok(amount.min(self.remaining()))
    }

    /// Record a contribution, returning `(accepted, new_total)`
    ///
    /// `accepted < amount` is a partial acceptance; the excess must not be
    /// charged to the contributor.
    pub fn record(&mut self, address: &Address, amount: Amount) -> Result<(Amount, Amount)> {
        let accepted = self.quote(amount)?;

        let entry = self.contribution_of(address);
        let updated_entry = entry
            .checked_add(accepted)
            .ok_or(AuctionError::ArithmeticOverflow("contribution"))?;
        let new_total = self.total_received + accepted;

        self.contributions.insert(address.clone(), updated_entry);
        self.total_received = new_total;

        Ok((accepted, new_total))
    }
}
