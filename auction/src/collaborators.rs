//! External collaborators: clock, token ledger and funds custodian
//!
//! The engine only talks to these through the traits below. In-memory
//! implementations are provided for hosting auctions in-process and for
//! tests.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::error::CollaboratorError;
use crate::types::{Address, Amount};

/// Source of current time in seconds; never goes backwards
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// Fungible token that the auction can mint into
pub trait TokenLedger: Send + Sync {
    fn mint(&self, to: &Address, quantity: Amount) -> Result<(), CollaboratorError>;
    fn balance_of(&self, owner: &Address) -> Amount;
    fn total_supply(&self) -> Amount;
}

/// Moves accepted currency to the beneficiary
pub trait FundsCustodian: Send + Sync {
    fn beneficiary(&self) -> &Address;
    fn forward(&self, amount: Amount) -> Result<(), CollaboratorError>;
}

/// Wall clock, clamped to be monotonic
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicU64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        let wall = Utc::now().timestamp().max(0) as u64;
        let previous = self.last.fetch_max(wall, Ordering::SeqCst);
        previous.max(wall)
    }
}

/// Manually driven clock for simulations and tests
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn advance(&self, seconds: u64) -> u64 {
        self.now.fetch_add(seconds, Ordering::SeqCst) + seconds
    }

    /// Jump to `timestamp`; earlier values are ignored
    pub fn set(&self, timestamp: u64) {
        self.now.fetch_max(timestamp, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// In-memory mintable token
#[derive(Debug, Default)]
pub struct MintableToken {
    balances: RwLock<HashMap<Address, Amount>>,
    total_supply: RwLock<Amount>,
    fail_mints: AtomicBool,
}

impl MintableToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent mints fail until switched back
    pub fn set_fail_mints(&self, fail: bool) {
        self.fail_mints.store(fail, Ordering::SeqCst);
    }

    pub fn holders(&self) -> Vec<(Address, Amount)> {
        let mut holders: Vec<_> = self
            .balances
            .read()
            .iter()
            .map(|(a, b)| (a.clone(), *b))
            .collect();
        holders.sort();
        holders
    }
}

impl TokenLedger for MintableToken {
    fn mint(&self, to: &Address, quantity: Amount) -> Result<(), CollaboratorError> {
        if self.fail_mints.load(Ordering::SeqCst) {
            return Err(CollaboratorError::MintFailed(format!(
                "mint of {} to {} refused",
                quantity, to
            )));
        }

        let mut supply = self.total_supply.write();
        let new_supply = supply
            .checked_add(quantity)
            .ok_or_else(|| CollaboratorError::MintFailed("total supply overflow".to_string()))?;

        let mut balances = self.balances.write();
        let balance = balances.entry(to.clone()).or_insert(0);
        *balance = balance
            .checked_add(quantity)
            .ok_or_else(|| CollaboratorError::MintFailed("balance overflow".to_string()))?;
        *supply = new_supply;
        Ok(())
    }

    fn balance_of(&self, owner: &Address) -> Amount {
        self.balances.read().get(owner).copied().unwrap_or(0)
    }

    fn total_supply(&self) -> Amount {
        *self.total_supply.read()
    }
}

/// Custodian that delivers straight to the beneficiary and keeps a tally
#[derive(Debug)]
pub struct ForwardingCustodian {
    beneficiary: Address,
    forwarded: RwLock<Amount>,
    fail_forwards: AtomicBool,
}

impl ForwardingCustodian {
    pub fn new(beneficiary: Address) -> Self {
        Self {
            beneficiary,
            forwarded: RwLock::new(0),
            fail_forwards: AtomicBool::new(false),
        }
    }

    /// Total delivered to the beneficiary so far
    pub fn forwarded(&self) -> Amount {
        *self.forwarded.read()
    }

    pub fn set_fail_forwards(&self, fail: bool) {
        self.fail_forwards.store(fail, Ordering::SeqCst);
    }
}

impl FundsCustodian for ForwardingCustodian {
    fn beneficiary(&self) -> &Address {
        &self.beneficiary
    }

    fn forward(&self, amount: Amount) -> Result<(), CollaboratorError> {
        if self.fail_forwards.load(Ordering::SeqCst) {
            return Err(CollaboratorError::ForwardFailed(format!(
                "transfer of {} to {} refused",
                amount, self.beneficiary
            )));
        }
        let mut forwarded = self.forwarded.write();
        *forwarded = forwarded
            .checked_add(amount)
            .ok_or_else(|| CollaboratorError::ForwardFailed("tally overflow".to_string()))?;
        Ok(())
    }
}
