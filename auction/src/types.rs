//! Shared auction types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Currency or token quantity in base units
pub type Amount = u128;

/// Account identifier understood by the token ledger
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Lifecycle stage of an auction
///
/// Stages only ever move forward: `Deployed → Configured → Trading → Closed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AuctionStage {
    /// Created, no sale parameters yet
    Deployed,
    /// Sale parameters set, waiting for start
    Configured,
    /// Accepting contributions
    Trading,
    /// Closing price frozen, claims open
    Closed,
}

impl fmt::Display for AuctionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuctionStage::Deployed => "Deployed",
            AuctionStage::Configured => "Configured",
            AuctionStage::Trading => "Trading",
            AuctionStage::Closed => "Closed",
        };
        f.write_str(name)
    }
}
