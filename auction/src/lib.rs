//! Dutch Auction Engine
//!
//! A time-and-cap-bounded Dutch auction selling a mint-on-demand token:
//! - Price starts high and decays linearly with elapsed seconds
//! - The sale closes at the ceiling or the deadline, whichever comes first
//! - The closing price is frozen and used to mint tokens pro-rata to
//!   every contributor
//!
//! Token ledger, funds custody and time are external collaborators
//! reached through the traits in [`collaborators`].

pub mod auction;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod ledger;
pub mod pricing;
pub mod registry;
pub mod settlement;
pub mod types;
pub mod units;

pub use auction::{
    AuctionInstance, AuctionSnapshot, CloseReason, Collaborators, ContributionReceipt,
};
pub use collaborators::{
    Clock, FundsCustodian, ForwardingCustodian, ManualClock, MintableToken, SystemClock,
    TokenLedger,
};
pub use config::{AuctionConfig, AuctionFile, SaleParameters};
pub use error::{AuctionError, CollaboratorError, ConfigError, Result};
pub use ledger::ContributionLedger;
pub use pricing::PricingEngine;
pub use registry::{AuctionId, AuctionRegistry};
pub use settlement::SettlementCalculator;
pub use types::{Address, Amount, AuctionStage};

/// Base units per whole token (18 decimals)
pub const UNIT_SCALE: Amount = 1_000_000_000_000_000_000;

/// Decimal places of both the currency and the token
pub const DECIMALS: u32 = 18;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Lowest closing price a sale may be configured to reach
pub const MIN_UNIT_PRICE: Amount = 1;
