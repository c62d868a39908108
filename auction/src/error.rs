//! Auction error types

use thiserror::Error;

use crate::types::{Amount, AuctionStage};

/// Failures reported by the token ledger or funds custodian
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("Token mint failed: {0}")]
    MintFailed(String),

    #[error("Funds forwarding failed: {0}")]
    ForwardFailed(String),
}

/// Auction operation errors
///
/// Every variant is a rejection of the requested operation; the auction is
/// left exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuctionError {
    #[error("Invalid sale parameters: {0}")]
    InvalidParameters(String),

    #[error("Sale parameters already configured")]
    AlreadyConfigured,

    #[error("Sale parameters not configured")]
    NotConfigured,

    #[error("Auction already started")]
    AlreadyStarted,

    #[error("Auction is not trading (stage {0})")]
    NotTrading(AuctionStage),

    #[error("Auction deadline has already passed")]
    AuctionAlreadyExpired,

    #[error("Ceiling of {ceiling} already reached")]
    CapacityExhausted { ceiling: Amount },

    #[error("Auction is not closed (stage {0})")]
    AuctionNotClosed(AuctionStage),

    #[error("Tokens already claimed by {0}")]
    AlreadyClaimed(String),

    #[error("No contribution recorded for {0}")]
    NoContribution(String),

    #[error("Caller {0} is not the auction owner")]
    Unauthorized(String),

    #[error("Contribution amount must be greater than zero")]
    ZeroAmount,

    #[error("Arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error("Unknown auction: {0}")]
    UnknownAuction(String),
}

pub type Result<T> = std::result::Result<T, AuctionError>;

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid amount '{value}': {reason}")]
    InvalidAmount { value: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collaborator_error_converts() {
        let err: AuctionError = CollaboratorError::MintFailed("ledger offline".into()).into();
        assert_eq!(err.to_string(), "Token mint failed: ledger offline");
    }

    #[test]
    fn test_stage_in_message() {
        let err = AuctionError::NotTrading(AuctionStage::Deployed);
        assert_eq!(err.to_string(), "Auction is not trading (stage Deployed)");
    }
}
