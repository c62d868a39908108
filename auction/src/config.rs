//! Auction configuration
//!
//! `AuctionConfig` is fixed at creation, `SaleParameters` at `configure`.
//! Both can be loaded from a TOML file:
//!
//! ```toml
//! [auction]
//! owner = "0xowner"
//! beneficiary = "0xwallet"
//! ceiling = "20"
//!
//! [sale]
//! duration_days = 7
//! initial_price = "2"
//! decay_rate = "0.0000033"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{AuctionError, ConfigError, Result};
use crate::types::{Address, Amount};
use crate::units::parse_units;
use crate::{DECIMALS, MIN_UNIT_PRICE, SECONDS_PER_DAY};

/// Creation-time settings of an auction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionConfig {
    /// Only account allowed to configure and start the sale
    pub owner: Address,
    /// Receives every accepted contribution
    pub beneficiary: Address,
    /// Maximum cumulative currency accepted
    pub ceiling: Amount,
}

impl AuctionConfig {
    pub fn new(owner: Address, beneficiary: Address, ceiling: Amount) -> Result<Self> {
        let config = Self {
            owner,
            beneficiary,
            ceiling,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ceiling == 0 {
            return Err(AuctionError::InvalidParameters(
                "ceiling must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Price schedule of the sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleParameters {
    pub duration_days: u64,
    /// Currency base units per whole token at elapsed = 0
    pub initial_unit_price: Amount,
    /// Price reduction per elapsed second
    pub decay_rate_per_second: Amount,
}

impl SaleParameters {
    pub fn new(duration_days: u64, initial_unit_price: Amount, decay_rate_per_second: Amount) -> Self {
        Self {
            duration_days,
            initial_unit_price,
            decay_rate_per_second,
        }
    }

    pub fn duration_seconds(&self) -> u64 {
        self.duration_days.saturating_mul(SECONDS_PER_DAY)
    }

    /// Total decay over the whole duration, `None` on overflow
    fn total_decay(&self) -> Option<Amount> {
        self.decay_rate_per_second
            .checked_mul(Amount::from(self.duration_seconds()))
    }

    /// Price reached at the deadline
    pub fn floor_price(&self) -> Amount {
        self.total_decay()
            .and_then(|decay| self.initial_unit_price.checked_sub(decay))
            .unwrap_or(0)
    }

    pub fn validate(&self) -> Result<()> {
        if self.duration_days == 0 {
            return Err(AuctionError::InvalidParameters(
                "duration must be at least one day".to_string(),
            ));
        }
        if self.initial_unit_price == 0 {
            return Err(AuctionError::InvalidParameters(
                "initial price must be greater than zero".to_string(),
            ));
        }

        let decay = self.total_decay().ok_or_else(|| {
            AuctionError::InvalidParameters("decay over duration overflows".to_string())
        })?;
        if decay >= self.initial_unit_price
            || self.initial_unit_price - decay < MIN_UNIT_PRICE
        {
            return Err(AuctionError::InvalidParameters(format!(
                "price would reach zero before expiry (initial {}, total decay {})",
                self.initial_unit_price, decay
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuctionSection {
    pub owner: String,
    pub beneficiary: String,
    /// Decimal currency amount
    pub ceiling: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SaleSection {
    pub duration_days: u64,
    /// Decimal currency per whole token
    pub initial_price: String,
    /// Decimal currency per whole token per second
    pub decay_rate: String,
}

/// On-disk auction description
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuctionFile {
    pub auction: AuctionSection,
    #[serde(default)]
    pub sale: Option<SaleSection>,
}

impl AuctionFile {
    pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> std::result::Result<Self, ConfigError> {
        let file: AuctionFile = toml::from_str(contents)?;
        file.auction_config()?;
        file.sale_parameters()?;
        Ok(file)
    }

    pub fn auction_config(&self) -> std::result::Result<AuctionConfig, ConfigError> {
        let ceiling = parse_units(&self.auction.ceiling, DECIMALS)?;
        AuctionConfig::new(
            Address::new(self.auction.owner.clone()),
            Address::new(self.auction.beneficiary.clone()),
            ceiling,
        )
        .map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Sale parameters, if the file carries a `[sale]` section
    pub fn sale_parameters(&self) -> std::result::Result<Option<SaleParameters>, ConfigError> {
        let Some(sale) = &self.sale else {
            return Ok(None);
        };

        let params = SaleParameters::new(
            sale.duration_days,
            parse_units(&sale.initial_price, DECIMALS)?,
            parse_units(&sale.decay_rate, DECIMALS)?,
        );
        params
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(Some(params))
    }
}
