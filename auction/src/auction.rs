//! Auction state machine
//!
//! `AuctionInstance` owns the contribution ledger, the price schedule and
//! the stage, and drives the token ledger and funds custodian.
//!
//! Closing is evaluated lazily: the auction notices that its deadline
//! passed on the next interaction, but freezes the price as of the
//! deadline itself.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::collaborators::{Clock, FundsCustodian, TokenLedger};
use crate::config::{AuctionConfig, SaleParameters};
use crate::error::{AuctionError, Result};
use crate::ledger::ContributionLedger;
use crate::pricing::PricingEngine;
use crate::settlement::SettlementCalculator;
use crate::types::{Address, Amount, AuctionStage};

/// External services an auction is wired to
#[derive(Clone)]
pub struct Collaborators {
    pub clock: Arc<dyn Clock>,
    pub token: Arc<dyn TokenLedger>,
    pub custodian: Arc<dyn FundsCustodian>,
}

/// Why trading stopped
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CloseReason {
    /// Total received reached the ceiling
    CeilingReached,
    /// Duration elapsed
    Deadline,
}

/// Successful contribution outcome
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContributionReceipt {
    pub payer: Address,
    pub receiver: Address,
    /// Amount credited and forwarded to the beneficiary
    pub accepted: Amount,
    /// Excess over the ceiling that was not charged
    pub refund: Amount,
    pub total_received: Amount,
    /// This contribution closed the auction
    pub closed: bool,
    /// The escrow supply was minted at close; false on a pending retry
    pub escrow_minted: bool,
}

impl ContributionReceipt {
    pub fn is_partial(&self) -> bool {
        self.refund > 0
    }
}

#[derive(Debug, Clone)]
struct Escrow {
    address: Address,
    supply: Amount,
    minted: bool,
}

/// Point-in-time view of an auction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuctionSnapshot {
    pub stage: AuctionStage,
    pub owner: Address,
    pub beneficiary: Address,
    pub ceiling: Amount,
    pub sale: Option<SaleParameters>,
    pub start_time: Option<u64>,
    pub total_received: Amount,
    pub contributors: usize,
    pub closing_price: Option<Amount>,
    pub closed_at_elapsed: Option<u64>,
    pub close_reason: Option<CloseReason>,
    pub escrow_address: Address,
    pub escrow_supply: Amount,
    pub escrow_minted: bool,
    pub claimed: usize,
    pub claimed_total: Amount,
}

pub struct AuctionInstance {
    config: AuctionConfig,
    sale: Option<SaleParameters>,
    pricing: Option<PricingEngine>,
    stage: AuctionStage,
    start_time: Option<u64>,
    ledger: ContributionLedger,
    closing_price: Option<Amount>,
    closed_at_elapsed: Option<u64>,
    close_reason: Option<CloseReason>,
    escrow: Escrow,
    claimed: HashSet<Address>,
    claimed_total: Amount,
    collaborators: Collaborators,
}

impl AuctionInstance {
    /// Create an auction in the `Deployed` stage
    ///
    /// `escrow` is the account that receives the full token supply at close.
    pub fn new(
        config: AuctionConfig,
        escrow: Address,
        collaborators: Collaborators,
    ) -> Result<Self> {
        config.validate()?;
        if collaborators.custodian.beneficiary() != &config.beneficiary {
            return Err(AuctionError::InvalidParameters(format!(
                "custodian forwards to {}, auction beneficiary is {}",
                collaborators.custodian.beneficiary(),
                config.beneficiary
            )));
        }

        log::info!(
            "auction deployed: owner={}, beneficiary={}, ceiling={}",
            config.owner,
            config.beneficiary,
            config.ceiling
        );

        Ok(Self {
            ledger: ContributionLedger::new(config.ceiling),
            config,
            sale: None,
            pricing: None,
            stage: AuctionStage::Deployed,
            start_time: None,
            closing_price: None,
            closed_at_elapsed: None,
            close_reason: None,
            escrow: Escrow {
                address: escrow,
                supply: 0,
                minted: false,
            },
            claimed: HashSet::new(),
            claimed_total: 0,
            collaborators,
        })
    }

    // ----- read accessors -------------------------------------------------

    pub fn stage(&self) -> AuctionStage {
        self.stage
    }

    pub fn config(&self) -> &AuctionConfig {
        &self.config
    }

    pub fn sale_parameters(&self) -> Option<&SaleParameters> {
        self.sale.as_ref()
    }

    /// Copy of the price schedule, usable without holding the auction
    pub fn pricing(&self) -> Option<PricingEngine> {
        self.pricing
    }

    pub fn start_time(&self) -> Option<u64> {
        self.start_time
    }

    pub fn closing_price(&self) -> Option<Amount> {
        self.closing_price
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason
    }

    pub fn total_received(&self) -> Amount {
        self.ledger.total_received()
    }

    pub fn contribution_of(&self, address: &Address) -> Amount {
        self.ledger.contribution_of(address)
    }

    pub fn ledger(&self) -> &ContributionLedger {
        &self.ledger
    }

    pub fn missing_funds_to_close(&self) -> Amount {
        self.ledger.remaining()
    }

    pub fn has_claimed(&self, address: &Address) -> bool {
        self.claimed.contains(address)
    }

    pub fn claimed_total(&self) -> Amount {
        self.claimed_total
    }

    pub fn escrow_address(&self) -> &Address {
        &self.escrow.address
    }

    pub fn escrow_minted(&self) -> bool {
        self.escrow.minted
    }

    pub fn snapshot(&self) -> AuctionSnapshot {
        AuctionSnapshot {
            stage: self.stage,
            owner: self.config.owner.clone(),
            beneficiary: self.config.beneficiary.clone(),
            ceiling: self.config.ceiling,
            sale: self.sale,
            start_time: self.start_time,
            total_received: self.ledger.total_received(),
            contributors: self.ledger.contributor_count(),
            closing_price: self.closing_price,
            closed_at_elapsed: self.closed_at_elapsed,
            close_reason: self.close_reason,
            escrow_address: self.escrow.address.clone(),
            escrow_supply: self.escrow.supply,
            escrow_minted: self.escrow.minted,
            claimed: self.claimed.len(),
            claimed_total: self.claimed_total,
        }
    }

    // ----- setup ----------------------------------------------------------

    fn ensure_owner(&self, caller: &Address) -> Result<()> {
        if caller != &self.config.owner {
            return Err(AuctionError::Unauthorized(caller.to_string()));
        }
        Ok(())
    }

    /// Set the price schedule (`Deployed → Configured`)
    pub fn configure(&mut self, caller: &Address, params: SaleParameters) -> Result<()> {
        self.ensure_owner(caller)?;
        if self.stage != AuctionStage::Deployed {
            return Err(AuctionError::AlreadyConfigured);
        }
        params.validate()?;

        // The closing price never drops below the floor, so a full sale
        // settled at the floor bounds every token amount this auction mints.
        if SettlementCalculator::escrow_supply(self.config.ceiling, params.floor_price()).is_err() {
            return Err(AuctionError::InvalidParameters(format!(
                "token supply for ceiling {} at floor price {} does not fit in 128 bits",
                self.config.ceiling,
                params.floor_price()
            )));
        }

        self.pricing = Some(PricingEngine::new(&params));
        self.sale = Some(params);
        self.stage = AuctionStage::Configured;

        log::info!(
            "auction configured: {} days, initial price {}, decay {}/s, floor {}",
            params.duration_days,
            params.initial_unit_price,
            params.decay_rate_per_second,
            params.floor_price()
        );
        Ok(())
    }

    /// Open trading (`Configured → Trading`)
    pub fn start(&mut self, caller: &Address) -> Result<u64> {
        self.ensure_owner(caller)?;
        match self.stage {
            AuctionStage::Deployed => return Err(AuctionError::NotConfigured),
            AuctionStage::Configured => {}
            AuctionStage::Trading | AuctionStage::Closed => {
                return Err(AuctionError::AlreadyStarted)
            }
        }

        let now = self.collaborators.clock.now();
        self.start_time = Some(now);
        self.stage = AuctionStage::Trading;

        log::info!("auction trading started at {}", now);
        Ok(now)
    }

    // ----- trading --------------------------------------------------------

    fn trading_pricing(&self) -> Result<PricingEngine> {
        match (self.stage, self.pricing) {
            (AuctionStage::Trading, Some(pricing)) => Ok(pricing),
            (stage, _) => Err(AuctionError::NotTrading(stage)),
        }
    }

    /// Seconds since trading started (0 before start)
    pub fn elapsed(&self) -> u64 {
        self.start_time
            .map(|start| self.collaborators.clock.now().saturating_sub(start))
            .unwrap_or(0)
    }

    /// Live price, or the frozen closing price once closed
    ///
    /// Past the deadline the deadline price is reported even if nobody has
    /// closed the auction yet.
    pub fn current_unit_price(&self) -> Result<Amount> {
        if let Some(price) = self.closing_price {
            return Ok(price);
        }
        let pricing = self.trading_pricing()?;
        pricing.price_at(self.elapsed().min(pricing.duration_seconds()))
    }

    /// Close the auction if its deadline has passed; returns the stage
    pub fn update_stage(&mut self) -> Result<AuctionStage> {
        self.close_if_expired()?;
        Ok(self.stage)
    }

    fn close_if_expired(&mut self) -> Result<bool> {
        let Ok(pricing) = self.trading_pricing() else {
            return Ok(false);
        };
        if !pricing.is_expired(self.elapsed()) {
            return Ok(false);
        }

        let price = pricing.deadline_price()?;
        self.close(pricing.duration_seconds(), price, CloseReason::Deadline);
        Ok(true)
    }

    /// Freeze the closing price and mint the escrow supply
    fn close(&mut self, elapsed: u64, price: Amount, reason: CloseReason) {
        self.closing_price = Some(price);
        self.closed_at_elapsed = Some(elapsed);
        self.close_reason = Some(reason);
        self.stage = AuctionStage::Closed;

        log::info!(
            "auction closed ({:?}) at +{}s: price {}, total received {}",
            reason,
            elapsed,
            price,
            self.ledger.total_received()
        );

        if let Err(e) = self.finalize_supply() {
            log::error!("escrow mint pending after close: {}", e);
        }
    }

    /// Contribute on one's own behalf
    pub fn contribute(&mut self, address: &Address, amount: Amount) -> Result<ContributionReceipt> {
        self.contribute_for(address, address, amount)
    }

    /// `payer` funds a contribution credited to `receiver`
    ///
    /// Only the accepted part is forwarded to the beneficiary; the excess is
    /// reported as `refund`. A contribution that reaches the ceiling closes
    /// the auction at the current price.
    pub fn contribute_for(
        &mut self,
        payer: &Address,
        receiver: &Address,
        amount: Amount,
    ) -> Result<ContributionReceipt> {
        let pricing = self.trading_pricing()?;

        if self.close_if_expired()? {
            log::warn!(
                "rejected contribution of {} from {}: deadline already passed",
                amount,
                payer
            );
            return Err(AuctionError::AuctionAlreadyExpired);
        }

        let elapsed = self.elapsed();
        let accepted = self.ledger.quote(amount)?;
        let new_total = self.ledger.total_received() + accepted;
        let closes = new_total == self.ledger.ceiling();

        // Price and supply are computed up front so nothing can fail after
        // the funds have moved.
        let closing = if closes {
            let price = pricing.price_at(elapsed)?;
            SettlementCalculator::escrow_supply(new_total, price)?;
            Some(price)
        } else {
            None
        };

        if let Err(e) = self.collaborators.custodian.forward(accepted) {
            log::error!("forwarding {} from {} failed: {}", accepted, payer, e);
            return Err(e.into());
        }

        let (accepted, total_received) = self.ledger.record(receiver, accepted)?;
        let refund = amount - accepted;
        if refund > 0 {
            log::warn!(
                "partial contribution from {}: accepted {} of {}, refund {}",
                payer,
                accepted,
                amount,
                refund
            );
        } else {
            log::debug!(
                "contribution from {} for {}: {} (total {})",
                payer,
                receiver,
                accepted,
                total_received
            );
        }

        if let Some(price) = closing {
            self.close(elapsed, price, CloseReason::CeilingReached);
        }

        Ok(ContributionReceipt {
            payer: payer.clone(),
            receiver: receiver.clone(),
            accepted,
            refund,
            total_received,
            closed: closes,
            escrow_minted: self.escrow.minted,
        })
    }

    // ----- settlement -----------------------------------------------------

    fn closed_price(&self) -> Result<Amount> {
        match (self.stage, self.closing_price) {
            (AuctionStage::Closed, Some(price)) => Ok(price),
            (stage, _) => Err(AuctionError::AuctionNotClosed(stage)),
        }
    }

    /// Mint the full supply into escrow; a no-op once done
    pub fn finalize_supply(&mut self) -> Result<Amount> {
        let price = self.closed_price()?;
        if self.escrow.minted {
            return Ok(self.escrow.supply);
        }

        let supply = SettlementCalculator::escrow_supply(self.ledger.total_received(), price)?;
        self.collaborators.token.mint(&self.escrow.address, supply)?;
        self.escrow.supply = supply;
        self.escrow.minted = true;

        log::info!("minted {} tokens to escrow {}", supply, self.escrow.address);
        Ok(supply)
    }

    /// Mint the tokens owed to `address`, once
    pub fn claim_tokens(&mut self, address: &Address) -> Result<Amount> {
        self.close_if_expired()?;
        let price = self.closed_price()?;

        if self.claimed.contains(address) {
            return Err(AuctionError::AlreadyClaimed(address.to_string()));
        }
        let contribution = self.ledger.contribution_of(address);
        if contribution == 0 {
            return Err(AuctionError::NoContribution(address.to_string()));
        }

        self.finalize_supply()?;

        let owed = SettlementCalculator::owed_tokens(contribution, price)?;

        self.claimed.insert(address.clone());
        if let Err(e) = self.collaborators.token.mint(address, owed) {
            self.claimed.remove(address);
            log::error!("claim mint for {} failed: {}", address, e);
            return Err(e.into());
        }
        self.claimed_total += owed;

        log::info!("{} claimed {} tokens for {}", address, owed, contribution);
        Ok(owed)
    }
}
