//! Multi-auction host
//!
//! Each auction lives behind its own mutex, so every mutating call on one
//! auction is serialized while different auctions proceed in parallel.
//! Price schedules are published separately once configured, so price
//! reads never wait on an auction's lock.

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};
use uuid::Uuid;

use crate::auction::{AuctionInstance, AuctionSnapshot, Collaborators, ContributionReceipt};
use crate::collaborators::{Clock, FundsCustodian, TokenLedger};
use crate::config::{AuctionConfig, SaleParameters};
use crate::error::{AuctionError, Result};
use crate::pricing::PricingEngine;
use crate::types::{Address, Amount, AuctionStage};

/// Opaque auction handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuctionId(Uuid);

impl AuctionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Account holding this auction's escrowed token supply
    pub fn escrow_address(&self) -> Address {
        Address::new(format!("escrow:{}", self.0))
    }
}

impl Default for AuctionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AuctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct AuctionEntry {
    auction: Mutex<AuctionInstance>,
    pricing: OnceLock<PricingEngine>,
}

pub struct AuctionRegistry {
    clock: Arc<dyn Clock>,
    auctions: DashMap<AuctionId, Arc<AuctionEntry>>,
}

impl AuctionRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            auctions: DashMap::new(),
        }
    }

    pub fn create(
        &self,
        config: AuctionConfig,
        token: Arc<dyn TokenLedger>,
        custodian: Arc<dyn FundsCustodian>,
    ) -> Result<AuctionId> {
        let id = AuctionId::new();
        let auction = AuctionInstance::new(
            config,
            id.escrow_address(),
            Collaborators {
                clock: self.clock.clone(),
                token,
                custodian,
            },
        )?;

        self.auctions.insert(
            id,
            Arc::new(AuctionEntry {
                auction: Mutex::new(auction),
                pricing: OnceLock::new(),
            }),
        );
        log::debug!("registered auction {}", id);
        Ok(id)
    }

    fn entry(&self, id: &AuctionId) -> Result<Arc<AuctionEntry>> {
        self.auctions
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AuctionError::UnknownAuction(id.to_string()))
    }

    /// Run `f` with exclusive access to one auction
    ///
    /// `configure` does not use this: it also publishes the pricing engine.
    fn with_auction<T>(
        &self,
        id: &AuctionId,
        f: impl FnOnce(&mut AuctionInstance) -> Result<T>,
    ) -> Result<T> {
        let entry = self.entry(id)?;
        let mut auction = entry.auction.lock();
        f(&mut auction)
    }

    pub fn configure(&self, id: &AuctionId, caller: &Address, params: SaleParameters) -> Result<()> {
        let entry = self.entry(id)?;
        let mut auction = entry.auction.lock();
        auction.configure(caller, params)?;
        if let Some(pricing) = auction.pricing() {
            let _ = entry.pricing.set(pricing);
        }
        Ok(())
    }

    pub fn start(&self, id: &AuctionId, caller: &Address) -> Result<u64> {
        self.with_auction(id, |auction| auction.start(caller))
    }

    pub fn contribute(&self, id: &AuctionId, address: &Address, amount: Amount) -> Result<ContributionReceipt> {
        self.with_auction(id, |auction| auction.contribute(address, amount))
    }

    pub fn contribute_for(
        &self,
        id: &AuctionId,
        payer: &Address,
        receiver: &Address,
        amount: Amount,
    ) -> Result<ContributionReceipt> {
        self.with_auction(id, |auction| auction.contribute_for(payer, receiver, amount))
    }

    pub fn claim_tokens(&self, id: &AuctionId, address: &Address) -> Result<Amount> {
        self.with_auction(id, |auction| auction.claim_tokens(address))
    }

    pub fn finalize_supply(&self, id: &AuctionId) -> Result<Amount> {
        self.with_auction(id, |auction| auction.finalize_supply())
    }

    pub fn update_stage(&self, id: &AuctionId) -> Result<AuctionStage> {
        self.with_auction(id, |auction| auction.update_stage())
    }

    pub fn current_unit_price(&self, id: &AuctionId) -> Result<Amount> {
        self.with_auction(id, |auction| auction.current_unit_price())
    }

    pub fn snapshot(&self, id: &AuctionId) -> Result<AuctionSnapshot> {
        self.with_auction(id, |auction| Ok(auction.snapshot()))
    }

    /// Schedule price at `elapsed_seconds`, without locking the auction
    pub fn price_at(&self, id: &AuctionId, elapsed_seconds: u64) -> Result<Amount> {
        let entry = self.entry(id)?;
        let pricing = entry.pricing.get().ok_or(AuctionError::NotConfigured)?;
        pricing.price_at(elapsed_seconds)
    }

    pub fn remove(&self, id: &AuctionId) -> Option<AuctionSnapshot> {
        let (_, entry) = self.auctions.remove(id)?;
        let snapshot = entry.auction.lock().snapshot();
        Some(snapshot)
    }

    pub fn ids(&self) -> Vec<AuctionId> {
        self.auctions.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.auctions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.auctions.is_empty()
    }
}
