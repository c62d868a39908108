//! Scripted auction simulation
//!
//! A script is a JSON list of steps replayed against an in-process auction
//! driven by a manual clock:
//!
//! ```json
//! { "steps": [
//!     { "advance": { "seconds": 3600 } },
//!     { "contribute": { "from": "0x3", "amount": "5" } },
//!     { "contribute": { "from": "0x9", "to": "0x4", "amount": "25" } },
//!     "update",
//!     { "claim": { "address": "0x3" } }
//! ] }
//! ```

use dutch_auction::units::{format_units, parse_units};
use dutch_auction::{
    Address, Amount, AuctionFile, AuctionId, AuctionRegistry, AuctionSnapshot, Clock,
    ForwardingCustodian, ManualClock, MintableToken, TokenLedger, DECIMALS,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Advance {
        seconds: u64,
    },
    Contribute {
        from: String,
        #[serde(default)]
        to: Option<String>,
        amount: String,
    },
    Claim {
        address: String,
    },
    Update,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Script {
    pub steps: Vec<Step>,
}

impl Script {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// What happened at one step
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub elapsed: u64,
    pub step: Step,
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub outcomes: Vec<StepOutcome>,
    pub snapshot: AuctionSnapshot,
    pub balances: Vec<(Address, String)>,
    pub forwarded: String,
}

fn amount(value: Amount) -> String {
    format_units(value, DECIMALS)
}

/// Replay `script` against a fresh auction built from `file`
pub fn run(file: &AuctionFile, script: &Script) -> Result<SimulationReport, Box<dyn std::error::Error>> {
    let config = file.auction_config()?;
    let sale = file
        .sale_parameters()?
        .ok_or("config has no [sale] section")?;

    let clock = Arc::new(ManualClock::new(chrono::Utc::now().timestamp().max(0) as u64));
    let token = Arc::new(MintableToken::new());
    let custodian = Arc::new(ForwardingCustodian::new(config.beneficiary.clone()));
    let registry = AuctionRegistry::new(clock.clone());

    let id: AuctionId = registry.create(config.clone(), token.clone(), custodian.clone())?;
    registry.configure(&id, &config.owner, sale)?;
    let start = registry.start(&id, &config.owner)?;
    log::info!("simulating auction {} from {}", id, start);

    let mut outcomes = Vec::with_capacity(script.steps.len());
    for step in &script.steps {
        let result: Result<String, String> = match step {
            Step::Advance { seconds } => {
                clock.advance(*seconds);
                Ok(format!("clock advanced {}s", seconds))
            }
            Step::Contribute { from, to, amount: value } => {
                let payer = Address::new(from.clone());
                let receiver = to.clone().map(Address::new).unwrap_or_else(|| payer.clone());
                let value = parse_units(value, DECIMALS)?;
                registry
                    .contribute_for(&id, &payer, &receiver, value)
                    .map(|r| {
                        let mut message = format!(
                            "{} credited {} (total {})",
                            r.receiver,
                            amount(r.accepted),
                            amount(r.total_received)
                        );
                        if r.is_partial() {
                            message.push_str(&format!(", refund {}", amount(r.refund)));
                        }
                        if r.closed {
                            message.push_str(", auction closed");
                        }
                        message
                    })
                    .map_err(|e| e.to_string())
            }
            Step::Claim { address } => registry
                .claim_tokens(&id, &Address::new(address.clone()))
                .map(|minted| format!("{} received {} tokens", address, amount(minted)))
                .map_err(|e| e.to_string()),
            Step::Update => registry
                .update_stage(&id)
                .map(|stage| format!("stage {}", stage))
                .map_err(|e| e.to_string()),
        };

        let elapsed = clock.now().saturating_sub(start);
        let (ok, message) = match result {
            Ok(message) => (true, message),
            Err(message) => (false, message),
        };
        outcomes.push(StepOutcome {
            elapsed,
            step: step.clone(),
            ok,
            message,
        });
    }

    let snapshot = registry.snapshot(&id)?;
    let balances = token
        .holders()
        .into_iter()
        .map(|(holder, balance)| (holder, amount(balance)))
        .collect();
    debug_assert_eq!(token.total_supply(), snapshot.escrow_supply + snapshot.claimed_total);

    Ok(SimulationReport {
        outcomes,
        snapshot,
        balances,
        forwarded: amount(custodian.forwarded()),
    })
}
