use dutch_auction::*;
use std::io::Write;
use std::sync::Arc;

const DECAY: Amount = 3_300_000_000_000; // 0.0000033 per second
const WEEK: u64 = 604_800;

struct Harness {
    clock: Arc<ManualClock>,
    token: Arc<MintableToken>,
    custodian: Arc<ForwardingCustodian>,
    auction: AuctionInstance,
}

fn owner() -> Address {
    Address::from("0xowner")
}

fn wallet() -> Address {
    Address::from("0xwallet")
}

fn deploy(ceiling: Amount) -> Harness {
    let clock = Arc::new(ManualClock::new(1_700_000_000));
    let token = Arc::new(MintableToken::new());
    let custodian = Arc::new(ForwardingCustodian::new(wallet()));
    let config = AuctionConfig::new(owner(), wallet(), ceiling).unwrap();
    let auction = AuctionInstance::new(
        config,
        Address::from("0xauction"),
        Collaborators {
            clock: clock.clone(),
            token: token.clone(),
            custodian: custodian.clone(),
        },
    )
    .unwrap();

    Harness {
        clock,
        token,
        custodian,
        auction,
    }
}

/// Ceiling 20, price 2 decaying 0.0000033/s over 7 days
fn weekly_sale() -> Harness {
    let mut h = deploy(20 * UNIT_SCALE);
    h.auction
        .configure(&owner(), SaleParameters::new(7, 2 * UNIT_SCALE, DECAY))
        .unwrap();
    h.auction.start(&owner()).unwrap();
    h
}

#[test]
fn test_deployed_state() {
    let h = deploy(20 * UNIT_SCALE);
    assert_eq!(h.auction.stage(), AuctionStage::Deployed);
    assert_eq!(h.auction.config().beneficiary, wallet());
    assert_eq!(h.auction.config().ceiling, 20 * UNIT_SCALE);
    assert_eq!(h.auction.total_received(), 0);
}

#[test]
fn test_price_tracks_elapsed_time() {
    let h = weekly_sale();
    h.clock.advance(123_456);
    assert_eq!(
        h.auction.current_unit_price().unwrap(),
        2 * UNIT_SCALE - DECAY * 123_456
    );
}

#[test]
fn test_bids_from_two_routes() {
    let mut h = weekly_sale();
    h.clock.advance(50_000);
    let value = 5 * UNIT_SCALE;

    // Plain payment and payment on behalf of another account
    h.auction.contribute(&Address::from("0x4"), value).unwrap();
    h.auction
        .contribute_for(&Address::from("0x9"), &Address::from("0x3"), value)
        .unwrap();

    assert_eq!(h.auction.contribution_of(&Address::from("0x3")), value);
    assert_eq!(h.auction.contribution_of(&Address::from("0x4")), value);
    assert_eq!(h.auction.total_received(), 2 * value);
    assert_eq!(h.custodian.forwarded(), 2 * value);
}

#[test]
fn test_scenario_ceiling_reached() {
    let mut h = weekly_sale();
    h.clock.advance(123_456);

    let bidder = Address::from("0x3");
    let receipt = h.auction.contribute(&bidder, 25 * UNIT_SCALE).unwrap();

    assert_eq!(receipt.accepted, 20 * UNIT_SCALE);
    assert_eq!(receipt.refund, 5 * UNIT_SCALE);
    assert!(receipt.closed);
    assert!(receipt.escrow_minted);
    assert_eq!(h.auction.contribution_of(&bidder), 20 * UNIT_SCALE);
    assert_eq!(h.auction.stage(), AuctionStage::Closed);
    assert_eq!(h.auction.close_reason(), Some(CloseReason::CeilingReached));

    let price = h.auction.current_unit_price().unwrap();
    assert_eq!(price, 1_592_595_200_000_000_000);

    // Escrow holds ceil(total × scale / price)
    assert_eq!(
        h.token.balance_of(&Address::from("0xauction")),
        12_558_118_974_614_515_980
    );

    let minted = h.auction.claim_tokens(&bidder).unwrap();
    assert_eq!(minted, 12_558_118_974_614_515_980);
    assert_eq!(h.token.balance_of(&bidder), minted);
}

#[test]
fn test_scenario_deadline_reached() {
    let mut h = weekly_sale();
    h.clock.advance(100_000);

    let early = Address::from("0x4");
    h.auction.contribute(&early, UNIT_SCALE).unwrap();

    h.clock.advance(721_200);
    assert_eq!(
        h.auction.contribute(&Address::from("0x5"), UNIT_SCALE),
        Err(AuctionError::AuctionAlreadyExpired)
    );

    assert_eq!(h.auction.stage(), AuctionStage::Closed);
    assert_eq!(h.auction.close_reason(), Some(CloseReason::Deadline));
    assert_eq!(h.auction.total_received(), UNIT_SCALE);
    assert_eq!(h.custodian.forwarded(), UNIT_SCALE);

    let price = h.auction.current_unit_price().unwrap();
    assert_eq!(price, 2 * UNIT_SCALE - DECAY * WEEK as Amount);
    assert_eq!(price, 4_160_000_000_000_000);

    let escrow = h.token.balance_of(&Address::from("0xauction"));
    assert_eq!(escrow, 240_384_615_384_615_384_616);

    assert_eq!(h.auction.claim_tokens(&early).unwrap(), escrow);
    assert_eq!(h.token.balance_of(&early), escrow);
}

#[test]
fn test_closing_price_survives_time() {
    let mut h = weekly_sale();
    h.clock.advance(10);
    h.auction.contribute(&Address::from("0x3"), 20 * UNIT_SCALE).unwrap();
    let price = h.auction.closing_price().unwrap();

    for _ in 0..5 {
        h.clock.advance(WEEK);
        h.auction.update_stage().unwrap();
        assert_eq!(h.auction.current_unit_price().unwrap(), price);
        assert_eq!(h.auction.closing_price(), Some(price));
    }
}

#[test]
fn test_scenario_contribute_never_configured() {
    let mut h = deploy(20 * UNIT_SCALE);
    let before = h.auction.snapshot();

    assert_eq!(
        h.auction.contribute(&Address::from("0x3"), UNIT_SCALE),
        Err(AuctionError::NotTrading(AuctionStage::Deployed))
    );
    assert_eq!(h.auction.start(&owner()), Err(AuctionError::NotConfigured));
    assert_eq!(h.auction.snapshot(), before);
}

#[test]
fn test_contribute_configured_but_not_started() {
    let mut h = deploy(20 * UNIT_SCALE);
    h.auction
        .configure(&owner(), SaleParameters::new(7, 2 * UNIT_SCALE, DECAY))
        .unwrap();
    assert_eq!(
        h.auction.contribute(&Address::from("0x3"), UNIT_SCALE),
        Err(AuctionError::NotTrading(AuctionStage::Configured))
    );
    assert_eq!(
        h.auction.current_unit_price(),
        Err(AuctionError::NotTrading(AuctionStage::Configured))
    );
}

#[test]
fn test_each_claim_settles_in_full() {
    let mut h = deploy(3 * UNIT_SCALE);
    h.auction
        .configure(&owner(), SaleParameters::new(1, 3 * UNIT_SCALE, 0))
        .unwrap();
    h.auction.start(&owner()).unwrap();

    let bidders: Vec<Address> = ["a", "b", "c"].iter().map(|s| Address::from(*s)).collect();
    for bidder in &bidders {
        h.auction.contribute(bidder, UNIT_SCALE).unwrap();
    }
    assert_eq!(h.auction.stage(), AuctionStage::Closed);

    let escrow = h.token.balance_of(h.auction.escrow_address());
    assert_eq!(escrow, UNIT_SCALE);

    let per_bidder = SettlementCalculator::owed_tokens(UNIT_SCALE, 3 * UNIT_SCALE).unwrap();
    assert_eq!(per_bidder, 333_333_333_333_333_334);

    // Every contributor gets ceil(c × scale / price), last claimant included
    for bidder in &bidders {
        assert_eq!(h.auction.claim_tokens(bidder).unwrap(), per_bidder);
        assert_eq!(h.token.balance_of(bidder), per_bidder);
    }
    assert_eq!(h.auction.claimed_total(), 3 * per_bidder);
    assert_eq!(h.auction.claimed_total(), escrow + 2);
}

#[test]
fn test_large_ceiling_closes_at_ceiling() {
    let mut h = deploy(1_000 * UNIT_SCALE);
    h.auction
        .configure(&owner(), SaleParameters::new(7, 2 * UNIT_SCALE, DECAY))
        .unwrap();
    h.auction.start(&owner()).unwrap();
    h.clock.advance(123_456);

    let small = Address::from("0x3");
    let large = Address::from("0x4");
    h.auction.contribute(&small, 400 * UNIT_SCALE).unwrap();
    let receipt = h.auction.contribute(&large, 700 * UNIT_SCALE).unwrap();
    assert_eq!(receipt.accepted, 600 * UNIT_SCALE);
    assert_eq!(receipt.refund, 100 * UNIT_SCALE);
    assert!(receipt.closed && receipt.escrow_minted);
    assert_eq!(h.auction.close_reason(), Some(CloseReason::CeilingReached));
    assert_eq!(h.auction.closing_price(), Some(1_592_595_200_000_000_000));

    let escrow = h.token.balance_of(&Address::from("0xauction"));
    assert_eq!(escrow, 627_905_948_730_725_798_998);

    assert_eq!(h.auction.claim_tokens(&small).unwrap(), 251_162_379_492_290_319_600);
    assert_eq!(h.auction.claim_tokens(&large).unwrap(), 376_743_569_238_435_479_399);
    assert_eq!(h.auction.claimed_total(), escrow + 1);
}

#[test]
fn test_large_ceiling_closes_at_deadline() {
    let mut h = deploy(1_000 * UNIT_SCALE);
    h.auction
        .configure(&owner(), SaleParameters::new(7, 2 * UNIT_SCALE, DECAY))
        .unwrap();
    h.auction.start(&owner()).unwrap();

    let bidder = Address::from("0x3");
    h.auction.contribute(&bidder, 500 * UNIT_SCALE).unwrap();
    h.clock.advance(WEEK + 60);
    assert_eq!(h.auction.update_stage().unwrap(), AuctionStage::Closed);
    assert_eq!(h.auction.close_reason(), Some(CloseReason::Deadline));
    assert_eq!(h.auction.closing_price(), Some(4_160_000_000_000_000));
    assert!(h.auction.escrow_minted());

    let escrow = h.token.balance_of(&Address::from("0xauction"));
    assert_eq!(escrow, 120_192_307_692_307_692_307_693);
    assert_eq!(h.auction.claim_tokens(&bidder).unwrap(), escrow);
}

#[test]
fn test_unsettleable_ceiling_rejected_at_configure() {
    let mut h = deploy(Amount::MAX / 2);
    let err = h
        .auction
        .configure(&owner(), SaleParameters::new(7, 2 * UNIT_SCALE, DECAY))
        .unwrap_err();
    assert!(matches!(err, AuctionError::InvalidParameters(_)));
    assert_eq!(h.auction.stage(), AuctionStage::Deployed);
}

#[test]
fn test_deadline_takes_precedence_over_filling_bid() {
    let mut h = weekly_sale();
    let early = Address::from("0x4");
    h.auction.contribute(&early, 5 * UNIT_SCALE).unwrap();
    h.clock.advance(WEEK + 1);

    // Enough to reach the ceiling, but it arrives after the deadline.
    assert_eq!(
        h.auction.contribute(&Address::from("0x5"), 25 * UNIT_SCALE),
        Err(AuctionError::AuctionAlreadyExpired)
    );
    assert_eq!(h.auction.close_reason(), Some(CloseReason::Deadline));
    assert_eq!(h.auction.closing_price(), Some(2 * UNIT_SCALE - DECAY * WEEK as Amount));
    assert_eq!(h.auction.total_received(), 5 * UNIT_SCALE);
    assert_eq!(h.custodian.forwarded(), 5 * UNIT_SCALE);
    assert_eq!(h.auction.contribution_of(&Address::from("0x5")), 0);
}

#[test]
fn test_bid_at_exact_deadline_rejected() {
    let mut h = weekly_sale();
    h.clock.advance(WEEK);

    assert_eq!(
        h.auction.contribute(&Address::from("0x3"), UNIT_SCALE),
        Err(AuctionError::AuctionAlreadyExpired)
    );
    assert_eq!(h.auction.stage(), AuctionStage::Closed);
    assert_eq!(h.auction.close_reason(), Some(CloseReason::Deadline));
    assert_eq!(h.auction.snapshot().closed_at_elapsed, Some(WEEK));
    assert_eq!(h.auction.total_received(), 0);
    assert_eq!(h.custodian.forwarded(), 0);
}

#[test]
fn test_claim_is_idempotent() {
    let mut h = weekly_sale();
    let bidder = Address::from("0x3");
    h.auction.contribute(&bidder, 20 * UNIT_SCALE).unwrap();

    let first = h.auction.claim_tokens(&bidder).unwrap();
    assert_eq!(
        h.auction.claim_tokens(&bidder),
        Err(AuctionError::AlreadyClaimed("0x3".into()))
    );
    assert_eq!(h.token.balance_of(&bidder), first);
    assert!(h.auction.has_claimed(&bidder));
}

#[test]
fn test_claim_mint_failure_rolls_back() {
    let mut h = weekly_sale();
    let bidder = Address::from("0x3");
    h.auction.contribute(&bidder, 20 * UNIT_SCALE).unwrap();
    assert!(h.auction.escrow_minted());

    h.token.set_fail_mints(true);
    assert!(matches!(
        h.auction.claim_tokens(&bidder),
        Err(AuctionError::Collaborator(CollaboratorError::MintFailed(_)))
    ));
    assert!(!h.auction.has_claimed(&bidder));
    assert_eq!(h.auction.claimed_total(), 0);

    h.token.set_fail_mints(false);
    assert!(h.auction.claim_tokens(&bidder).unwrap() > 0);
}

#[test]
fn test_forward_failure_keeps_auction_open() {
    let mut h = weekly_sale();
    h.custodian.set_fail_forwards(true);
    assert!(matches!(
        h.auction.contribute(&Address::from("0x3"), 25 * UNIT_SCALE),
        Err(AuctionError::Collaborator(CollaboratorError::ForwardFailed(_)))
    ));
    assert_eq!(h.auction.stage(), AuctionStage::Trading);
    assert_eq!(h.auction.total_received(), 0);
    assert_eq!(h.token.total_supply(), 0);
}

#[test]
fn test_registry_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[auction]
owner = "0xowner"
beneficiary = "0xwallet"
ceiling = "20"

[sale]
duration_days = 7
initial_price = "2"
decay_rate = "0.0000033"
"#
    )
    .unwrap();

    let loaded = AuctionFile::load(file.path()).unwrap();
    let config = loaded.auction_config().unwrap();
    let sale = loaded.sale_parameters().unwrap().unwrap();

    let clock = Arc::new(ManualClock::new(0));
    let registry = AuctionRegistry::new(clock.clone());
    let id = registry
        .create(
            config.clone(),
            Arc::new(MintableToken::new()),
            Arc::new(ForwardingCustodian::new(config.beneficiary.clone())),
        )
        .unwrap();
    registry.configure(&id, &config.owner, sale).unwrap();
    registry.start(&id, &config.owner).unwrap();

    assert_eq!(registry.price_at(&id, WEEK).unwrap(), 4_160_000_000_000_000);
    clock.advance(WEEK);
    assert_eq!(registry.update_stage(&id).unwrap(), AuctionStage::Closed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_contributions_respect_ceiling() {
    let clock = Arc::new(ManualClock::new(0));
    let registry = Arc::new(AuctionRegistry::new(clock.clone()));
    let custodian = Arc::new(ForwardingCustodian::new(wallet()));
    let config = AuctionConfig::new(owner(), wallet(), 20 * UNIT_SCALE).unwrap();

    let id = registry
        .create(config, Arc::new(MintableToken::new()), custodian.clone())
        .unwrap();
    registry
        .configure(&id, &owner(), SaleParameters::new(7, 2 * UNIT_SCALE, DECAY))
        .unwrap();
    registry.start(&id, &owner()).unwrap();

    let mut handles = Vec::new();
    for i in 0..40 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            let bidder = Address::new(format!("bidder-{}", i));
            registry.contribute(&id, &bidder, UNIT_SCALE)
        }));
    }

    let mut accepted = 0;
    let mut closing_receipts = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(receipt) => {
                accepted += receipt.accepted;
                if receipt.closed {
                    closing_receipts += 1;
                }
            }
            Err(AuctionError::NotTrading(AuctionStage::Closed)) => rejected += 1,
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(accepted, 20 * UNIT_SCALE);
    assert_eq!(closing_receipts, 1);
    assert_eq!(rejected, 20);
    assert_eq!(custodian.forwarded(), 20 * UNIT_SCALE);

    let snapshot = registry.snapshot(&id).unwrap();
    assert_eq!(snapshot.stage, AuctionStage::Closed);
    assert_eq!(snapshot.total_received, 20 * UNIT_SCALE);
    assert_eq!(snapshot.contributors, 20);
}

#[tokio::test]
async fn test_price_reads_during_trading() {
    let clock = Arc::new(ManualClock::new(0));
    let registry = Arc::new(AuctionRegistry::new(clock.clone()));
    let id = registry
        .create(
            AuctionConfig::new(owner(), wallet(), 20 * UNIT_SCALE).unwrap(),
            Arc::new(MintableToken::new()),
            Arc::new(ForwardingCustodian::new(wallet())),
        )
        .unwrap();
    registry
        .configure(&id, &owner(), SaleParameters::new(7, 2 * UNIT_SCALE, DECAY))
        .unwrap();

    let reader = {
        let registry = registry.clone();
        tokio::spawn(async move {
            (0..WEEK)
                .step_by(86_400)
                .map(|t| registry.price_at(&id, t).unwrap())
                .collect::<Vec<_>>()
        })
    };

    let prices = reader.await.unwrap();
    assert_eq!(prices.len(), 7);
    assert!(prices.windows(2).all(|w| w[0] > w[1]));
}
