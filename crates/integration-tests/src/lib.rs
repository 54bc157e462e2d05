//! End-to-end integration tests for the Dafo auction house.
//!
//! These tests exercise the full lifecycle through the call surface:
//! 1. Genesis and the first unpause
//! 2. Bidding, refunds and extensions
//! 3. Settlement with the reward mirror
//! 4. Sell-out, minter handover and concurrent callers

#![cfg(test)]

use std::sync::{Arc, Barrier};
use std::thread;

use dafo_module::handlers::{dispatch, handle_mint, CallContext};
use dafo_module::{AuctionParams, DafoCall, DafoError, DafoGenesisConfig, DafoState};
use dafo_types::{Address, Amount, CustomInput, DafoEvent, ReceiveBehavior, Role, TokenId};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const OWNER: Address = [0xaau8; 32];
const HOUSE: Address = [0xa4u8; 32];
const TREASURY: Address = [0xdau8; 32];
const ALICE: Address = [1u8; 32];
const BOB: Address = [2u8; 32];
const CAROL: Address = [3u8; 32];
const MALLORY: Address = [6u8; 32];
const REVERTER: Address = [7u8; 32];

const START: u64 = 1_700_000_000;
const DURATION: u64 = 24 * 60 * 60;
const END: u64 = START + DURATION;
const TIME_BUFFER: u64 = 15 * 60;

fn genesis(max_supply: u64, reward_period: u64) -> DafoGenesisConfig {
    DafoGenesisConfig {
        max_supply,
        owner: OWNER,
        rewards_recipient: TREASURY,
        auction_house: HOUSE,
        minter: None,
        reward_period,
        auction: AuctionParams {
            time_buffer: TIME_BUFFER,
            reserve_price: 2,
            min_bid_increment_percentage: 5,
            duration: DURATION,
        },
        balances: [ALICE, BOB, CAROL, MALLORY, REVERTER]
            .into_iter()
            .map(|address| (address, 1_000_000))
            .collect(),
        receive_behaviors: vec![
            (MALLORY, ReceiveBehavior::Consume(u64::MAX)),
            (REVERTER, ReceiveBehavior::Revert),
        ],
        ..Default::default()
    }
}

/// Drives the module the way a chain would: every call goes over the wire
/// encoding before it is dispatched.
struct Harness {
    state: DafoState,
    now: u64,
}

impl Harness {
    fn new(config: &DafoGenesisConfig) -> Self {
        Self {
            state: DafoState::from_genesis(config).expect("valid genesis"),
            now: START,
        }
    }

    fn call(&mut self, sender: Address, value: Amount, call: DafoCall) -> Result<Vec<DafoEvent>, DafoError> {
        let bytes = borsh::to_vec(&call).expect("encode call");
        let call: DafoCall = borsh::from_slice(&bytes).expect("decode call");
        let ctx = CallContext {
            sender,
            block_height: (self.now - START) / 12,
            timestamp: self.now,
            value,
        };
        dispatch(&mut self.state, &ctx, call)
    }

    fn bid(&mut self, bidder: Address, amount: Amount, custom_input: CustomInput) -> Result<Vec<DafoEvent>, DafoError> {
        self.call(bidder, amount, DafoCall::CreateBid { custom_input })
    }

    fn subject(&self) -> TokenId {
        self.state.house.auction().expect("auction").token_id()
    }
}

fn kinds(events: &[DafoEvent]) -> Vec<&'static str> {
    events.iter().map(DafoEvent::kind).collect()
}

fn traits(token_id: TokenId) -> CustomInput {
    CustomInput::new(token_id, Role::Activist, 2, true)
}

/// Test the complete auction flow through one full cycle.
#[test]
fn test_full_auction_lifecycle() -> anyhow::Result<()> {
    let mut chain = Harness::new(&genesis(10_000, 1));
    let total_value = chain.state.ledger.total_value();

    // ========================================
    // Phase 1: Nothing runs until the owner unpauses
    // ========================================

    assert_eq!(chain.bid(ALICE, 2, traits(1)), Err(DafoError::NoActiveAuction));
    assert_eq!(chain.call(ALICE, 0, DafoCall::Unpause), Err(DafoError::Unauthorized));

    let events = chain.call(OWNER, 0, DafoCall::Unpause)?;
    assert_eq!(kinds(&events), vec!["Unpaused", "AuctionCreated"]);
    assert_eq!(chain.subject(), 1);

    // ========================================
    // Phase 2: Bidding
    // ========================================

    chain.now += 60;
    assert_eq!(
        chain.bid(ALICE, 1, traits(1)),
        Err(DafoError::ReserveNotMet { required: 2, got: 1 })
    );
    chain.bid(ALICE, 2, traits(1))?;

    chain.now += 60;
    let events = chain.bid(BOB, 102, traits(1))?;
    assert_eq!(kinds(&events), vec!["PaymentSent", "AuctionBid"]);
    assert_eq!(chain.state.ledger.balance_of(&ALICE), 1_000_000);

    // A late bid pushes the end out by the buffer
    chain.now = END - 60;
    assert_eq!(
        chain.bid(CAROL, 106, traits(1)),
        Err(DafoError::IncrementTooSmall { required: 107, got: 106 })
    );
    let chosen = CustomInput::new(1, Role::Business, 1, false);
    let events = chain.bid(CAROL, 108, chosen)?;
    assert_eq!(kinds(&events), vec!["PaymentSent", "AuctionBid", "AuctionExtended"]);
    let extended_end = END - 60 + TIME_BUFFER;
    assert_eq!(chain.state.house.auction().map(|a| a.end_time), Some(extended_end));

    // ========================================
    // Phase 3: Settlement
    // ========================================

    chain.now = END;
    assert_eq!(
        chain.call(ALICE, 0, DafoCall::SettleCurrentAndCreateNewAuction),
        Err(DafoError::AuctionNotComplete)
    );

    chain.now = extended_end;
    let events = chain.call(ALICE, 0, DafoCall::SettleCurrentAndCreateNewAuction)?;
    assert_eq!(
        kinds(&events),
        vec!["DafoCreated", "DafoCreated", "PaymentSent", "AuctionSettled", "AuctionCreated"]
    );

    assert_eq!(chain.state.token.owner_of(1), Some(CAROL));
    assert_eq!(chain.state.token.owner_of(2), Some(TREASURY));
    assert_eq!(chain.state.token.ids().input_of(1), Some(&chosen));
    assert_eq!(chain.state.token.ids().input_of(2), Some(&chosen.with_token_id(2)));
    assert_eq!(chain.state.ledger.balance_of(&OWNER), 108);
    assert_eq!(chain.state.ledger.escrow(), 0);
    assert_eq!(chain.subject(), 3);

    assert!(chain.state.token.exists(0));
    assert_eq!(chain.state.token.royalty_info(1, 100)?, (TREASURY, 5));
    assert_eq!(chain.state.ledger.total_value(), total_value);

    println!("Lifecycle complete: {} events", chain.state.events.len());
    Ok(())
}

/// Adversarial receivers cannot block bidding or settlement.
#[test]
fn test_adversarial_receivers_are_paid_in_wrapped_asset() {
    let mut config = genesis(100, 1);
    config.owner = REVERTER;
    let mut chain = Harness::new(&config);
    let total_value = chain.state.ledger.total_value();
    chain.call(REVERTER, 0, DafoCall::Unpause).unwrap();

    chain.now += 10;
    chain.bid(MALLORY, 2, traits(1)).unwrap();
    chain.now += 10;
    let events = chain.bid(REVERTER, 3, traits(1)).unwrap();
    assert_eq!(
        events[0],
        DafoEvent::PaymentSent {
            to: MALLORY,
            amount: 2,
            wrapped: true,
        }
    );

    chain.now += 10;
    chain.bid(ALICE, 10, traits(1)).unwrap();
    assert_eq!(chain.state.ledger.wrapped_balance_of(&MALLORY), 2);
    assert_eq!(chain.state.ledger.wrapped_balance_of(&REVERTER), 3);
    assert_eq!(chain.state.ledger.balance_of(&MALLORY), 1_000_000 - 2);

    // Proceeds to an owner that rejects value still settle
    chain.now = END;
    let events = chain.call(BOB, 0, DafoCall::SettleAuction).unwrap();
    assert!(events.contains(&DafoEvent::PaymentSent {
        to: REVERTER,
        amount: 10,
        wrapped: true,
    }));
    assert_eq!(chain.state.token.owner_of(1), Some(ALICE));
    assert_eq!(chain.state.ledger.wrapped_reserve(), 15);
    assert_eq!(chain.state.ledger.total_value(), total_value);
}

/// Claims in random order exhaust the id space with no duplicates.
#[test]
fn test_random_order_claims_exhaust_supply() {
    let mut rng = StdRng::seed_from_u64(9);
    let mut ids: Vec<TokenId> = (1..=9).collect();
    ids.shuffle(&mut rng);

    let mut state = DafoState::from_genesis(&genesis(9, 0)).unwrap();
    let ctx = CallContext {
        sender: HOUSE,
        block_height: 1,
        timestamp: START,
        value: 0,
    };
    for id in &ids {
        handle_mint(&mut state, &ctx, traits(*id), ALICE).unwrap();
    }

    assert_eq!(state.token.total_supply(), 9);
    for from in 1..=9 {
        assert_eq!(
            state.token.find_next_available(from),
            Err(DafoError::SupplyExhausted)
        );
    }
    assert!(matches!(
        handle_mint(&mut state, &ctx, traits(ids[0]), ALICE),
        Err(DafoError::AlreadyClaimed(_))
    ));
}

/// Random preview starts with the reward mirror still claim every id once.
#[test]
fn test_mirrored_claims_never_collide() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut state = DafoState::from_genesis(&genesis(9, 1)).unwrap();
    let ctx = CallContext {
        sender: HOUSE,
        block_height: 1,
        timestamp: START,
        value: 0,
    };

    let mut claimed = Vec::new();
    while let Ok(next) = state.token.find_next_available(rng.gen_range(1..=9)) {
        let receipt = handle_mint(&mut state, &ctx, traits(next), BOB).unwrap();
        claimed.push(receipt.token_id());
        claimed.extend(receipt.reward_token_id());
    }

    claimed.sort_unstable();
    assert_eq!(claimed, (1..=9).collect::<Vec<_>>());
}

/// Auctions run until the id space is gone, then the house pauses itself.
#[test]
fn test_auctions_sell_out_and_pause() {
    let mut chain = Harness::new(&genesis(5, 1));
    chain.call(OWNER, 0, DafoCall::Unpause).unwrap();

    let mut subjects = Vec::new();
    while !chain.state.house.is_paused() {
        let subject = chain.subject();
        subjects.push(subject);
        chain.now += 100;
        chain.bid(ALICE, 2, traits(subject)).unwrap();
        chain.now += DURATION;
        chain
            .call(BOB, 0, DafoCall::SettleCurrentAndCreateNewAuction)
            .unwrap();
    }

    assert_eq!(subjects, vec![1, 3, 5]);
    for id in [1, 3, 5] {
        assert_eq!(chain.state.token.owner_of(id), Some(ALICE));
    }
    for id in [2, 4] {
        assert_eq!(chain.state.token.owner_of(id), Some(TREASURY));
    }
    assert_eq!(chain.state.events.last(), Some(&DafoEvent::Paused));

    // Unpausing a sold-out house pauses it again without opening an auction
    let events = chain.call(OWNER, 0, DafoCall::Unpause).unwrap();
    assert_eq!(kinds(&events), vec!["Unpaused", "Paused"]);
}

/// A minter change settles the live auction and hands over authority.
#[test]
fn test_minter_handover() {
    let mut chain = Harness::new(&genesis(10_000, 1));
    chain.call(OWNER, 0, DafoCall::Unpause).unwrap();
    chain.now += 100;
    chain.bid(BOB, 50, traits(1)).unwrap();

    chain.now += 100;
    let events = chain
        .call(OWNER, 0, DafoCall::SetMinter { minter: CAROL })
        .unwrap();
    assert_eq!(
        kinds(&events),
        vec![
            "DafoCreated",
            "DafoCreated",
            "PaymentSent",
            "AuctionSettled",
            "Paused",
            "MinterUpdated"
        ]
    );
    assert_eq!(chain.state.token.owner_of(1), Some(BOB));

    let mint = DafoCall::Mint {
        custom_input: traits(3),
        to: CAROL,
    };
    assert_eq!(chain.call(HOUSE, 0, mint.clone()), Err(DafoError::Unauthorized));
    chain.call(CAROL, 0, mint).unwrap();
    assert_eq!(chain.state.token.owner_of(3), Some(CAROL));
    assert_eq!(chain.state.token.owner_of(4), Some(TREASURY));

    // The house can still run an auction, but cannot mint its subject
    chain.call(OWNER, 0, DafoCall::Unpause).unwrap();
    assert_eq!(chain.subject(), 5);
    chain.bid(ALICE, 2, traits(5)).unwrap();
    chain.now += DURATION;
    let events = chain.call(ALICE, 0, DafoCall::SettleAuction).unwrap();
    assert_eq!(kinds(&events), vec!["PaymentSent", "AuctionSettled"]);
    assert_eq!(chain.state.ledger.balance_of(&ALICE), 1_000_000);
    assert!(!chain.state.token.exists(5));
}

/// Concurrent bidders serialized through one lock keep exactly one high bid.
#[test]
fn test_concurrent_bidders() {
    let bidders = [ALICE, BOB, CAROL, MALLORY];
    let rounds = 25;

    let mut state = DafoState::from_genesis(&genesis(10_000, 1)).unwrap();
    let owner_ctx = CallContext {
        sender: OWNER,
        block_height: 0,
        timestamp: START,
        value: 0,
    };
    dispatch(&mut state, &owner_ctx, DafoCall::Unpause).unwrap();
    let total_value = state.ledger.total_value();
    let shared = Arc::new(Mutex::new(state));

    let workers: Vec<_> = bidders
        .into_iter()
        .enumerate()
        .map(|(index, bidder)| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                for round in 0..rounds {
                    let mut state = shared.lock();
                    let auction = state.house.auction().cloned().expect("auction");
                    let amount = match auction.bidder {
                        Some(_) => state.house.params().min_next_bid(auction.amount),
                        None => state.house.params().reserve_price,
                    };
                    let ctx = CallContext {
                        sender: bidder,
                        block_height: round,
                        timestamp: START + 10 + index as u64,
                        value: amount,
                    };
                    dispatch(
                        &mut state,
                        &ctx,
                        DafoCall::CreateBid {
                            custom_input: traits(auction.token_id()),
                        },
                    )
                    .expect("bid accepted");
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("worker panicked");
    }

    let state = shared.lock();
    let auction = state.house.auction().expect("auction");
    let bids = state
        .events
        .iter()
        .filter(|event| matches!(event, DafoEvent::AuctionBid { .. }))
        .count();
    let refunds = state
        .events
        .iter()
        .filter(|event| matches!(event, DafoEvent::PaymentSent { .. }))
        .count();

    assert_eq!(bids, bidders.len() * rounds as usize);
    assert_eq!(refunds, bids - 1);
    assert_eq!(state.ledger.escrow(), auction.amount);
    assert_eq!(state.ledger.total_value(), total_value);
}

/// Two bidders quote the same minimum from one snapshot. The first to commit
/// wins; the second is re-checked against the new high bid and leaves no trace.
#[test]
fn test_stale_quote_rejected_after_competing_bid() {
    let mut chain = Harness::new(&genesis(10_000, 1));
    chain.call(OWNER, 0, DafoCall::Unpause).unwrap();
    chain.now = START + 60;
    let subject = chain.subject();

    chain.bid(ALICE, 100, traits(subject)).unwrap();
    let quote = chain.state.house.params().min_next_bid(100);
    assert_eq!(quote, 105);

    chain.bid(BOB, quote, traits(subject)).unwrap();

    let carol_balance = chain.state.ledger.balance_of(&CAROL);
    let escrow = chain.state.ledger.escrow();
    let event_count = chain.state.events.len();
    let before = chain.state.house.auction().cloned().expect("auction");

    assert_eq!(
        chain.bid(CAROL, quote, traits(subject)),
        Err(DafoError::IncrementTooSmall { required: 110, got: 105 })
    );

    let after = chain.state.house.auction().expect("auction");
    assert_eq!(after.bidder, Some(BOB));
    assert_eq!(after.amount, 105);
    assert_eq!(after.end_time, before.end_time);
    assert_eq!(chain.state.ledger.balance_of(&CAROL), carol_balance);
    assert_eq!(chain.state.ledger.escrow(), escrow);
    assert_eq!(chain.state.events.len(), event_count);

    chain.bid(CAROL, 110, traits(subject)).unwrap();
    assert_eq!(chain.state.house.auction().expect("auction").bidder, Some(CAROL));
}

/// The same race across threads: both read the quote, then both commit.
#[test]
fn test_concurrent_stale_quotes() {
    let mut state = DafoState::from_genesis(&genesis(10_000, 1)).unwrap();
    let owner_ctx = CallContext {
        sender: OWNER,
        block_height: 0,
        timestamp: START,
        value: 0,
    };
    dispatch(&mut state, &owner_ctx, DafoCall::Unpause).unwrap();
    let subject = state.house.auction().expect("auction").token_id();
    let opening = CallContext {
        sender: ALICE,
        block_height: 1,
        timestamp: START + 10,
        value: 100,
    };
    dispatch(&mut state, &opening, DafoCall::CreateBid { custom_input: traits(subject) }).unwrap();
    let total_value = state.ledger.total_value();

    let shared = Arc::new(Mutex::new(state));
    let quoted = Arc::new(Barrier::new(2));

    let workers: Vec<_> = [BOB, CAROL]
        .into_iter()
        .map(|bidder| {
            let shared = Arc::clone(&shared);
            let quoted = Arc::clone(&quoted);
            thread::spawn(move || {
                let quote = {
                    let state = shared.lock();
                    let auction = state.house.auction().expect("auction");
                    state.house.params().min_next_bid(auction.amount)
                };
                quoted.wait();

                let ctx = CallContext {
                    sender: bidder,
                    block_height: 2,
                    timestamp: START + 20,
                    value: quote,
                };
                let mut state = shared.lock();
                dispatch(&mut state, &ctx, DafoCall::CreateBid { custom_input: traits(subject) })
                    .map(|_| bidder)
            })
        })
        .collect();

    let outcomes: Vec<_> = workers
        .into_iter()
        .map(|worker| worker.join().expect("worker panicked"))
        .collect();

    let winners: Vec<Address> = outcomes.iter().filter_map(|outcome| outcome.clone().ok()).collect();
    let rejected: Vec<DafoError> = outcomes.iter().filter_map(|outcome| outcome.clone().err()).collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(rejected, vec![DafoError::IncrementTooSmall { required: 110, got: 105 }]);

    let state = shared.lock();
    let auction = state.house.auction().expect("auction");
    assert_eq!(auction.bidder, Some(winners[0]));
    assert_eq!(auction.amount, 105);
    assert_eq!(state.ledger.escrow(), 105);
    assert_eq!(state.ledger.total_value(), total_value);
    let bids = state
        .events
        .iter()
        .filter(|event| matches!(event, DafoEvent::AuctionBid { .. }))
        .count();
    assert_eq!(bids, 2);
}
