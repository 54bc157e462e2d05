//! Call handlers for the Dafo module.
//!
//! Each handler validates everything it needs before the first write, so a
//! failed call leaves the state untouched.

use crate::auction::AcceptedBid;
use crate::call::DafoCall;
use crate::error::DafoError;
use crate::refund::{transfer_with_fallback, PaymentReceipt};
use crate::registry::validate_custom_input;
use crate::state::DafoState as ModuleState;
use crate::token::MintReceipt;
use dafo_types::{format_address, Address, Auction, CustomInput, DafoEvent, Role, TokenId};
use tracing::{info, warn};

/// Context provided by the runtime for each call.
pub struct CallContext {
    /// Sender of the transaction
    pub sender: Address,
    /// Current block height
    pub block_height: u64,
    /// Current timestamp
    pub timestamp: u64,
    /// Value attached to the call (bids only)
    pub value: u64,
}

/// Result type for handlers.
pub type HandlerResult<T> = Result<T, DafoError>;

/// What settling an auction did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settlement {
    /// The auction as it was marked settled
    pub auction: Auction,
    /// `None` when there were no bids or the subject could not be minted
    pub winner: Option<Address>,
    pub minted: Option<MintReceipt>,
    /// Proceeds to the owner, or the refund to a winner who could not be minted
    pub payment: Option<PaymentReceipt>,
}

fn ensure_owner(state: &ModuleState, ctx: &CallContext) -> HandlerResult<()> {
    if ctx.sender != state.owner {
        return Err(DafoError::Unauthorized);
    }
    Ok(())
}

fn emit_payment(state: &mut ModuleState, receipt: &PaymentReceipt) {
    state.emit(DafoEvent::PaymentSent {
        to: receipt.to,
        amount: receipt.amount,
        wrapped: receipt.wrapped(),
    });
}

fn set_paused(state: &mut ModuleState, paused: bool) {
    if state.house.set_paused(paused) {
        info!(paused, "Auction house pause flag changed");
        state.emit(if paused {
            DafoEvent::Paused
        } else {
            DafoEvent::Unpaused
        });
    }
}

/// Handle Mint call.
pub fn handle_mint(
    state: &mut ModuleState,
    ctx: &CallContext,
    custom_input: CustomInput,
    to: Address,
) -> HandlerResult<MintReceipt> {
    let receipt = state
        .token
        .mint(&ctx.sender, custom_input, to, &state.traits)?;

    for event in receipt.events() {
        state.emit(event);
    }

    Ok(receipt)
}

/// Handle Burn call.
pub fn handle_burn(state: &mut ModuleState, ctx: &CallContext, token_id: TokenId) -> HandlerResult<()> {
    state.token.burn(&ctx.sender, token_id)?;
    state.emit(DafoEvent::DafoBurned { token_id });
    Ok(())
}

/// Open an auction on the next free id, starting at the previous subject.
///
/// Running out of ids is not an error: the house pauses itself instead.
fn create_auction(state: &mut ModuleState, now: u64) -> Option<TokenId> {
    let token_id = match state.token.find_next_available(state.house.preview_hint()) {
        Ok(token_id) => token_id,
        Err(err) => {
            warn!(%err, "Cannot create auction, pausing");
            set_paused(state, true);
            return None;
        }
    };

    let subject = CustomInput::new(token_id, Role::Academic, 0, false);
    let opened = state
        .house
        .open(subject, now)
        .map(|auction| (auction.start_time, auction.end_time));

    match opened {
        Ok((start_time, end_time)) => {
            info!(token_id, start_time, end_time, "Auction created");
            state.emit(DafoEvent::AuctionCreated {
                token_id,
                start_time,
                end_time,
            });
            Some(token_id)
        }
        Err(err) => {
            warn!(token_id, %err, "Auction not created");
            None
        }
    }
}

/// Handle CreateBid call. The attached value is the bid.
pub fn handle_create_bid(
    state: &mut ModuleState,
    ctx: &CallContext,
    custom_input: CustomInput,
) -> HandlerResult<AcceptedBid> {
    let amount = ctx.value;
    let token_id = custom_input.token_id;

    // Validate
    state.house.check_bid(&custom_input, amount, ctx.timestamp)?;
    if state.token.ids().is_claimed(token_id) {
        return Err(DafoError::SubjectAlreadyExists(token_id));
    }
    validate_custom_input(&state.traits, &custom_input)?;
    state.ledger.ensure_funds(&ctx.sender, amount)?;

    // Take the new bid, then make the previous bidder whole
    state.ledger.deposit_to_escrow(&ctx.sender, amount)?;
    let previous = state
        .house
        .auction()
        .and_then(|auction| auction.bidder.map(|bidder| (bidder, auction.amount)));
    if let Some((previous_bidder, previous_amount)) = previous {
        let receipt = transfer_with_fallback(&mut state.ledger, previous_bidder, previous_amount)?;
        emit_payment(state, &receipt);
    }

    let accepted = state
        .house
        .record_bid(ctx.sender, custom_input, amount, ctx.timestamp)?;

    info!(
        token_id,
        bidder = %format_address(&ctx.sender),
        amount,
        extended = accepted.extended_to.is_some(),
        "Bid accepted"
    );
    state.emit(DafoEvent::AuctionBid {
        token_id,
        bidder: ctx.sender,
        amount,
        extended: accepted.extended_to.is_some(),
    });
    if let Some(end_time) = accepted.extended_to {
        state.emit(DafoEvent::AuctionExtended { token_id, end_time });
    }

    Ok(accepted)
}

/// Settle the current auction. With `force` the end time is ignored.
fn settle(state: &mut ModuleState, now: u64, force: bool) -> HandlerResult<Settlement> {
    let auction = state.house.check_settle(now, force)?.clone();
    let token_id = auction.token_id();

    let mut winner = None;
    let mut minted = None;
    let mut payment = None;
    let mut amount = auction.amount;

    if let Some(bidder) = auction.bidder {
        let auction_house = state.auction_house;
        match state
            .token
            .mint(&auction_house, auction.custom_input, bidder, &state.traits)
        {
            Ok(receipt) => {
                for event in receipt.events() {
                    state.emit(event);
                }
                winner = Some(bidder);
                minted = Some(receipt);

                if amount > 0 {
                    let owner = state.owner;
                    let receipt = transfer_with_fallback(&mut state.ledger, owner, amount)?;
                    emit_payment(state, &receipt);
                    payment = Some(receipt);
                }
            }
            Err(err) => {
                warn!(
                    token_id,
                    bidder = %format_address(&bidder),
                    %err,
                    "Cannot mint auction subject, refunding winner"
                );
                let receipt = transfer_with_fallback(&mut state.ledger, bidder, amount)?;
                emit_payment(state, &receipt);
                payment = Some(receipt);
                amount = 0;
            }
        }
    }

    let settled = state.house.mark_settled()?;
    info!(
        token_id,
        winner = ?winner.as_ref().map(format_address),
        amount,
        "Auction settled"
    );
    state.emit(DafoEvent::AuctionSettled {
        token_id,
        winner,
        amount,
    });

    Ok(Settlement {
        auction: settled,
        winner,
        minted,
        payment,
    })
}

/// Handle SettleAuction call.
pub fn handle_settle_auction(state: &mut ModuleState, ctx: &CallContext) -> HandlerResult<Settlement> {
    settle(state, ctx.timestamp, false)
}

/// Handle SettleCurrentAndCreateNewAuction call.
///
/// Returns the settlement and the subject of the new auction, if one opened.
pub fn handle_settle_current_and_create_new_auction(
    state: &mut ModuleState,
    ctx: &CallContext,
) -> HandlerResult<(Settlement, Option<TokenId>)> {
    let settlement = settle(state, ctx.timestamp, false)?;
    let next = if state.house.is_paused() {
        None
    } else {
        create_auction(state, ctx.timestamp)
    };
    Ok((settlement, next))
}

/// Handle Pause call.
pub fn handle_pause(state: &mut ModuleState, ctx: &CallContext) -> HandlerResult<()> {
    ensure_owner(state, ctx)?;
    set_paused(state, true);
    Ok(())
}

/// Handle Unpause call. Opens an auction unless one is still pending.
pub fn handle_unpause(state: &mut ModuleState, ctx: &CallContext) -> HandlerResult<Option<TokenId>> {
    ensure_owner(state, ctx)?;
    set_paused(state, false);

    if state.house.can_create() {
        Ok(create_auction(state, ctx.timestamp))
    } else {
        Ok(None)
    }
}

/// Handle SetMinter call.
///
/// A live auction is settled first, while the house can still mint, and the
/// house is left paused.
pub fn handle_set_minter(
    state: &mut ModuleState,
    ctx: &CallContext,
    minter: Address,
) -> HandlerResult<Option<Settlement>> {
    ensure_owner(state, ctx)?;

    let settlement = if !state.house.is_paused() && state.house.has_pending() {
        warn!(timestamp = ctx.timestamp, "Minter changing, settling live auction early");
        Some(settle(state, ctx.timestamp, true)?)
    } else {
        None
    };
    set_paused(state, true);

    state.token.set_minter(minter);
    info!(minter = %format_address(&minter), "Minter updated");
    state.emit(DafoEvent::MinterUpdated { minter });

    Ok(settlement)
}

/// Route a call to its handler and return the events it emitted.
pub fn dispatch(
    state: &mut ModuleState,
    ctx: &CallContext,
    call: DafoCall,
) -> HandlerResult<Vec<DafoEvent>> {
    let mark = state.events.len();

    match call {
        DafoCall::Mint { custom_input, to } => {
            handle_mint(state, ctx, custom_input, to)?;
        }
        DafoCall::Burn { token_id } => handle_burn(state, ctx, token_id)?,
        DafoCall::CreateBid { custom_input } => {
            handle_create_bid(state, ctx, custom_input)?;
        }
        DafoCall::SettleAuction => {
            handle_settle_auction(state, ctx)?;
        }
        DafoCall::SettleCurrentAndCreateNewAuction => {
            handle_settle_current_and_create_new_auction(state, ctx)?;
        }
        DafoCall::Pause => handle_pause(state, ctx)?,
        DafoCall::Unpause => {
            handle_unpause(state, ctx)?;
        }
        DafoCall::SetMinter { minter } => {
            handle_set_minter(state, ctx, minter)?;
        }
    }

    Ok(state.events_since(mark).to_vec())
}
