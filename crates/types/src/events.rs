//! Event records emitted to off-chain observers.
//!
//! Every claim, bid and settlement appends exactly one record per fact to the
//! module's event log. Per bid observers see one `AuctionBid`, followed by one
//! `AuctionExtended` only if the end time moved. Per settlement cycle they see
//! one `AuctionSettled` followed by one `AuctionCreated`.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::{Address, Amount, CustomInput, TokenId};

#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum DafoEvent {
    /// An id was claimed and assigned to `owner`.
    DafoCreated {
        token_id: TokenId,
        custom_input: CustomInput,
        owner: Address,
    },

    DafoBurned { token_id: TokenId },

    MinterUpdated { minter: Address },

    AuctionCreated {
        token_id: TokenId,
        start_time: u64,
        end_time: u64,
    },

    AuctionBid {
        token_id: TokenId,
        bidder: Address,
        amount: Amount,
        extended: bool,
    },

    AuctionExtended { token_id: TokenId, end_time: u64 },

    /// `winner` is `None` when the auction closed without bids.
    AuctionSettled {
        token_id: TokenId,
        winner: Option<Address>,
        amount: Amount,
    },

    /// Value left the auction house escrow. `wrapped` is set when the direct
    /// transfer failed and the amount was credited as the wrapped asset.
    PaymentSent {
        to: Address,
        amount: Amount,
        wrapped: bool,
    },

    Paused,

    Unpaused,
}

impl DafoEvent {
    /// Stable name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            DafoEvent::DafoCreated { .. } => "DafoCreated",
            DafoEvent::DafoBurned { .. } => "DafoBurned",
            DafoEvent::MinterUpdated { .. } => "MinterUpdated",
            DafoEvent::AuctionCreated { .. } => "AuctionCreated",
            DafoEvent::AuctionBid { .. } => "AuctionBid",
            DafoEvent::AuctionExtended { .. } => "AuctionExtended",
            DafoEvent::AuctionSettled { .. } => "AuctionSettled",
            DafoEvent::PaymentSent { .. } => "PaymentSent",
            DafoEvent::Paused => "Paused",
            DafoEvent::Unpaused => "Unpaused",
        }
    }

    /// Id the event refers to, if any.
    pub fn token_id(&self) -> Option<TokenId> {
        match self {
            DafoEvent::DafoCreated { token_id, .. }
            | DafoEvent::DafoBurned { token_id }
            | DafoEvent::AuctionCreated { token_id, .. }
            | DafoEvent::AuctionBid { token_id, .. }
            | DafoEvent::AuctionExtended { token_id, .. }
            | DafoEvent::AuctionSettled { token_id, .. } => Some(*token_id),
            DafoEvent::MinterUpdated { .. }
            | DafoEvent::PaymentSent { .. }
            | DafoEvent::Paused
            | DafoEvent::Unpaused => None,
        }
    }

    /// Account that caused or received the effect, if any.
    pub fn actor(&self) -> Option<Address> {
        match self {
            DafoEvent::DafoCreated { owner, .. } => Some(*owner),
            DafoEvent::MinterUpdated { minter } => Some(*minter),
            DafoEvent::AuctionBid { bidder, .. } => Some(*bidder),
            DafoEvent::AuctionSettled { winner, .. } => *winner,
            DafoEvent::PaymentSent { to, .. } => Some(*to),
            _ => None,
        }
    }
}
