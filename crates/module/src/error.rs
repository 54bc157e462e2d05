//! Dafo module error types.

use thiserror::Error;

use dafo_types::{Amount, TokenId};

/// Errors that can occur in the Dafo module.
///
/// Every error aborts the triggering call before any state is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DafoError {
    #[error("Token id {token_id} is outside 1..={max_supply}")]
    OutOfBounds { token_id: TokenId, max_supply: u64 },

    #[error("Max supply {max_supply} must be between 1 and {limit}")]
    InvalidSupply { max_supply: u64, limit: u64 },

    #[error("No tokens left")]
    SupplyExhausted,

    #[error("Token {0} has already been claimed")]
    AlreadyClaimed(TokenId),

    #[error("Cannot create bid on token {0} that already exists")]
    SubjectAlreadyExists(TokenId),

    #[error("Token {requested} is not the subject of the current auction ({subject})")]
    SubjectUnavailable { requested: TokenId, subject: TokenId },

    #[error("Must send at least reserve price: need {required}, got {got}")]
    ReserveNotMet { required: Amount, got: Amount },

    #[error("Must send more than last bid by the minimum increment: need {required}, got {got}")]
    IncrementTooSmall { required: Amount, got: Amount },

    #[error("Auction expired")]
    AuctionExpired,

    #[error("Auction hasn't completed")]
    AuctionNotComplete,

    #[error("Auction has already been settled")]
    AuctionAlreadySettled,

    #[error("No auction is running")]
    NoActiveAuction,

    #[error("{trait_name} index {index} is out of bounds (registry holds {count})")]
    IndexOutOfBounds {
        trait_name: &'static str,
        index: usize,
        count: usize,
    },

    #[error("Not authorized")]
    Unauthorized,

    #[error("Insufficient funds: need {required}, have {available}")]
    InsufficientFunds { required: Amount, available: Amount },

    #[error("Token {0} is not minted")]
    NotMinted(TokenId),

    #[error("Balance overflow")]
    BalanceOverflow,
}
