//! Core type definitions for the Dafo slot allocator and auction house.
//!
//! This crate provides the shared data structures used across the workspace:
//! identifiers and their custom inputs, the live auction record, account
//! receive behaviours and the event records emitted to observers.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

pub mod events;

pub use events::DafoEvent;

// =========================
// IDENTIFIERS
// =========================

/// Generic address type (32 bytes)
pub type Address = [u8; 32];

/// Identifier of a Dafo. Id `0` is the genesis sentinel and is never minted.
pub type TokenId = u64;

/// Smallest-denomination amount of the native asset.
pub type Amount = u64;

/// Id reserved at genesis; it always exists and is never auctioned.
pub const GENESIS_TOKEN_ID: TokenId = 0;

/// Number of roles a Dafo can carry.
pub const ROLE_COUNT: usize = 4;

// =========================
// CUSTOM INPUT
// =========================

/// Role trait of a Dafo.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
#[borsh(use_discriminant = true)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Role {
    Academic = 0,
    Activist = 1,
    Artist = 2,
    Business = 3,
}

impl Role {
    /// All roles in registry order.
    pub const ALL: [Role; ROLE_COUNT] = [
        Role::Academic,
        Role::Activist,
        Role::Artist,
        Role::Business,
    ];

    /// Index of this role in the trait registry.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up a role by registry index.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }
}

/// Payload bound to an id at claim time.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct CustomInput {
    pub token_id: TokenId,
    pub role: Role,
    /// Index into the palette registry
    pub palette: u8,
    pub outline: bool,
}

impl CustomInput {
    pub fn new(token_id: TokenId, role: Role, palette: u8, outline: bool) -> Self {
        Self {
            token_id,
            role,
            palette,
            outline,
        }
    }

    /// Same traits, different id.
    pub fn with_token_id(self, token_id: TokenId) -> Self {
        Self { token_id, ..self }
    }
}

// =========================
// AUCTION
// =========================

/// The single live auction owned by the auction house.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Auction {
    /// Subject id and the traits chosen by the current high bidder
    pub custom_input: CustomInput,
    /// Current high bid, 0 if no bids
    pub amount: Amount,
    /// Current high bidder
    pub bidder: Option<Address>,
    pub start_time: u64,
    /// Extended when a bid lands inside the time buffer
    pub end_time: u64,
    pub settled: bool,
}

impl Auction {
    pub fn token_id(&self) -> TokenId {
        self.custom_input.token_id
    }

    /// Lifecycle phase at `now`.
    pub fn phase(&self, now: u64) -> AuctionPhase {
        if self.settled {
            AuctionPhase::Settled
        } else if now < self.end_time {
            AuctionPhase::Live
        } else {
            AuctionPhase::Expired
        }
    }
}

/// Auction lifecycle phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum AuctionPhase {
    /// Accepting bids
    Live,
    /// Past end time, awaiting settlement
    Expired,
    /// Settled; the next auction has not been created yet
    Settled,
}

// =========================
// ACCOUNTS
// =========================

/// How an account reacts to a direct value transfer.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ReceiveBehavior {
    /// Plain account, accepts any transfer
    #[default]
    Accept,
    /// Rejects every direct transfer
    Revert,
    /// Burns the given amount of gas on receipt
    Consume(u64),
}

/// Render an address as lowercase hex with a `0x` prefix.
pub fn format_address(address: &Address) -> String {
    format!("0x{}", hex::encode(address))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(token_id: TokenId) -> CustomInput {
        CustomInput::new(token_id, Role::Artist, 1, true)
    }

    #[test]
    fn test_role_indices_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::from_index(role.index() as u8), Some(role));
        }
        assert_eq!(Role::from_index(4), None);
        assert_eq!(Role::from_index(20), None);
    }

    #[test]
    fn test_with_token_id_keeps_traits() {
        let mirrored = input(3).with_token_id(7);
        assert_eq!(mirrored.token_id, 7);
        assert_eq!(mirrored.role, Role::Artist);
        assert_eq!(mirrored.palette, 1);
        assert!(mirrored.outline);
    }

    #[test]
    fn test_auction_phase() {
        let mut auction = Auction {
            custom_input: input(1),
            amount: 0,
            bidder: None,
            start_time: 100,
            end_time: 200,
            settled: false,
        };

        assert_eq!(auction.phase(100), AuctionPhase::Live);
        assert_eq!(auction.phase(199), AuctionPhase::Live);
        assert_eq!(auction.phase(200), AuctionPhase::Expired);

        auction.settled = true;
        assert_eq!(auction.phase(150), AuctionPhase::Settled);
    }

    #[test]
    fn test_custom_input_borsh_layout() {
        let encoded = borsh::to_vec(&input(258)).unwrap();
        // u64 id, u8 role discriminant, u8 palette, bool outline
        assert_eq!(encoded.len(), 11);
        assert_eq!(encoded[8], Role::Artist as u8);
    }

    #[test]
    fn test_format_address() {
        let mut addr = [0u8; 32];
        addr[31] = 0xab;
        let formatted = format_address(&addr);
        assert!(formatted.starts_with("0x00"));
        assert!(formatted.ends_with("ab"));
        assert_eq!(formatted.len(), 66);
    }
}
