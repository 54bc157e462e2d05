//! Call message types for the Dafo module.

use borsh::{BorshDeserialize, BorshSerialize};
use dafo_types::{Address, CustomInput, TokenId};

/// Call messages for the Dafo module.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum DafoCall {
    // === Token ===
    /// Claim `custom_input.token_id` for `to` (minter only).
    Mint { custom_input: CustomInput, to: Address },

    /// Burn a token (minter only).
    Burn { token_id: TokenId },

    // === Auction ===
    /// Bid the attached value on the current subject.
    CreateBid { custom_input: CustomInput },

    /// Settle the current auction once it has ended.
    SettleAuction,

    /// Settle the current auction and, unless paused, open the next one.
    SettleCurrentAndCreateNewAuction,

    // === Governance ===
    /// Stop new auctions from being created.
    Pause,

    /// Resume; opens an auction if none is pending.
    Unpause,

    /// Hand minting authority to another address.
    SetMinter { minter: Address },
}
