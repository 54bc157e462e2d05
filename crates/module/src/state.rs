//! State of the Dafo module.

use dafo_types::{Address, DafoEvent};
use tracing::debug;

use crate::auction::AuctionHouse;
use crate::genesis::{DafoGenesisConfig, GenesisValidationError};
use crate::ledger::Ledger;
use crate::registry::TraitCounts;
use crate::token::DafoToken;

/// Dafo module state.
///
/// One value holds every component; handlers take it by `&mut`, so each call
/// sees and commits a consistent snapshot.
#[derive(Clone, Debug)]
pub struct DafoState {
    /// Id space, owners and minting authority
    pub token: DafoToken,

    /// Native balances, escrow and the wrapped asset
    pub ledger: Ledger,

    /// Current auction and pause flag
    pub house: AuctionHouse,

    /// Registered trait counts
    pub traits: TraitCounts,

    /// Governance authority and proceeds recipient
    pub owner: Address,

    /// Address the auction house mints under
    pub auction_house: Address,

    /// Append-only event log
    pub events: Vec<DafoEvent>,
}

impl DafoState {
    /// Build the initial state from a validated genesis configuration.
    pub fn from_genesis(config: &DafoGenesisConfig) -> Result<Self, GenesisValidationError> {
        config.validate()?;

        let token = DafoToken::new(
            config.max_supply,
            config.initial_minter(),
            config.rewards_recipient,
            config.reward_period,
        )
        .map_err(|err| GenesisValidationError::InvalidSupply(err.to_string()))?;

        let mut ledger = Ledger::new();
        for (address, amount) in &config.balances {
            ledger
                .fund(*address, *amount)
                .map_err(|_| GenesisValidationError::BalanceOverflow)?;
        }
        for (address, behavior) in &config.receive_behaviors {
            ledger.set_receive_behavior(*address, *behavior);
        }

        Ok(Self {
            token,
            ledger,
            house: AuctionHouse::new(config.auction.clone()),
            traits: config.traits,
            owner: config.owner,
            auction_house: config.auction_house,
            events: Vec::new(),
        })
    }

    /// Append an event to the log.
    pub fn emit(&mut self, event: DafoEvent) {
        debug!(kind = event.kind(), token_id = ?event.token_id(), "Event emitted");
        self.events.push(event);
    }

    /// Events at positions `from..`.
    pub fn events_since(&self, from: usize) -> &[DafoEvent] {
        self.events.get(from..).unwrap_or(&[])
    }
}
