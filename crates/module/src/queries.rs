//! Query handlers for the Dafo module.
//!
//! These functions provide read-only access to module state.

use crate::state::DafoState as ModuleState;
use dafo_types::{Address, Amount, Auction, DafoEvent, TokenId};
use serde::{Deserialize, Serialize};

/// Query request types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum DafoQuery {
    /// Next unclaimed id at or after `from`.
    FindNextAvailable { from: TokenId },

    /// Current auction, if any.
    GetAuction,

    /// Owner of a minted token.
    OwnerOf { token_id: TokenId },

    /// Whether a token exists (the genesis id always does).
    Exists { token_id: TokenId },

    /// Number of live tokens.
    TotalSupply,

    /// Native balance of an account.
    Balance { address: Address },

    /// Wrapped-asset balance of an account.
    WrappedBalance { address: Address },

    /// Whether the auction house is paused.
    IsPaused,

    /// Current minter.
    Minter,

    /// Royalty receiver and amount for a sale.
    RoyaltyInfo { token_id: TokenId, sale_price: Amount },

    /// Events logged at positions `from..`.
    Events { from: usize },
}

/// Query response types.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DafoQueryResponse {
    NextAvailable(TokenId),

    Auction(Option<Auction>),

    Owner(Option<Address>),

    Exists(bool),

    TotalSupply(u64),

    Balance(Amount),

    Paused(bool),

    Minter(Address),

    Royalty { receiver: Address, amount: Amount },

    Events(Vec<DafoEvent>),

    /// The query was well formed but the state cannot answer it.
    Error(String),
}

/// Handle a query.
pub fn handle_query(state: &ModuleState, query: DafoQuery) -> DafoQueryResponse {
    match query {
        DafoQuery::FindNextAvailable { from } => match state.token.find_next_available(from) {
            Ok(token_id) => DafoQueryResponse::NextAvailable(token_id),
            Err(err) => DafoQueryResponse::Error(err.to_string()),
        },

        DafoQuery::GetAuction => DafoQueryResponse::Auction(state.house.auction().cloned()),

        DafoQuery::OwnerOf { token_id } => DafoQueryResponse::Owner(state.token.owner_of(token_id)),

        DafoQuery::Exists { token_id } => DafoQueryResponse::Exists(state.token.exists(token_id)),

        DafoQuery::TotalSupply => DafoQueryResponse::TotalSupply(state.token.total_supply()),

        DafoQuery::Balance { address } => {
            DafoQueryResponse::Balance(state.ledger.balance_of(&address))
        }

        DafoQuery::WrappedBalance { address } => {
            DafoQueryResponse::Balance(state.ledger.wrapped_balance_of(&address))
        }

        DafoQuery::IsPaused => DafoQueryResponse::Paused(state.house.is_paused()),

        DafoQuery::Minter => DafoQueryResponse::Minter(state.token.minter()),

        DafoQuery::RoyaltyInfo {
            token_id,
            sale_price,
        } => match state.token.royalty_info(token_id, sale_price) {
            Ok((receiver, amount)) => DafoQueryResponse::Royalty { receiver, amount },
            Err(err) => DafoQueryResponse::Error(err.to_string()),
        },

        DafoQuery::Events { from } => DafoQueryResponse::Events(state.events_since(from).to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genesis::DafoGenesisConfig;
    use crate::handlers::{handle_mint, CallContext};
    use dafo_types::{CustomInput, Role};

    fn state_with_token() -> ModuleState {
        let config = DafoGenesisConfig {
            max_supply: 9,
            ..Default::default()
        };
        let mut state = ModuleState::from_genesis(&config).unwrap();
        let ctx = CallContext {
            sender: config.auction_house,
            block_height: 1,
            timestamp: 10,
            value: 0,
        };
        handle_mint(
            &mut state,
            &ctx,
            CustomInput::new(2, Role::Activist, 0, false),
            [7u8; 32],
        )
        .unwrap();
        state
    }

    #[test]
    fn test_token_queries() {
        let state = state_with_token();

        assert_eq!(
            handle_query(&state, DafoQuery::OwnerOf { token_id: 2 }),
            DafoQueryResponse::Owner(Some([7u8; 32]))
        );
        assert_eq!(
            handle_query(&state, DafoQuery::Exists { token_id: 0 }),
            DafoQueryResponse::Exists(true)
        );
        assert_eq!(
            handle_query(&state, DafoQuery::TotalSupply),
            DafoQueryResponse::TotalSupply(2)
        );
        assert_eq!(
            handle_query(&state, DafoQuery::FindNextAvailable { from: 2 }),
            DafoQueryResponse::NextAvailable(4)
        );
    }

    #[test]
    fn test_royalty_query() {
        let state = state_with_token();

        assert_eq!(
            handle_query(
                &state,
                DafoQuery::RoyaltyInfo {
                    token_id: 2,
                    sale_price: 100
                }
            ),
            DafoQueryResponse::Royalty {
                receiver: state.token.rewards_recipient(),
                amount: 5
            }
        );
        assert!(matches!(
            handle_query(
                &state,
                DafoQuery::RoyaltyInfo {
                    token_id: 9,
                    sale_price: 100
                }
            ),
            DafoQueryResponse::Error(_)
        ));
    }

    #[test]
    fn test_out_of_bounds_preview_is_an_error_response() {
        let state = state_with_token();
        assert!(matches!(
            handle_query(&state, DafoQuery::FindNextAvailable { from: 0 }),
            DafoQueryResponse::Error(_)
        ));
    }

    #[test]
    fn test_event_query() {
        let state = state_with_token();
        match handle_query(&state, DafoQuery::Events { from: 1 }) {
            DafoQueryResponse::Events(events) => {
                assert_eq!(events.len(), 1);
                assert_eq!(events[0].token_id(), Some(3));
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }
}
