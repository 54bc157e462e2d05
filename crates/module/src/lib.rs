//! Dafo module: slot allocator, reward mirror and auction house.
//!
//! This module implements the on-chain logic for minting Dafos:
//!
//! - A bounded id space with circular first-free allocation
//! - A reward mirror that claims a second id for the rewards recipient
//! - A single English auction with reserve, increment and time buffer
//! - A refund guard that cannot be blocked by the refunded account
//! - Pause and minter governance coupled to the auction lifecycle
//!
//! # Architecture
//!
//! - `allocator`: the id space
//! - `token`: minting authority and the reward mirror
//! - `auction`: the current auction and pause flag
//! - `ledger` / `refund`: balances, escrow and the fallback payment path
//! - `registry`: trait registry seam
//! - `call` / `handlers`: state-changing operations
//! - `queries`: read-only state access
//! - `state` / `genesis`: module state and its initial configuration
//! - `error`: error types
//!
//! # Example
//!
//! ```ignore
//! use dafo_module::{handlers, DafoCall, DafoGenesisConfig, DafoState};
//!
//! let mut state = DafoState::from_genesis(&DafoGenesisConfig::default())?;
//! let ctx = handlers::CallContext { ... };
//!
//! // Open the first auction
//! handlers::dispatch(&mut state, &ctx, DafoCall::Unpause)?;
//! ```

pub mod allocator;
pub mod auction;
pub mod call;
pub mod error;
pub mod genesis;
pub mod handlers;
pub mod ledger;
pub mod queries;
pub mod refund;
pub mod registry;
pub mod state;
pub mod token;

pub use allocator::{IdSpace, MAX_SUPPLY_LIMIT};
pub use auction::{AuctionHouse, AuctionParams};
pub use call::DafoCall;
pub use error::DafoError;
pub use genesis::{DafoGenesisConfig, GenesisValidationError};
pub use handlers::{CallContext, HandlerResult, Settlement};
pub use queries::{DafoQuery, DafoQueryResponse};
pub use registry::{TraitCounts, TraitRegistry};
pub use state::DafoState;
pub use token::{DafoToken, MintReceipt};
