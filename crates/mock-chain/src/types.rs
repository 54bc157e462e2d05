//! RPC-compatible types for the mock chain.
//!
//! These types are JSON-friendly versions of the core Dafo types: addresses
//! travel as `0x`-prefixed hex and roles as registry indices.

use dafo_types::{format_address, Address, Auction, CustomInput, DafoEvent, Role};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Block info response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockInfo {
    pub height: u64,
    pub timestamp: u64,
}

/// Custom input for RPC.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CustomInputRpc {
    pub token_id: u64,
    /// Role registry index
    pub role: u8,
    pub palette: u8,
    pub outline: bool,
}

/// Errors decoding RPC inputs into module types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcInputError {
    #[error("Role index {0} does not name a role")]
    InvalidRole(u8),
}

impl TryFrom<CustomInputRpc> for CustomInput {
    type Error = RpcInputError;

    fn try_from(rpc: CustomInputRpc) -> Result<Self, Self::Error> {
        let role = Role::from_index(rpc.role).ok_or(RpcInputError::InvalidRole(rpc.role))?;
        Ok(CustomInput::new(rpc.token_id, role, rpc.palette, rpc.outline))
    }
}

impl From<&CustomInput> for CustomInputRpc {
    fn from(input: &CustomInput) -> Self {
        Self {
            token_id: input.token_id,
            role: input.role.index() as u8,
            palette: input.palette,
            outline: input.outline,
        }
    }
}

/// Parameters for a direct mint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintParams {
    pub sender: String,
    pub custom_input: CustomInputRpc,
    pub to: String,
}

/// Parameters for a bid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidParams {
    pub sender: String,
    pub custom_input: CustomInputRpc,
    /// Value attached to the bid
    pub amount: u64,
}

/// Current auction for RPC responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionRpc {
    pub token_id: u64,
    pub custom_input: CustomInputRpc,
    pub amount: u64,
    pub bidder: Option<String>,
    pub start_time: u64,
    pub end_time: u64,
    pub settled: bool,
}

impl From<&Auction> for AuctionRpc {
    fn from(auction: &Auction) -> Self {
        Self {
            token_id: auction.token_id(),
            custom_input: CustomInputRpc::from(&auction.custom_input),
            amount: auction.amount,
            bidder: auction.bidder.as_ref().map(format_address),
            start_time: auction.start_time,
            end_time: auction.end_time,
            settled: auction.settled,
        }
    }
}

/// Event record for RPC responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRpc {
    pub kind: String,
    pub token_id: Option<u64>,
    pub actor: Option<String>,
    /// Full record as tagged JSON
    pub data: serde_json::Value,
}

impl From<&DafoEvent> for EventRpc {
    fn from(event: &DafoEvent) -> Self {
        Self {
            kind: event.kind().to_string(),
            token_id: event.token_id(),
            actor: event.actor().as_ref().map(format_address),
            data: event_data(event),
        }
    }
}

/// Tagged JSON for an event. A record that fails to serialize is logged and
/// reported as `null` so the rest of the response still goes out.
fn event_data<T: Serialize>(event: &T) -> serde_json::Value {
    match serde_json::to_value(event) {
        Ok(value) => value,
        Err(err) => {
            warn!(%err, "Failed to serialize event record");
            serde_json::Value::Null
        }
    }
}

/// Royalty answer for RPC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoyaltyRpc {
    pub receiver: String,
    pub amount: u64,
}

/// Parse a `0x`-prefixed hex address of at most 32 bytes.
///
/// Shorter inputs fill the leading bytes and leave the rest zero.
pub fn parse_address(s: &str) -> Result<Address, String> {
    let bytes = hex::decode(s.trim_start_matches("0x"))
        .map_err(|e| format!("Invalid address hex: {}", e))?;
    if bytes.len() > 32 {
        return Err(format!("Address must be at most 32 bytes, got {}", bytes.len()));
    }

    let mut addr = [0u8; 32];
    addr[..bytes.len()].copy_from_slice(&bytes);
    Ok(addr)
}
