//! Mock chain server for local testing of the Dafo auction house.
//!
//! This provides a JSON-RPC server that hosts the module state in memory and
//! serializes every caller through one lock, without a real blockchain.

use anyhow::{Context, Result};
use clap::Parser;
use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::Server;
use jsonrpsee::types::ErrorObjectOwned;
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use dafo_module::queries::handle_query;
use dafo_module::{
    handlers, CallContext, DafoCall, DafoGenesisConfig, DafoQuery, DafoQueryResponse, DafoState,
    TraitCounts,
};
use dafo_types::{format_address, CustomInput, ReceiveBehavior};

mod types;
use types::*;

#[derive(Parser, Debug)]
#[command(name = "mock-chain", about = "Local JSON-RPC chain hosting the Dafo auction house")]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:9944")]
    listen: SocketAddr,

    /// Genesis configuration (JSON); defaults apply when omitted
    #[arg(long)]
    genesis: Option<PathBuf>,

    /// Initial chain timestamp
    #[arg(long, default_value_t = 0)]
    timestamp: u64,
}

/// Shared chain state.
struct ChainState {
    /// Module state
    module: DafoState,
    /// Current block height (simulated)
    block_height: u64,
    /// Current timestamp (simulated, can be advanced)
    timestamp: u64,
}

impl ChainState {
    fn new(module: DafoState, timestamp: u64) -> Self {
        Self {
            module,
            block_height: 0,
            timestamp,
        }
    }

    fn advance_block(&mut self) {
        self.block_height = self.block_height.saturating_add(1);
        self.timestamp = self.timestamp.saturating_add(12); // ~12 second blocks
    }

    fn block_info(&self) -> BlockInfo {
        BlockInfo {
            height: self.block_height,
            timestamp: self.timestamp,
        }
    }
}

/// RPC API definition for the mock chain.
#[rpc(server)]
pub trait MockChainApi {
    // ============ Admin Methods ============

    /// Advance the chain by one block.
    #[method(name = "admin_advanceBlock")]
    async fn admin_advance_block(&self) -> Result<BlockInfo, ErrorObjectOwned>;

    /// Move the clock forward without producing blocks.
    #[method(name = "admin_advanceTime")]
    async fn admin_advance_time(&self, seconds: u64) -> Result<BlockInfo, ErrorObjectOwned>;

    /// Set the current timestamp (for testing time-dependent logic).
    #[method(name = "admin_setTimestamp")]
    async fn admin_set_timestamp(&self, timestamp: u64) -> Result<bool, ErrorObjectOwned>;

    /// Credit native value to an account.
    #[method(name = "admin_fund")]
    async fn admin_fund(&self, address: String, amount: u64) -> Result<u64, ErrorObjectOwned>;

    /// Change how an account reacts to direct transfers.
    #[method(name = "admin_setReceiveBehavior")]
    async fn admin_set_receive_behavior(
        &self,
        address: String,
        behavior: ReceiveBehavior,
    ) -> Result<bool, ErrorObjectOwned>;

    /// Resize the trait registries.
    #[method(name = "admin_setTraitCounts")]
    async fn admin_set_trait_counts(
        &self,
        roles: usize,
        palettes: usize,
    ) -> Result<bool, ErrorObjectOwned>;

    // ============ Token Methods ============

    /// Mint directly (minter only).
    #[method(name = "dafo_mint")]
    async fn dafo_mint(&self, params: MintParams) -> Result<Vec<EventRpc>, ErrorObjectOwned>;

    /// Burn a token (minter only).
    #[method(name = "dafo_burn")]
    async fn dafo_burn(&self, sender: String, token_id: u64)
        -> Result<Vec<EventRpc>, ErrorObjectOwned>;

    // ============ Auction Methods ============

    /// Bid on the current subject.
    #[method(name = "auction_createBid")]
    async fn auction_create_bid(&self, params: BidParams) -> Result<Vec<EventRpc>, ErrorObjectOwned>;

    /// Settle the current auction.
    #[method(name = "auction_settle")]
    async fn auction_settle(&self, sender: String) -> Result<Vec<EventRpc>, ErrorObjectOwned>;

    /// Settle the current auction and open the next one.
    #[method(name = "auction_settleCurrentAndCreateNew")]
    async fn auction_settle_current_and_create_new(
        &self,
        sender: String,
    ) -> Result<Vec<EventRpc>, ErrorObjectOwned>;

    /// Pause the auction house (owner only).
    #[method(name = "auction_pause")]
    async fn auction_pause(&self, sender: String) -> Result<Vec<EventRpc>, ErrorObjectOwned>;

    /// Unpause the auction house (owner only).
    #[method(name = "auction_unpause")]
    async fn auction_unpause(&self, sender: String) -> Result<Vec<EventRpc>, ErrorObjectOwned>;

    /// Hand minting authority to another address (owner only).
    #[method(name = "auction_setMinter")]
    async fn auction_set_minter(
        &self,
        sender: String,
        minter: String,
    ) -> Result<Vec<EventRpc>, ErrorObjectOwned>;

    // ============ Query Methods ============

    /// Get current block info.
    #[method(name = "chain_getBlockInfo")]
    async fn chain_get_block_info(&self) -> Result<BlockInfo, ErrorObjectOwned>;

    /// Next unclaimed id at or after `from`.
    #[method(name = "query_findNextAvailable")]
    async fn query_find_next_available(&self, from: u64) -> Result<u64, ErrorObjectOwned>;

    /// Get the current auction.
    #[method(name = "query_getAuction")]
    async fn query_get_auction(&self) -> Result<Option<AuctionRpc>, ErrorObjectOwned>;

    /// Owner of a token.
    #[method(name = "query_ownerOf")]
    async fn query_owner_of(&self, token_id: u64) -> Result<Option<String>, ErrorObjectOwned>;

    /// Native and wrapped balances of an account.
    #[method(name = "query_balances")]
    async fn query_balances(&self, address: String) -> Result<(u64, u64), ErrorObjectOwned>;

    /// Royalty receiver and amount for a sale.
    #[method(name = "query_royaltyInfo")]
    async fn query_royalty_info(
        &self,
        token_id: u64,
        sale_price: u64,
    ) -> Result<RoyaltyRpc, ErrorObjectOwned>;

    /// Events logged at positions `from..`.
    #[method(name = "query_events")]
    async fn query_events(&self, from: usize) -> Result<Vec<EventRpc>, ErrorObjectOwned>;

    /// Any module query, answered as-is.
    #[method(name = "query_raw")]
    async fn query_raw(&self, query: DafoQuery) -> Result<DafoQueryResponse, ErrorObjectOwned>;
}

/// Implementation of the mock chain RPC server.
struct MockChainServer {
    state: Arc<RwLock<ChainState>>,
}

impl MockChainServer {
    fn new(state: ChainState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    fn rpc_error(msg: &str) -> ErrorObjectOwned {
        ErrorObjectOwned::owned(-32000, msg.to_string(), None::<()>)
    }

    fn address(s: &str) -> Result<dafo_types::Address, ErrorObjectOwned> {
        parse_address(s).map_err(|e| Self::rpc_error(&e))
    }

    /// Run one call under the write lock and return its events.
    fn execute(&self, sender: &str, value: u64, call: DafoCall) -> Result<Vec<EventRpc>, ErrorObjectOwned> {
        let sender = Self::address(sender)?;
        let mut state = self.state.write();
        let ctx = CallContext {
            sender,
            block_height: state.block_height,
            timestamp: state.timestamp,
            value,
        };

        let events = handlers::dispatch(&mut state.module, &ctx, call)
            .map_err(|e| Self::rpc_error(&format!("Call failed: {}", e)))?;
        Ok(events.iter().map(EventRpc::from).collect())
    }

    fn query(&self, query: DafoQuery) -> Result<DafoQueryResponse, ErrorObjectOwned> {
        let state = self.state.read();
        match handle_query(&state.module, query) {
            DafoQueryResponse::Error(e) => Err(Self::rpc_error(&e)),
            response => Ok(response),
        }
    }

    fn unexpected(response: DafoQueryResponse) -> ErrorObjectOwned {
        Self::rpc_error(&format!("Unexpected query response: {:?}", response))
    }
}

#[async_trait]
impl MockChainApiServer for MockChainServer {
    async fn admin_advance_block(&self) -> Result<BlockInfo, ErrorObjectOwned> {
        let mut state = self.state.write();
        state.advance_block();
        Ok(state.block_info())
    }

    async fn admin_advance_time(&self, seconds: u64) -> Result<BlockInfo, ErrorObjectOwned> {
        let mut state = self.state.write();
        state.timestamp = state.timestamp.saturating_add(seconds);
        info!(timestamp = state.timestamp, "Clock advanced");
        Ok(state.block_info())
    }

    async fn admin_set_timestamp(&self, timestamp: u64) -> Result<bool, ErrorObjectOwned> {
        let mut state = self.state.write();
        state.timestamp = timestamp;
        info!("Timestamp set to {}", timestamp);
        Ok(true)
    }

    async fn admin_fund(&self, address: String, amount: u64) -> Result<u64, ErrorObjectOwned> {
        let address = Self::address(&address)?;
        let mut state = self.state.write();
        state
            .module
            .ledger
            .fund(address, amount)
            .map_err(|e| Self::rpc_error(&e.to_string()))?;
        info!(address = %format_address(&address), amount, "Account funded");
        Ok(state.module.ledger.balance_of(&address))
    }

    async fn admin_set_receive_behavior(
        &self,
        address: String,
        behavior: ReceiveBehavior,
    ) -> Result<bool, ErrorObjectOwned> {
        let address = Self::address(&address)?;
        let mut state = self.state.write();
        state.module.ledger.set_receive_behavior(address, behavior);
        info!(address = %format_address(&address), ?behavior, "Receive behavior set");
        Ok(true)
    }

    async fn admin_set_trait_counts(
        &self,
        roles: usize,
        palettes: usize,
    ) -> Result<bool, ErrorObjectOwned> {
        if roles > dafo_types::ROLE_COUNT {
            return Err(Self::rpc_error(&format!(
                "At most {} roles exist",
                dafo_types::ROLE_COUNT
            )));
        }
        let mut state = self.state.write();
        state.module.traits = TraitCounts { roles, palettes };
        info!(roles, palettes, "Trait registry resized");
        Ok(true)
    }

    async fn dafo_mint(&self, params: MintParams) -> Result<Vec<EventRpc>, ErrorObjectOwned> {
        let custom_input = CustomInput::try_from(params.custom_input)
            .map_err(|e| Self::rpc_error(&e.to_string()))?;
        let to = Self::address(&params.to)?;
        self.execute(&params.sender, 0, DafoCall::Mint { custom_input, to })
    }

    async fn dafo_burn(
        &self,
        sender: String,
        token_id: u64,
    ) -> Result<Vec<EventRpc>, ErrorObjectOwned> {
        self.execute(&sender, 0, DafoCall::Burn { token_id })
    }

    async fn auction_create_bid(&self, params: BidParams) -> Result<Vec<EventRpc>, ErrorObjectOwned> {
        let custom_input = CustomInput::try_from(params.custom_input)
            .map_err(|e| Self::rpc_error(&e.to_string()))?;
        let events = self.execute(
            &params.sender,
            params.amount,
            DafoCall::CreateBid { custom_input },
        )?;
        info!(
            "Bid of {} on token {} by {}",
            params.amount, custom_input.token_id, params.sender
        );
        Ok(events)
    }

    async fn auction_settle(&self, sender: String) -> Result<Vec<EventRpc>, ErrorObjectOwned> {
        self.execute(&sender, 0, DafoCall::SettleAuction)
    }

    async fn auction_settle_current_and_create_new(
        &self,
        sender: String,
    ) -> Result<Vec<EventRpc>, ErrorObjectOwned> {
        self.execute(&sender, 0, DafoCall::SettleCurrentAndCreateNewAuction)
    }

    async fn auction_pause(&self, sender: String) -> Result<Vec<EventRpc>, ErrorObjectOwned> {
        self.execute(&sender, 0, DafoCall::Pause)
    }

    async fn auction_unpause(&self, sender: String) -> Result<Vec<EventRpc>, ErrorObjectOwned> {
        self.execute(&sender, 0, DafoCall::Unpause)
    }

    async fn auction_set_minter(
        &self,
        sender: String,
        minter: String,
    ) -> Result<Vec<EventRpc>, ErrorObjectOwned> {
        let minter = Self::address(&minter)?;
        self.execute(&sender, 0, DafoCall::SetMinter { minter })
    }

    async fn chain_get_block_info(&self) -> Result<BlockInfo, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(state.block_info())
    }

    async fn query_find_next_available(&self, from: u64) -> Result<u64, ErrorObjectOwned> {
        match self.query(DafoQuery::FindNextAvailable { from })? {
            DafoQueryResponse::NextAvailable(token_id) => Ok(token_id),
            other => Err(Self::unexpected(other)),
        }
    }

    async fn query_get_auction(&self) -> Result<Option<AuctionRpc>, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(state.module.house.auction().map(AuctionRpc::from))
    }

    async fn query_owner_of(&self, token_id: u64) -> Result<Option<String>, ErrorObjectOwned> {
        match self.query(DafoQuery::OwnerOf { token_id })? {
            DafoQueryResponse::Owner(owner) => Ok(owner.as_ref().map(format_address)),
            other => Err(Self::unexpected(other)),
        }
    }

    async fn query_balances(&self, address: String) -> Result<(u64, u64), ErrorObjectOwned> {
        let address = Self::address(&address)?;
        let state = self.state.read();
        Ok((
            state.module.ledger.balance_of(&address),
            state.module.ledger.wrapped_balance_of(&address),
        ))
    }

    async fn query_royalty_info(
        &self,
        token_id: u64,
        sale_price: u64,
    ) -> Result<RoyaltyRpc, ErrorObjectOwned> {
        match self.query(DafoQuery::RoyaltyInfo {
            token_id,
            sale_price,
        })? {
            DafoQueryResponse::Royalty { receiver, amount } => Ok(RoyaltyRpc {
                receiver: format_address(&receiver),
                amount,
            }),
            other => Err(Self::unexpected(other)),
        }
    }

    async fn query_events(&self, from: usize) -> Result<Vec<EventRpc>, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(state
            .module
            .events_since(from)
            .iter()
            .map(EventRpc::from)
            .collect())
    }

    async fn query_raw(&self, query: DafoQuery) -> Result<DafoQueryResponse, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(handle_query(&state.module, query))
    }
}

fn load_genesis(path: Option<&PathBuf>) -> Result<DafoGenesisConfig> {
    let Some(path) = path else {
        return Ok(DafoGenesisConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read genesis file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse genesis file {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mock_chain=info".parse()?)
                .add_directive("dafo_module=info".parse()?)
                .add_directive("jsonrpsee=warn".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let config = load_genesis(cli.genesis.as_ref())?;
    let module = DafoState::from_genesis(&config).context("Invalid genesis configuration")?;
    info!(
        max_supply = config.max_supply,
        reward_period = config.reward_period,
        owner = %format_address(&config.owner),
        "Genesis loaded"
    );

    info!("Starting mock chain server on {}", cli.listen);

    let server = Server::builder().build(cli.listen).await?;
    let handle = server.start(MockChainServer::new(ChainState::new(module, cli.timestamp)).into_rpc());

    info!("Mock chain server running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    handle.stop()?;
    handle.stopped().await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_state(timestamp: u64) -> ChainState {
        let module = DafoState::from_genesis(&DafoGenesisConfig::default()).unwrap();
        ChainState::new(module, timestamp)
    }

    #[test]
    fn test_advance_block() {
        let mut state = chain_state(100);
        state.advance_block();
        assert_eq!(state.block_info().height, 1);
        assert_eq!(state.block_info().timestamp, 112);
    }

    #[test]
    fn test_advance_block_saturates_clock() {
        let mut state = chain_state(u64::MAX - 5);
        state.block_height = u64::MAX;
        state.advance_block();

        let info = state.block_info();
        assert_eq!(info.height, u64::MAX);
        assert_eq!(info.timestamp, u64::MAX);
    }

    #[tokio::test]
    async fn test_admin_fund_overflow_is_rpc_error() {
        let server = MockChainServer::new(chain_state(0));
        let alice = format_address(&[1u8; 32]);

        assert_eq!(server.admin_fund(alice.clone(), u64::MAX).await.unwrap(), u64::MAX);

        let err = server.admin_fund(alice.clone(), 1).await.unwrap_err();
        assert_eq!(err.message(), "Balance overflow");
        assert_eq!(server.admin_fund(alice, 0).await.unwrap(), u64::MAX);
    }
}
