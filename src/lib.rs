//! GMX SDK for Rust
//!
//! A Rust SDK for trading perpetuals and providing liquidity on a GMX V2 style deployment.
//!
//! # Features
//!
//! - Keeper price polling with a single-writer price store
//! - Market discovery and token metadata registry
//! - Market increase/decrease orders with acceptable-price protection
//! - Optimistic positions reconciled against on-chain state
//! - GM token deposits and withdrawals
//! - Trade and liquidity history from the indexer
//!
//! # Example
//!
//! ```rust,ignore
//! use gmx_sdk::{
//!     price_store, spawn_price_poller, GmxClient, IncreaseOrderRequest, LocalSigner,
//!     NetworkConfig, PriceFeed, Side,
//! };
//!
//! #[tokio::main]
//! async fn main() -> eyre::Result<()> {
//!     let config = NetworkConfig::from_env()?;
//!     let signer = LocalSigner::from_private_key("0x...", &config.rpc_url).await?;
//!
//!     let (writer, prices) = price_store();
//!     let feed = PriceFeed::new(&config.keeper_api_url, config.polling.request_timeout)?;
//!     let _poller = spawn_price_poller(feed, writer, config.polling.price_interval);
//!
//!     let client = GmxClient::new(signer, config.clone(), prices)?;
//!     client.engine().refresh_markets().await?;
//!
//!     // 1000 USDC collateral, $5000 long on ETH
//!     let order = client
//!         .submit_increase_order(IncreaseOrderRequest::market(
//!             config.contracts.market,
//!             config.contracts.usdc,
//!             Side::Long,
//!             "1000",
//!             "5000",
//!         ))
//!         .await?;
//!     println!("{}", config.tx_url(order.tx_hash));
//!
//!     Ok(())
//! }
//! ```

pub mod approval;
pub mod chain;
pub mod client;
pub mod config;
pub mod constants;
pub mod contracts;
pub mod engine;
pub mod error;
pub mod order;
pub mod poller;
pub mod position;
pub mod price;
pub mod registry;
pub mod signer;
pub mod subgraph;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use approval::ApprovalState;
pub use chain::{ChainReader, RpcChainReader};
pub use client::{GmxClient, SubmittedOrder};
pub use config::{Contracts, NetworkConfig, PollingConfig, RiskParams};
pub use engine::{ConfirmedPositions, TradingEngine};
pub use error::{eyre, Context, Report, Result, TxError, ValidationError};
pub use order::{acceptable_price, AcceptablePricePolicy, IntentId, IntentStatus, OrderIntent};
pub use poller::PollerHandle;
pub use position::{reconcile, DerivedMetrics, Position, PositionBook, PositionSource};
pub use price::{price_store, spawn_price_poller, PriceFeed, PriceReader, PriceSnapshot, PriceWriter};
pub use registry::{canonical_address, Market, MarketRegistry, Token};
pub use signer::{LocalSigner, TransactionSigner, TxReceipt, TxRequest};
pub use subgraph::{LiquidityChange, LiquidityHistory, SubgraphClient, TradeAction, TradeHistoryPage};
pub use types::{
    DecreaseOrderRequest, DepositRequest, IncreaseOrderRequest, LiquidityPosition, OrderKind,
    PendingOrder, Side, WithdrawalRequest,
};
