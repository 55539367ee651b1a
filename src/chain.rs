//! On-chain read interface
//!
//! Everything the SDK reads from the chain goes through [`ChainReader`], so the registry,
//! approval manager and pollers can be driven by an in-memory chain in tests.

use crate::config::Contracts;
use crate::contracts::{
    min_collateral_usd_key, IDataStore, IReader, MarketProps, OrderInfo, PositionProps, IERC20,
};
use crate::signer::TxRequest;
use alloy::eips::BlockId;
use alloy::network::{Ethereum, TransactionBuilder};
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::rpc::types::TransactionRequest;
use alloy::sol_types::SolCall;
use alloy::transports::http::reqwest::Url;
use eyre::{Context, Result};
use std::future::Future;
use std::sync::Arc;

/// Read-only view of protocol and token state
pub trait ChainReader: Send + Sync {
    /// Page through all markets
    fn markets(&self, start: u64, end: u64)
        -> impl Future<Output = Result<Vec<MarketProps>>> + Send;

    /// A single market's token triple
    fn market(&self, market: Address) -> impl Future<Output = Result<MarketProps>> + Send;

    /// Raw positions of an account
    fn account_positions(
        &self,
        account: Address,
        start: u64,
        end: u64,
    ) -> impl Future<Output = Result<Vec<PositionProps>>> + Send;

    /// Orders of an account still waiting for a keeper
    fn account_orders(
        &self,
        account: Address,
        start: u64,
        end: u64,
    ) -> impl Future<Output = Result<Vec<OrderInfo>>> + Send;

    fn token_symbol(&self, token: Address) -> impl Future<Output = Result<String>> + Send;

    fn token_decimals(&self, token: Address) -> impl Future<Output = Result<u8>> + Send;

    fn balance_of(
        &self,
        token: Address,
        owner: Address,
    ) -> impl Future<Output = Result<U256>> + Send;

    fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> impl Future<Output = Result<U256>> + Send;

    fn total_supply(&self, token: Address) -> impl Future<Output = Result<U256>> + Send;

    /// Protocol minimum collateral (30-decimal USD)
    fn min_collateral_usd(&self) -> impl Future<Output = Result<U256>> + Send;

    fn native_balance(&self, account: Address) -> impl Future<Output = Result<U256>> + Send;

    /// Replay a mined transaction at its block and return the revert payload, if any
    fn revert_data(
        &self,
        from: Address,
        tx: &TxRequest,
        block: u64,
    ) -> impl Future<Output = Result<Option<Bytes>>> + Send;
}

/// Read a paged Reader list until a short page comes back
pub async fn read_all_pages<T, F, Fut>(page_size: u64, mut read: F) -> Result<Vec<T>>
where
    F: FnMut(u64, u64) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let mut items = Vec::new();
    let mut start = 0u64;
    loop {
        let page = read(start, start + page_size).await?;
        let len = page.len() as u64;
        items.extend(page);
        if len < page_size {
            return Ok(items);
        }
        start += page_size;
    }
}

/// Type alias for read-only provider
type ReadProvider = Arc<RootProvider<Ethereum>>;

/// [`ChainReader`] backed by JSON-RPC `eth_call`
#[derive(Clone)]
pub struct RpcChainReader {
    provider: ReadProvider,
    contracts: Contracts,
}

impl RpcChainReader {
    pub fn new(rpc_url: &str, contracts: Contracts) -> Result<Self> {
        let url: Url = rpc_url.parse().context("Invalid RPC URL")?;
        // Read-only provider without fillers (we only do eth_call operations)
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .network::<Ethereum>()
            .connect_http(url);

        Ok(Self {
            provider: Arc::new(provider),
            contracts,
        })
    }

    async fn eth_call<C: SolCall>(&self, to: Address, call: C) -> Result<C::Return> {
        let result: Bytes = self
            .provider
            .call(
                TransactionRequest::default()
                    .with_to(to)
                    .with_input(call.abi_encode()),
            )
            .await
            .with_context(|| format!("Failed to call {} on {}", C::SIGNATURE, to))?;

        C::abi_decode_returns(&result)
            .with_context(|| format!("Failed to decode {} from {}", C::SIGNATURE, to))
    }
}

impl ChainReader for RpcChainReader {
    async fn markets(&self, start: u64, end: u64) -> Result<Vec<MarketProps>> {
        let call = IReader::getMarketsCall {
            dataStore: self.contracts.data_store,
            start: U256::from(start),
            end: U256::from(end),
        };
        self.eth_call(self.contracts.reader, call).await
    }

    async fn market(&self, market: Address) -> Result<MarketProps> {
        let call = IReader::getMarketCall {
            dataStore: self.contracts.data_store,
            market,
        };
        self.eth_call(self.contracts.reader, call).await
    }

    async fn account_positions(
        &self,
        account: Address,
        start: u64,
        end: u64,
    ) -> Result<Vec<PositionProps>> {
        let call = IReader::getAccountPositionsCall {
            dataStore: self.contracts.data_store,
            account,
            start: U256::from(start),
            end: U256::from(end),
        };
        self.eth_call(self.contracts.reader, call).await
    }

    async fn account_orders(
        &self,
        account: Address,
        start: u64,
        end: u64,
    ) -> Result<Vec<OrderInfo>> {
        let call = IReader::getAccountOrdersCall {
            dataStore: self.contracts.data_store,
            account,
            start: U256::from(start),
            end: U256::from(end),
        };
        self.eth_call(self.contracts.reader, call).await
    }

    async fn token_symbol(&self, token: Address) -> Result<String> {
        self.eth_call(token, IERC20::symbolCall {}).await
    }

    async fn token_decimals(&self, token: Address) -> Result<u8> {
        self.eth_call(token, IERC20::decimalsCall {}).await
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256> {
        self.eth_call(token, IERC20::balanceOfCall { account: owner })
            .await
    }

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        self.eth_call(token, IERC20::allowanceCall { owner, spender })
            .await
    }

    async fn total_supply(&self, token: Address) -> Result<U256> {
        self.eth_call(token, IERC20::totalSupplyCall {}).await
    }

    async fn min_collateral_usd(&self) -> Result<U256> {
        let call = IDataStore::getUintCall {
            key: min_collateral_usd_key(),
        };
        self.eth_call(self.contracts.data_store, call).await
    }

    async fn native_balance(&self, account: Address) -> Result<U256> {
        self.provider
            .get_balance(account)
            .await
            .context("Failed to get native balance")
    }

    async fn revert_data(&self, from: Address, tx: &TxRequest, block: u64) -> Result<Option<Bytes>> {
        let request = TransactionRequest::default()
            .with_from(from)
            .with_to(tx.to)
            .with_value(tx.value)
            .with_input(tx.data.clone());

        match self.provider.call(request).block(BlockId::number(block)).await {
            Ok(_) => Ok(None),
            Err(err) => Ok(err.as_error_resp().and_then(|payload| payload.as_revert_data())),
        }
    }
}
