//! Network, polling and risk configuration for the GMX SDK

use crate::constants::{
    parse_units, DEFAULT_MAINTENANCE_FACTOR, DEFAULT_MIN_POOL_VALUE_USD,
    DEFAULT_SIZE_TOLERANCE_USD, FALLBACK_MIN_COLLATERAL_USD, MAX_LEVERAGE,
    MIN_COLLATERAL_FEE_BUFFER_USD, MIN_LEVERAGE, NATIVE_DECIMALS,
};
use crate::registry::canonical_address;
use alloy::primitives::{address, Address, U256};
use eyre::{Context, Result};
use std::collections::HashMap;
use std::time::Duration;

/// Protocol contract addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contracts {
    /// Default market (GM token) to trade
    pub market: Address,
    /// Wrapped native token, pays execution fees
    pub wnt: Address,
    /// Stable collateral token
    pub usdc: Address,
    /// ExchangeRouter (multicall entry point)
    pub exchange_router: Address,
    /// Router (ERC20 spender for collateral)
    pub router: Address,
    pub order_vault: Address,
    pub deposit_vault: Address,
    pub withdrawal_vault: Address,
    pub reader: Address,
    pub data_store: Address,
}

impl Default for Contracts {
    fn default() -> Self {
        Self {
            market: address!("0x68dE251394Ccfda893Cc6796B68e5A8b6944F66e"),
            wnt: address!("0xd020d6D39b5550bdc3440Ff8f6EA5f1Cf745b13c"),
            usdc: address!("0xE0105CF6930e8767ADb5425ddc7f8B6df25699A6"),
            exchange_router: address!("0xD5c0a7DFe2e4a5D1BE5927d0816393d145a3f0d5"),
            router: address!("0xD5c0a7DFe2e4a5D1BE5927d0816393d145a3f0d5"),
            order_vault: address!("0xe5474698f1A1c0381BB21476BdA1A4968d017D3a"),
            deposit_vault: address!("0x228FB4eAfACbA605Fc7b160BEd7A4fd1a21E804B"),
            withdrawal_vault: address!("0x8E01E9a99A730bdEd580160D55d9B266127B298A"),
            reader: address!("0x81ec3c87553EDaBd7b391AED31ee6EDd51Ec54b7"),
            data_store: address!("0xF2ea404864b2E9cd5DCA985079Bee6e9BC3AedE2"),
        }
    }
}

/// Cadences and timeouts of the background tasks
#[derive(Debug, Clone, PartialEq)]
pub struct PollingConfig {
    /// Keeper price poll while trading
    pub price_interval: Duration,
    /// Keeper price poll for market listings
    pub listing_price_interval: Duration,
    /// Confirmed position refresh
    pub position_interval: Duration,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
    /// How long a resolved intent stays visible
    pub intent_grace: Duration,
    /// How long an unmatched optimistic position is kept
    pub optimistic_timeout: Duration,
    /// Oldest price accepted when pricing a new order
    pub max_price_age: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            price_interval: Duration::from_secs(2),
            listing_price_interval: Duration::from_secs(10),
            position_interval: Duration::from_secs(3),
            request_timeout: Duration::from_secs(8),
            intent_grace: Duration::from_secs(10),
            optimistic_timeout: Duration::from_secs(60),
            max_price_age: Duration::from_secs(10),
        }
    }
}

/// Risk parameters applied client-side
#[derive(Debug, Clone, PartialEq)]
pub struct RiskParams {
    /// Fraction of collateral consumable before liquidation
    pub maintenance_factor: f64,
    pub min_leverage: f64,
    pub max_leverage: f64,
    /// Optimistic/confirmed size match tolerance (USD)
    pub size_tolerance_usd: f64,
    /// Pool value a market needs to count as active (USD)
    pub min_pool_value_usd: f64,
    /// Used when the DataStore cannot be read (USD)
    pub fallback_min_collateral_usd: f64,
    /// Added on top of the protocol minimum (USD)
    pub min_collateral_buffer_usd: f64,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            maintenance_factor: DEFAULT_MAINTENANCE_FACTOR,
            min_leverage: MIN_LEVERAGE,
            max_leverage: MAX_LEVERAGE,
            size_tolerance_usd: DEFAULT_SIZE_TOLERANCE_USD,
            min_pool_value_usd: DEFAULT_MIN_POOL_VALUE_USD,
            fallback_min_collateral_usd: FALLBACK_MIN_COLLATERAL_USD,
            min_collateral_buffer_usd: MIN_COLLATERAL_FEE_BUFFER_USD,
        }
    }
}

/// Network configuration containing endpoints and contract addresses
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub chain_id: u64,
    /// RPC endpoint URL
    pub rpc_url: String,
    /// Keeper price service base URL
    pub keeper_api_url: String,
    /// Indexer base URL (GraphQL lives under `/v1/graphql`)
    pub subgraph_url: String,
    pub explorer_url: String,
    pub contracts: Contracts,
    /// Execution fee prepaid to the keeper, in wei
    pub min_execution_fee: U256,
    pub polling: PollingConfig,
    pub risk: RiskParams,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkConfig {
    /// Local development network configuration (default)
    pub fn new() -> Self {
        Self {
            chain_id: 22469,
            rpc_url: "http://127.0.0.1:8545".to_string(),
            keeper_api_url: "http://127.0.0.1:9090".to_string(),
            subgraph_url: "http://127.0.0.1:8080".to_string(),
            explorer_url: "https://arbiscan.io".to_string(),
            contracts: Contracts::default(),
            // 0.015 native
            min_execution_fee: U256::from(15_000_000_000_000_000u64),
            polling: PollingConfig::default(),
            risk: RiskParams::default(),
        }
    }

    /// Load from the process environment (and `.env` if present)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env_map(&std::env::vars().collect())
    }

    /// Build from a variable map; unset variables keep their defaults
    pub fn from_env_map(vars: &HashMap<String, String>) -> Result<Self> {
        let mut config = Self::new();

        if let Some(chain_id) = vars.get("GMX_CHAIN_ID") {
            config.chain_id = chain_id
                .parse()
                .with_context(|| format!("Invalid GMX_CHAIN_ID: {}", chain_id))?;
        }
        if let Some(url) = vars.get("GMX_RPC_URL") {
            config.rpc_url = url.clone();
        }
        if let Some(url) = vars.get("GMX_KEEPER_API_URL") {
            config.keeper_api_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = vars.get("GMX_SUBGRAPH_URL") {
            config.subgraph_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = vars.get("GMX_EXPLORER_URL") {
            config.explorer_url = url.clone();
        }
        if let Some(fee) = vars.get("GMX_MIN_EXECUTION_FEE") {
            config.min_execution_fee = parse_units(fee, NATIVE_DECIMALS)
                .with_context(|| format!("Invalid GMX_MIN_EXECUTION_FEE: {}", fee))?;
        }

        let contracts = &mut config.contracts;
        let slots: [(&str, &mut Address); 10] = [
            ("GMX_MARKET_ADDRESS", &mut contracts.market),
            ("GMX_WNT_ADDRESS", &mut contracts.wnt),
            ("GMX_USDC_ADDRESS", &mut contracts.usdc),
            ("GMX_EXCHANGE_ROUTER", &mut contracts.exchange_router),
            ("GMX_ROUTER", &mut contracts.router),
            ("GMX_ORDER_VAULT", &mut contracts.order_vault),
            ("GMX_DEPOSIT_VAULT", &mut contracts.deposit_vault),
            ("GMX_WITHDRAWAL_VAULT", &mut contracts.withdrawal_vault),
            ("GMX_READER_ADDRESS", &mut contracts.reader),
            ("GMX_DATASTORE_ADDRESS", &mut contracts.data_store),
        ];
        for (key, slot) in slots {
            if let Some(value) = vars.get(key) {
                *slot = canonical_address(value).with_context(|| format!("Invalid {}", key))?;
            }
        }

        if let Some(factor) = vars.get("GMX_MAINTENANCE_FACTOR") {
            config.risk.maintenance_factor = factor
                .parse()
                .with_context(|| format!("Invalid GMX_MAINTENANCE_FACTOR: {}", factor))?;
        }
        if let Some(age) = vars.get("GMX_MAX_PRICE_AGE_SECS") {
            let secs: u64 = age
                .parse()
                .with_context(|| format!("Invalid GMX_MAX_PRICE_AGE_SECS: {}", age))?;
            config.polling.max_price_age = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Create custom configuration with specific RPC URL
    pub fn with_rpc_url(mut self, rpc_url: impl Into<String>) -> Self {
        self.rpc_url = rpc_url.into();
        self
    }

    /// Set the keeper price service URL
    pub fn with_keeper_api_url(mut self, url: impl Into<String>) -> Self {
        self.keeper_api_url = url.into();
        self
    }

    /// Set the indexer URL
    pub fn with_subgraph_url(mut self, url: impl Into<String>) -> Self {
        self.subgraph_url = url.into();
        self
    }

    /// Override the risk parameters
    pub fn with_risk(mut self, risk: RiskParams) -> Self {
        self.risk = risk;
        self
    }

    /// Override the polling cadences
    pub fn with_polling(mut self, polling: PollingConfig) -> Self {
        self.polling = polling;
        self
    }

    /// Explorer link for a transaction
    pub fn tx_url(&self, tx_hash: impl std::fmt::Display) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_env_empty() {
        let config = NetworkConfig::from_env_map(&HashMap::new()).unwrap();
        assert_eq!(config.chain_id, 22469);
        assert_eq!(config.polling.price_interval, Duration::from_secs(2));
        assert_eq!(config.risk.maintenance_factor, 0.9);
        assert_eq!(config.contracts, Contracts::default());
    }

    #[test]
    fn test_env_overrides() {
        let config = NetworkConfig::from_env_map(&vars(&[
            ("GMX_CHAIN_ID", "42161"),
            ("GMX_KEEPER_API_URL", "http://keeper:9090/"),
            ("GMX_MIN_EXECUTION_FEE", "0.002"),
            ("GMX_USDC_ADDRESS", "0xAF88D065E77C8CC2239327C5EDB3A432268E5831"),
        ]))
        .unwrap();

        assert_eq!(config.chain_id, 42161);
        assert_eq!(config.keeper_api_url, "http://keeper:9090");
        assert_eq!(
            config.min_execution_fee,
            U256::from(2_000_000_000_000_000u64)
        );
        assert_eq!(
            config.contracts.usdc,
            address!("0xaf88d065e77c8cC2239327C5EDb3A432268e5831")
        );
    }

    #[test]
    fn test_invalid_values_are_errors() {
        assert!(NetworkConfig::from_env_map(&vars(&[("GMX_CHAIN_ID", "abc")])).is_err());
        assert!(NetworkConfig::from_env_map(&vars(&[("GMX_ROUTER", "0x1234")])).is_err());
        assert!(
            NetworkConfig::from_env_map(&vars(&[("GMX_MIN_EXECUTION_FEE", "lots")])).is_err()
        );
    }

    #[test]
    fn test_tx_url() {
        let config = NetworkConfig::new();
        assert_eq!(config.tx_url("0xabc"), "https://arbiscan.io/tx/0xabc");
    }
}
