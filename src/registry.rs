//! Token & market registry
//!
//! Resolves raw market tuples into tradable markets and supplies the symbol/decimals context
//! every amount conversion needs. Decimals are never assumed: a token missing from the
//! registry is an error at the conversion site.

use crate::chain::{read_all_pages, ChainReader};
use crate::config::RiskParams;
use crate::constants::{
    token_amount_to_usd, usd_to_f64, MAX_TOKEN_DECIMALS, UNKNOWN_SYMBOL,
};
use crate::contracts::MarketProps;
use crate::error::TxError;
use crate::price::PriceSnapshot;
use alloy::primitives::{Address, U256};
use eyre::{ensure, Context, Result};
use futures::future::join_all;
use std::collections::{BTreeSet, HashMap};

/// Markets requested from the Reader per call
const MARKETS_PAGE: u64 = 100;

/// Parse an address in any letter case.
///
/// Every map in the SDK is keyed by [`Address`], so this is the single place strings
/// (keeper JSON keys, env vars, user input) become keys.
pub fn canonical_address(value: &str) -> Result<Address> {
    let trimmed = value.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    ensure!(hex.len() == 40, "Invalid address length: {}", value);
    hex.to_ascii_lowercase()
        .parse::<Address>()
        .with_context(|| format!("Invalid address: {}", value))
}

/// Lowercase hex form used on the wire (keeper keys, subgraph filters)
pub fn address_key(address: Address) -> String {
    format!("{:#x}", address)
}

/// Resolved ERC20 metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

impl Token {
    pub fn new(address: Address, symbol: impl Into<String>, decimals: u8) -> Result<Self> {
        ensure!(
            decimals <= MAX_TOKEN_DECIMALS,
            "Token {} declares {} decimals",
            address,
            decimals
        );
        Ok(Self {
            address,
            symbol: symbol.into(),
            decimals,
        })
    }
}

/// A tradable market: an index asset backed by a long and a short collateral token
#[derive(Debug, Clone, PartialEq)]
pub struct Market {
    /// Market address (also the GM token)
    pub market_token: Address,
    pub index_token: Address,
    pub long_token: Address,
    pub short_token: Address,
    /// Display name, e.g. "ETH-USD"
    pub name: String,
    /// Long + short token balances held by the market, in USD
    pub pool_value_usd: f64,
    /// Pool value above the minimum-liquidity threshold
    pub is_active: bool,
}

impl Market {
    /// Whether `token` can be posted as collateral in this market
    pub fn accepts_collateral(&self, token: Address) -> bool {
        token == self.long_token || token == self.short_token
    }
}

/// Resolved tokens and markets
#[derive(Debug, Clone, Default)]
pub struct MarketRegistry {
    tokens: HashMap<Address, Token>,
    markets: Vec<Market>,
    /// Index token for markets seen via `getMarket`, including untradable ones
    index_tokens: HashMap<Address, Address>,
}

impl MarketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register token metadata
    pub fn insert_token(&mut self, token: Token) {
        self.tokens.insert(token.address, token);
    }

    /// Register a market
    pub fn insert_market(&mut self, market: Market) {
        self.index_tokens
            .insert(market.market_token, market.index_token);
        self.markets.retain(|m| m.market_token != market.market_token);
        self.markets.push(market);
    }

    pub fn token(&self, address: Address) -> Option<&Token> {
        self.tokens.get(&address)
    }

    /// Decimals of a registered token
    pub fn decimals(&self, address: Address) -> Result<u8, TxError> {
        self.tokens
            .get(&address)
            .map(|t| t.decimals)
            .ok_or(TxError::UnknownToken(address))
    }

    /// Symbol of a token or the "???" placeholder
    pub fn token_symbol(&self, address: Address) -> &str {
        self.tokens
            .get(&address)
            .map(|t| t.symbol.as_str())
            .unwrap_or(UNKNOWN_SYMBOL)
    }

    pub fn markets(&self) -> &[Market] {
        &self.markets
    }

    /// Markets with enough liquidity to trade
    pub fn active_markets(&self) -> impl Iterator<Item = &Market> {
        self.markets.iter().filter(|m| m.is_active)
    }

    pub fn market(&self, market: Address) -> Result<&Market, TxError> {
        self.markets
            .iter()
            .find(|m| m.market_token == market)
            .ok_or(TxError::UnknownMarket(market))
    }

    /// Decimals of the market's index token, used to read `sizeInTokens`
    pub fn index_decimals(&self, market: Address) -> Result<u8, TxError> {
        let index = self
            .index_tokens
            .get(&market)
            .copied()
            .ok_or(TxError::UnknownMarket(market))?;
        self.decimals(index)
    }

    /// Index token of a market
    pub fn index_token(&self, market: Address) -> Option<Address> {
        self.index_tokens.get(&market).copied()
    }

    /// Display name such as `"ETH-USD (USDC)"`; degrades to `"???"` parts instead of failing
    pub fn resolve_market_name(&self, market: Address, collateral: Address) -> String {
        let index_symbol = self
            .index_tokens
            .get(&market)
            .map(|index| self.token_symbol(*index))
            .unwrap_or(UNKNOWN_SYMBOL);
        let collateral_symbol = self.token_symbol(collateral);
        format!("{}-USD ({})", index_symbol, collateral_symbol)
    }

    /// Pick the requested market, else `default`, else the first active market
    pub fn select_market(&self, requested: Option<Address>, default: Address) -> Option<&Market> {
        requested
            .and_then(|addr| self.market(addr).ok())
            .or_else(|| self.market(default).ok())
            .or_else(|| self.active_markets().next())
            .or_else(|| self.markets.first())
    }

    /// Resolve every market from the Reader, replacing the registry contents.
    ///
    /// Swap-only pools (zero index token) and markets whose index symbol cannot be read are
    /// excluded. Token metadata is fetched concurrently in one batch.
    pub async fn resolve_markets<R: ChainReader>(
        reader: &R,
        prices: &PriceSnapshot,
        risk: &RiskParams,
    ) -> Result<Self> {
        let raw = read_all_pages(MARKETS_PAGE, move |start, end| reader.markets(start, end))
            .await
            .context("Failed to read markets")?;

        let mut registry = Self::new();
        registry.resolve_tokens(reader, &raw).await;

        let tradable: Vec<&MarketProps> = raw
            .iter()
            .filter(|m| m.indexToken != Address::ZERO)
            .filter(|m| registry.token(m.indexToken).is_some())
            .collect();

        let balances = join_all(tradable.iter().map(|m| async move {
            let long = reader.balance_of(m.longToken, m.marketToken).await;
            let short = reader.balance_of(m.shortToken, m.marketToken).await;
            (long, short)
        }))
        .await;

        for (m, (long, short)) in tradable.into_iter().zip(balances) {
            let pool_value_usd = match (long, short) {
                (Ok(long), Ok(short)) => {
                    let long_usd = prices
                        .get(m.longToken)
                        .map(|p| token_amount_to_usd(long, p))
                        .unwrap_or(U256::ZERO);
                    let short_usd = prices
                        .get(m.shortToken)
                        .map(|p| token_amount_to_usd(short, p))
                        .unwrap_or(U256::ZERO);
                    usd_to_f64(long_usd.saturating_add(short_usd))
                }
                (long, short) => {
                    tracing::warn!(
                        market = %m.marketToken,
                        long_ok = long.is_ok(),
                        short_ok = short.is_ok(),
                        "Failed to read pool balances"
                    );
                    0.0
                }
            };

            let name = format!("{}-USD", registry.token_symbol(m.indexToken));
            registry.insert_market(Market {
                market_token: m.marketToken,
                index_token: m.indexToken,
                long_token: m.longToken,
                short_token: m.shortToken,
                name,
                pool_value_usd,
                is_active: pool_value_usd > risk.min_pool_value_usd,
            });
        }

        tracing::info!(
            markets = registry.markets.len(),
            active = registry.active_markets().count(),
            "Resolved markets"
        );
        Ok(registry)
    }

    /// Register a market by address via `getMarket`, e.g. for a position in a market the
    /// listing did not return
    pub async fn resolve_market<R: ChainReader>(&mut self, reader: &R, market: Address) -> Result<()> {
        let props = reader
            .market(market)
            .await
            .with_context(|| format!("Failed to read market {}", market))?;
        self.resolve_tokens(reader, std::slice::from_ref(&props)).await;
        self.index_tokens.insert(market, props.indexToken);
        Ok(())
    }

    async fn resolve_tokens<R: ChainReader>(&mut self, reader: &R, markets: &[MarketProps]) {
        let addresses: BTreeSet<Address> = markets
            .iter()
            .flat_map(|m| [m.marketToken, m.indexToken, m.longToken, m.shortToken])
            .filter(|a| *a != Address::ZERO && !self.tokens.contains_key(a))
            .collect();

        let resolved = join_all(addresses.into_iter().map(|address| async move {
            let symbol = reader.token_symbol(address).await;
            let decimals = reader.token_decimals(address).await;
            (address, symbol, decimals)
        }))
        .await;

        for (address, symbol, decimals) in resolved {
            match (symbol, decimals) {
                (Ok(symbol), Ok(decimals)) if !symbol.trim().is_empty() => {
                    match Token::new(address, symbol, decimals) {
                        Ok(token) => self.insert_token(token),
                        Err(e) => tracing::warn!(token = %address, "Rejected token: {e}"),
                    }
                }
                _ => tracing::warn!(token = %address, "Could not resolve token metadata"),
            }
        }
    }
}
