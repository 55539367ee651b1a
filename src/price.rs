//! Keeper price feed
//!
//! The keeper publishes one price per token as a decimal integer string. Prices are
//! USD-per-smallest-unit scaled by `30 - token_decimals`, so multiplying a raw token amount
//! by its price gives 30-decimal USD directly.
//!
//! A single poller owns the [`PriceWriter`]; any number of [`PriceReader`]s observe whole
//! snapshots. A failed poll leaves the previous snapshot in place.

use crate::error::TxError;
use crate::poller::PollerHandle;
use crate::registry::canonical_address;
use alloy::primitives::{Address, U256};
use eyre::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

/// Keeper `/prices` response body
#[derive(Debug, Deserialize)]
struct PricesResponse {
    #[serde(default)]
    prices: HashMap<String, serde_json::Value>,
}

/// Immutable set of prices captured by one poll
#[derive(Debug, Clone, Default)]
pub struct PriceSnapshot {
    prices: HashMap<Address, U256>,
    /// `None` until the first successful fetch
    fetched_at: Option<Instant>,
}

impl PriceSnapshot {
    /// Snapshot taken now
    pub fn new(prices: HashMap<Address, U256>) -> Self {
        Self {
            prices,
            fetched_at: Some(Instant::now()),
        }
    }

    pub fn get(&self, token: Address) -> Option<U256> {
        self.prices.get(&token).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Time since the snapshot was fetched
    pub fn age(&self) -> Option<Duration> {
        self.fetched_at.map(|at| at.elapsed())
    }

    pub fn is_fresh(&self, max_age: Duration) -> bool {
        self.age().is_some_and(|age| age <= max_age)
    }
}

/// HTTP client for the keeper price endpoint
#[derive(Debug, Clone)]
pub struct PriceFeed {
    client: reqwest::Client,
    url: String,
}

impl PriceFeed {
    /// Create a feed for `{base_url}/prices`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("GmxRustSDK/0.1.0")
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url: format!("{}/prices", base_url.trim_end_matches('/')),
        })
    }

    /// Fetch the latest prices
    pub async fn fetch(&self) -> Result<PriceSnapshot> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("Failed to fetch prices")?
            .error_for_status()
            .context("Price endpoint returned an error")?;

        let text = response.text().await.context("Failed to read response body")?;
        let body: PricesResponse = serde_json::from_str(&text).with_context(|| {
            format!(
                "Failed to parse price response: {}",
                text.chars().take(200).collect::<String>()
            )
        })?;

        Ok(PriceSnapshot::new(parse_prices(body.prices)))
    }
}

/// Canonicalise keys and parse integer prices, skipping malformed entries
fn parse_prices(raw: HashMap<String, serde_json::Value>) -> HashMap<Address, U256> {
    let mut prices = HashMap::with_capacity(raw.len());
    for (key, value) in raw {
        let Ok(token) = canonical_address(&key) else {
            tracing::warn!(key = %key, "Skipping price with invalid token address");
            continue;
        };
        let text = match &value {
            serde_json::Value::String(s) => s.trim().to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => String::new(),
        };
        match U256::from_str_radix(&text, 10) {
            Ok(price) => {
                prices.insert(token, price);
            }
            Err(_) => tracing::warn!(token = %token, value = %value, "Skipping unparseable price"),
        }
    }
    prices
}

/// Create the single-writer / multi-reader price store
pub fn price_store() -> (PriceWriter, PriceReader) {
    let (tx, rx) = watch::channel(Arc::new(PriceSnapshot::default()));
    (PriceWriter { tx }, PriceReader { rx })
}

/// Sole publisher of price snapshots
#[derive(Debug)]
pub struct PriceWriter {
    tx: watch::Sender<Arc<PriceSnapshot>>,
}

impl PriceWriter {
    /// Replace the current snapshot
    pub fn publish(&self, snapshot: PriceSnapshot) {
        self.tx.send_replace(Arc::new(snapshot));
    }

    pub fn reader(&self) -> PriceReader {
        PriceReader {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read handle onto the latest price snapshot
#[derive(Debug, Clone)]
pub struct PriceReader {
    rx: watch::Receiver<Arc<PriceSnapshot>>,
}

impl PriceReader {
    pub fn snapshot(&self) -> Arc<PriceSnapshot> {
        self.rx.borrow().clone()
    }

    /// Latest price of `token`, however old
    pub fn price(&self, token: Address) -> Option<U256> {
        self.rx.borrow().get(token)
    }

    /// Price suitable for pricing a new order
    pub fn fresh_price(&self, token: Address, max_age: Duration) -> Result<U256, TxError> {
        let snapshot = self.snapshot();
        let price = snapshot
            .get(token)
            .filter(|p| !p.is_zero())
            .ok_or(TxError::MissingPrice(token))?;
        let age = snapshot.age().unwrap_or(Duration::MAX);
        if age > max_age {
            return Err(TxError::StalePrice { token, age });
        }
        Ok(price)
    }

    /// Wait for the next published snapshot; false once the writer is gone
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Poll the keeper at a fixed cadence until the handle is shut down or dropped.
///
/// A response that arrives after shutdown is discarded.
pub fn spawn_price_poller(feed: PriceFeed, writer: PriceWriter, interval: Duration) -> PollerHandle {
    PollerHandle::spawn(move |mut stop| async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = stop.stopped() => break,
                _ = ticker.tick() => {}
            }

            let result = tokio::select! {
                _ = stop.stopped() => break,
                result = feed.fetch() => result,
            };

            match result {
                Ok(snapshot) => {
                    tracing::debug!(prices = snapshot.len(), "Price snapshot updated");
                    writer.publish(snapshot);
                }
                Err(e) => tracing::warn!("Price poll failed, keeping last snapshot: {e:#}"),
            }
        }
        tracing::debug!("Price poller stopped");
    })
}
