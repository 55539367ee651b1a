//! Owned trading state and the position poller
//!
//! [`TradingEngine`] is the single owner of everything the pollers and the order path share:
//! registry, intent book, optimistic positions and the latest confirmed positions. Confirmed
//! positions are stored raw and turned into [`Position`]s on read, so derived metrics always
//! reflect the newest price snapshot.

use crate::chain::{read_all_pages, ChainReader};
use crate::config::NetworkConfig;
use crate::constants::price_to_f64;
use crate::contracts::PositionProps;
use crate::order::{IntentBook, OrderIntent};
use crate::poller::PollerHandle;
use crate::position::{position_from_raw, Position, PositionBook};
use crate::price::PriceReader;
use crate::registry::MarketRegistry;
use crate::types::PendingOrder;
use alloy::primitives::Address;
use eyre::{eyre, Context, Result};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::time::{Instant, MissedTickBehavior};

/// Account positions and orders requested per call
const ACCOUNT_PAGE: u64 = 1_000;

/// Raw positions from the latest successful read
#[derive(Debug, Clone, Default)]
pub struct ConfirmedPositions {
    pub positions: Vec<PositionProps>,
    pub fetched_at: Option<Instant>,
}

/// Shared trading state for one account
pub struct TradingEngine<R: ChainReader> {
    reader: Arc<R>,
    account: Address,
    config: NetworkConfig,
    prices: PriceReader,
    registry: Arc<RwLock<MarketRegistry>>,
    intents: Arc<RwLock<IntentBook>>,
    book: Arc<RwLock<PositionBook>>,
    confirmed: watch::Receiver<Arc<ConfirmedPositions>>,
    /// Taken by the position poller
    confirmed_tx: Option<watch::Sender<Arc<ConfirmedPositions>>>,
}

impl<R: ChainReader + 'static> TradingEngine<R> {
    pub fn new(reader: Arc<R>, account: Address, config: NetworkConfig, prices: PriceReader) -> Self {
        let (confirmed_tx, confirmed) = watch::channel(Arc::new(ConfirmedPositions::default()));
        Self {
            reader,
            account,
            intents: Arc::new(RwLock::new(IntentBook::new(config.polling.intent_grace))),
            book: Arc::new(RwLock::new(PositionBook::new(
                config.polling.optimistic_timeout,
            ))),
            config,
            prices,
            registry: Arc::new(RwLock::new(MarketRegistry::new())),
            confirmed,
            confirmed_tx: Some(confirmed_tx),
        }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn prices(&self) -> &PriceReader {
        &self.prices
    }

    pub fn registry(&self) -> &RwLock<MarketRegistry> {
        &self.registry
    }

    pub fn intents(&self) -> &RwLock<IntentBook> {
        &self.intents
    }

    pub fn position_book(&self) -> &RwLock<PositionBook> {
        &self.book
    }

    /// Re-resolve all markets against the current prices
    pub async fn refresh_markets(&self) -> Result<()> {
        let snapshot = self.prices.snapshot();
        let registry =
            MarketRegistry::resolve_markets(self.reader.as_ref(), &snapshot, &self.config.risk)
                .await?;
        *self.registry.write().await = registry;
        Ok(())
    }

    /// Read confirmed positions once and publish them.
    ///
    /// Markets missing from the registry are resolved first so their decimals are known.
    pub async fn refresh_positions(&self) -> Result<()> {
        let sender = self
            .confirmed_tx
            .as_ref()
            .ok_or_else(|| eyre!("Confirmed positions are owned by the position poller"))?;
        let positions = fetch_positions(self.reader.as_ref(), self.account, &self.registry).await?;
        sender.send_replace(Arc::new(positions));
        Ok(())
    }

    /// Poll confirmed positions every `position_interval` until the handle is dropped.
    ///
    /// The poller becomes the only writer of confirmed positions; a second call fails.
    pub fn spawn_position_poller(&mut self) -> Result<PollerHandle> {
        let sender = self
            .confirmed_tx
            .take()
            .ok_or_else(|| eyre!("Position poller already running"))?;
        let reader = self.reader.clone();
        let registry = self.registry.clone();
        let intents = self.intents.clone();
        let account = self.account;
        let interval = self.config.polling.position_interval;

        Ok(PollerHandle::spawn(move |mut stop| async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = stop.stopped() => break,
                    _ = ticker.tick() => {}
                }

                let result = tokio::select! {
                    _ = stop.stopped() => break,
                    result = fetch_positions(reader.as_ref(), account, &registry) => result,
                };

                match result {
                    Ok(positions) => {
                        tracing::debug!(count = positions.positions.len(), "Confirmed positions updated");
                        sender.send_replace(Arc::new(positions));
                    }
                    Err(e) => tracing::warn!("Position poll failed, keeping last snapshot: {e:#}"),
                }

                intents.write().await.prune();
            }
            tracing::debug!("Position poller stopped");
        }))
    }

    /// Raw confirmed positions from the latest successful read
    pub fn confirmed(&self) -> Arc<ConfirmedPositions> {
        self.confirmed.borrow().clone()
    }

    /// Wait for the next confirmed-position update
    pub async fn confirmed_changed(&mut self) -> bool {
        self.confirmed.changed().await.is_ok()
    }

    /// Confirmed and surviving optimistic positions, marked against the latest prices
    pub async fn positions(&self) -> Vec<Position> {
        let snapshot = self.prices.snapshot();
        let raw = self.confirmed();
        let risk = &self.config.risk;
        let registry = self.registry.read().await;

        let confirmed: Vec<Position> = raw
            .positions
            .iter()
            .filter_map(|p| match position_from_raw(p, &registry, &snapshot, risk) {
                Ok(position) => Some(position),
                Err(e) => {
                    tracing::warn!(market = %p.addresses.market, "Skipping position: {e}");
                    None
                }
            })
            .collect();

        let merged = self
            .book
            .write()
            .await
            .reconcile_with(&confirmed, risk.size_tolerance_usd);

        merged
            .into_iter()
            .map(|mut position| {
                if position.is_optimistic() {
                    let mark = registry
                        .index_token(position.market)
                        .and_then(|index| snapshot.get(index))
                        .map(|price| price_to_f64(price, position.index_decimals));
                    if let Some(mark) = mark {
                        position.remark(mark, risk.maintenance_factor);
                    }
                }
                position
            })
            .collect()
    }

    /// Tracked intents, newest first, after pruning expired ones
    pub async fn intent_list(&self) -> Vec<OrderIntent> {
        let mut intents = self.intents.write().await;
        intents.prune();
        intents.list()
    }

    /// Orders created on-chain and not yet executed by a keeper
    pub async fn pending_orders(&self) -> Result<Vec<PendingOrder>> {
        let reader = self.reader.as_ref();
        let account = self.account;
        let orders = read_all_pages(ACCOUNT_PAGE, move |start, end| {
            reader.account_orders(account, start, end)
        })
        .await
        .context("Failed to read account orders")?;
        Ok(orders.iter().map(PendingOrder::from).collect())
    }
}

async fn fetch_positions<R: ChainReader>(
    reader: &R,
    account: Address,
    registry: &RwLock<MarketRegistry>,
) -> Result<ConfirmedPositions> {
    let mut positions = read_all_pages(ACCOUNT_PAGE, move |start, end| {
        reader.account_positions(account, start, end)
    })
    .await
    .context("Failed to read account positions")?;
    // The Reader keeps emptied slots around with zero size
    positions.retain(|p| !p.numbers.sizeInUsd.is_zero());

    let unknown: BTreeSet<Address> = {
        let registry = registry.read().await;
        positions
            .iter()
            .map(|p| p.addresses.market)
            .filter(|market| registry.index_token(*market).is_none())
            .collect()
    };
    if !unknown.is_empty() {
        let mut registry = registry.write().await;
        for market in unknown {
            if let Err(e) = registry.resolve_market(reader, market).await {
                tracing::warn!(%market, "Failed to resolve position market: {e:#}");
            }
        }
    }

    Ok(ConfirmedPositions {
        positions,
        fetched_at: Some(Instant::now()),
    })
}
