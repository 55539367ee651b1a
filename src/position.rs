//! Position reconciliation
//!
//! Confirmed positions come from the Reader; optimistic ones are synthesized locally right
//! after an order is mined, before the keeper executes it. [`reconcile`] merges the two,
//! letting a confirmed position supersede any optimistic entry for the same (market, side)
//! whose size is within tolerance.
//!
//! Leverage, liquidation price and PnL are never stored as truth: they are recomputed from
//! size, collateral and entry against the latest mark price on every read.

use crate::config::RiskParams;
use crate::constants::{
    price_to_f64, scale_to_decimals, token_amount_to_usd, unscale_from_decimals, usd_to_f64,
    USD_DECIMALS,
};
use crate::contracts::PositionProps;
use crate::error::TxError;
use crate::order::IntentId;
use crate::price::PriceSnapshot;
use crate::registry::{address_key, MarketRegistry};
use crate::types::Side;
use alloy::primitives::{Address, U256};
use std::time::Duration;
use tokio::time::Instant;

/// Where a position came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSource {
    /// Read from on-chain storage
    Confirmed,
    /// Synthesized after a successful submission
    Optimistic(IntentId),
}

/// Values derived from size, collateral and prices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedMetrics {
    pub entry_price: f64,
    pub leverage: f64,
    pub liquidation_price: f64,
    pub pnl: f64,
}

impl DerivedMetrics {
    /// Compute metrics for a position.
    ///
    /// `size_in_tokens` is in whole index tokens. A zero token size prices the entry at
    /// `mark`; zero collateral gives zero leverage and no liquidation price.
    pub fn compute(
        size_usd: f64,
        collateral_usd: f64,
        size_in_tokens: f64,
        mark: f64,
        side: Side,
        maintenance_factor: f64,
    ) -> Self {
        let entry_price = if size_in_tokens > 0.0 {
            size_usd / size_in_tokens
        } else {
            mark
        };
        Self::from_entry(size_usd, collateral_usd, entry_price, mark, side, maintenance_factor)
    }

    fn from_entry(
        size_usd: f64,
        collateral_usd: f64,
        entry_price: f64,
        mark: f64,
        side: Side,
        maintenance_factor: f64,
    ) -> Self {
        let leverage = if collateral_usd > 0.0 {
            size_usd / collateral_usd
        } else {
            0.0
        };

        let pnl = if entry_price > 0.0 {
            let change = (mark - entry_price) / entry_price * size_usd;
            match side {
                Side::Long => change,
                Side::Short => -change,
            }
        } else {
            0.0
        };

        let liquidation_price = if leverage > 0.0 {
            let buffer = maintenance_factor / leverage;
            match side {
                Side::Long => (entry_price * (1.0 - buffer)).max(0.0),
                Side::Short => entry_price * (1.0 + buffer),
            }
        } else {
            0.0
        };

        Self {
            entry_price,
            leverage,
            liquidation_price,
            pnl,
        }
    }
}

/// A position as shown to the trader
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub id: String,
    pub market: Address,
    pub collateral_token: Address,
    pub side: Side,
    /// 30-decimal USD
    pub size_usd: U256,
    /// Index token units
    pub size_in_tokens: U256,
    pub index_decimals: u8,
    pub collateral_usd: f64,
    /// USD per whole index token
    pub entry_price: f64,
    pub mark_price: f64,
    pub leverage: f64,
    pub liquidation_price: f64,
    pub pnl: f64,
    pub source: PositionSource,
    pub created_at: Instant,
}

impl Position {
    /// Stable identifier of the (market, collateral, side) slot
    pub fn slot_id(market: Address, collateral_token: Address, side: Side) -> String {
        format!(
            "{}:{}:{}",
            address_key(market),
            address_key(collateral_token),
            side
        )
    }

    /// Synthesize a position for an order mined at `index_price`
    #[allow(clippy::too_many_arguments)]
    pub fn optimistic(
        intent: IntentId,
        market: Address,
        collateral_token: Address,
        side: Side,
        size_usd: U256,
        index_price: U256,
        index_decimals: u8,
        collateral_usd: f64,
        maintenance_factor: f64,
    ) -> Self {
        let size_in_tokens = size_usd.checked_div(index_price).unwrap_or_default();
        let mut position = Self {
            id: format!("optimistic:{}", intent),
            market,
            collateral_token,
            side,
            size_usd,
            size_in_tokens,
            index_decimals,
            collateral_usd,
            entry_price: 0.0,
            mark_price: 0.0,
            leverage: 0.0,
            liquidation_price: 0.0,
            pnl: 0.0,
            source: PositionSource::Optimistic(intent),
            created_at: Instant::now(),
        };
        position.remark(price_to_f64(index_price, index_decimals), maintenance_factor);
        position
    }

    pub fn is_optimistic(&self) -> bool {
        matches!(self.source, PositionSource::Optimistic(_))
    }

    pub fn size_usd_f64(&self) -> f64 {
        usd_to_f64(self.size_usd)
    }

    /// Recompute derived fields against a new mark price
    pub fn remark(&mut self, mark: f64, maintenance_factor: f64) {
        let metrics = DerivedMetrics::compute(
            self.size_usd_f64(),
            self.collateral_usd,
            unscale_from_decimals(self.size_in_tokens, self.index_decimals),
            mark,
            self.side,
            maintenance_factor,
        );
        self.entry_price = metrics.entry_price;
        self.mark_price = mark;
        self.leverage = metrics.leverage;
        self.liquidation_price = metrics.liquidation_price;
        self.pnl = metrics.pnl;
    }

    fn same_slot(&self, other: &Position) -> bool {
        self.market == other.market && self.side == other.side
    }
}

/// Build a confirmed position from Reader storage.
///
/// `sizeInTokens` is read with the index token's decimals and collateral with the collateral
/// token's, both from the registry. A missing index price marks the position at its entry.
pub fn position_from_raw(
    raw: &PositionProps,
    registry: &MarketRegistry,
    prices: &PriceSnapshot,
    risk: &RiskParams,
) -> Result<Position, TxError> {
    let market = raw.addresses.market;
    let collateral_token = raw.addresses.collateralToken;
    let side = Side::from_is_long(raw.flags.isLong);

    let index_token = registry
        .index_token(market)
        .ok_or(TxError::UnknownMarket(market))?;
    let index_decimals = registry.index_decimals(market)?;
    // Collateral must be a resolved token; its keeper price already carries its decimals
    registry.decimals(collateral_token)?;

    let collateral_usd = match prices.get(collateral_token) {
        Some(price) => usd_to_f64(token_amount_to_usd(raw.numbers.collateralAmount, price)),
        None => {
            tracing::debug!(token = %collateral_token, "No collateral price, valuing at zero");
            0.0
        }
    };

    let size_usd = raw.numbers.sizeInUsd;
    let size_in_tokens = raw.numbers.sizeInTokens;
    let mark = match prices.get(index_token) {
        Some(price) => price_to_f64(price, index_decimals),
        None => {
            let tokens = unscale_from_decimals(size_in_tokens, index_decimals);
            if tokens > 0.0 {
                usd_to_f64(size_usd) / tokens
            } else {
                0.0
            }
        }
    };

    let mut position = Position {
        id: Position::slot_id(market, collateral_token, side),
        market,
        collateral_token,
        side,
        size_usd,
        size_in_tokens,
        index_decimals,
        collateral_usd,
        entry_price: 0.0,
        mark_price: 0.0,
        leverage: 0.0,
        liquidation_price: 0.0,
        pnl: 0.0,
        source: PositionSource::Confirmed,
        created_at: Instant::now(),
    };
    position.remark(mark, risk.maintenance_factor);
    Ok(position)
}

/// Whether an optimistic position is superseded by a confirmed one
fn collapses_into(optimistic: &Position, confirmed: &Position, tolerance: U256) -> bool {
    let diff = if optimistic.size_usd > confirmed.size_usd {
        optimistic.size_usd - confirmed.size_usd
    } else {
        confirmed.size_usd - optimistic.size_usd
    };
    optimistic.same_slot(confirmed) && diff < tolerance
}

fn size_tolerance(tolerance_usd: f64) -> U256 {
    scale_to_decimals(tolerance_usd, USD_DECIMALS)
}

/// Confirmed positions followed by the optimistic ones no confirmed position supersedes
pub fn reconcile(confirmed: &[Position], optimistic: &[Position], tolerance_usd: f64) -> Vec<Position> {
    let tolerance = size_tolerance(tolerance_usd);
    let mut merged = confirmed.to_vec();
    merged.extend(
        optimistic
            .iter()
            .filter(|o| !confirmed.iter().any(|c| collapses_into(o, c, tolerance)))
            .cloned(),
    );
    merged
}

/// A slot being closed, hidden until the keeper removes it on-chain
#[derive(Debug, Clone)]
struct Closing {
    market: Address,
    collateral_token: Address,
    side: Side,
    since: Instant,
}

impl Closing {
    fn matches(&self, position: &Position) -> bool {
        position.market == self.market
            && position.collateral_token == self.collateral_token
            && position.side == self.side
    }
}

/// Local optimistic state layered over confirmed positions
#[derive(Debug)]
pub struct PositionBook {
    optimistic: Vec<Position>,
    closing: Vec<Closing>,
    timeout: Duration,
}

impl PositionBook {
    /// `timeout` bounds how long unmatched local entries live
    pub fn new(timeout: Duration) -> Self {
        Self {
            optimistic: Vec::new(),
            closing: Vec::new(),
            timeout,
        }
    }

    pub fn push_optimistic(&mut self, position: Position) {
        self.optimistic.push(position);
    }

    pub fn optimistic(&self) -> &[Position] {
        &self.optimistic
    }

    /// Drop local entries for a slot and hide its confirmed position until it disappears
    pub fn mark_closed(&mut self, market: Address, collateral_token: Address, side: Side) {
        self.optimistic.retain(|p| {
            !(p.market == market && p.collateral_token == collateral_token && p.side == side)
        });
        self.closing.push(Closing {
            market,
            collateral_token,
            side,
            since: Instant::now(),
        });
    }

    /// Merge with the latest confirmed positions, pruning collapsed and expired entries
    pub fn reconcile_with(&mut self, confirmed: &[Position], tolerance_usd: f64) -> Vec<Position> {
        let tolerance = size_tolerance(tolerance_usd);
        let timeout = self.timeout;

        let before = self.optimistic.len();
        self.optimistic.retain(|o| {
            o.created_at.elapsed() < timeout
                && !confirmed.iter().any(|c| collapses_into(o, c, tolerance))
        });
        let pruned = before - self.optimistic.len();
        if pruned > 0 {
            tracing::debug!(pruned, "Optimistic positions collapsed or expired");
        }

        self.closing.retain(|closing| {
            closing.since.elapsed() < timeout && confirmed.iter().any(|c| closing.matches(c))
        });

        let visible: Vec<Position> = confirmed
            .iter()
            .filter(|c| !self.closing.iter().any(|closing| closing.matches(c)))
            .cloned()
            .collect();
        reconcile(&visible, &self.optimistic, tolerance_usd)
    }
}
