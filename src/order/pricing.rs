//! Acceptable-price policy
//!
//! Execution happens later at the keeper's oracle price, so every order pre-commits to the
//! worst price it tolerates. Buying exposure (increase long, decrease short) sets a ceiling;
//! selling exposure (increase short, decrease long) sets a floor.

use crate::constants::{DEFAULT_SLIPPAGE_BPS, MAX_SLIPPAGE_BPS};
use crate::types::{OrderKind, Side};
use alloy::primitives::U256;

const BPS_DENOMINATOR: u64 = 10_000;

/// How far from the current price an order may execute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptablePricePolicy {
    /// Ceiling/floor at `current × (1 ± slippage)`
    Bounded { slippage_bps: u32 },
    /// Any price: `U256::MAX` ceiling or zero floor
    Permissive,
}

impl Default for AcceptablePricePolicy {
    fn default() -> Self {
        Self::Bounded {
            slippage_bps: DEFAULT_SLIPPAGE_BPS,
        }
    }
}

impl AcceptablePricePolicy {
    pub fn is_permissive(&self) -> bool {
        matches!(self, Self::Permissive)
    }
}

/// Whether the order buys exposure and therefore needs a price ceiling
pub fn is_price_ceiling(side: Side, kind: OrderKind) -> bool {
    matches!(
        (side, kind),
        (Side::Long, OrderKind::Increase) | (Side::Short, OrderKind::Decrease)
    )
}

/// Acceptable price for an order at `current`, in the same scale as `current`
pub fn acceptable_price(
    current: U256,
    side: Side,
    kind: OrderKind,
    policy: AcceptablePricePolicy,
) -> U256 {
    let ceiling = is_price_ceiling(side, kind);
    match policy {
        AcceptablePricePolicy::Permissive if ceiling => U256::MAX,
        AcceptablePricePolicy::Permissive => U256::ZERO,
        AcceptablePricePolicy::Bounded { slippage_bps } => {
            let slippage = U256::from(slippage_bps.min(MAX_SLIPPAGE_BPS));
            let denominator = U256::from(BPS_DENOMINATOR);
            let factor = if ceiling {
                denominator + slippage
            } else {
                denominator - slippage
            };
            current.saturating_mul(factor) / denominator
        }
    }
}
