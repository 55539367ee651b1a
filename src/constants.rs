//! Constants and fixed-point helpers for the GMX SDK
//!
//! Every amount that crosses the contract boundary is an integer scaled by some number of
//! decimals. USD values (sizes, prices) always live in the 30-decimal USD space; token amounts
//! use the token's own decimals, which must come from the registry.

use alloy::primitives::U256;
use eyre::{bail, ensure, Result};

/// USD values (sizes, collateral in USD, prices) use 30 decimals
pub const USD_DECIMALS: u8 = 30;

/// Native / wrapped-native token decimals (execution fee)
pub const NATIVE_DECIMALS: u8 = 18;

/// Largest decimals value a token may declare
pub const MAX_TOKEN_DECIMALS: u8 = 30;

/// Minimum leverage accepted pre-flight
pub const MIN_LEVERAGE: f64 = 1.1;

/// Maximum leverage accepted pre-flight
pub const MAX_LEVERAGE: f64 = 50.0;

/// Default bounded slippage in basis points (1%)
pub const DEFAULT_SLIPPAGE_BPS: u32 = 100;

/// Maximum slippage allowed (100%)
pub const MAX_SLIPPAGE_BPS: u32 = 10_000;

/// Fraction of collateral consumable before liquidation
pub const DEFAULT_MAINTENANCE_FACTOR: f64 = 0.9;

/// Optimistic and confirmed positions match when their sizes differ by less than this (USD)
pub const DEFAULT_SIZE_TOLERANCE_USD: f64 = 1.0;

/// Markets whose pool value is at or below this are not tradable (USD)
pub const DEFAULT_MIN_POOL_VALUE_USD: f64 = 100.0;

/// Used when the DataStore minimum collateral cannot be read (USD)
pub const FALLBACK_MIN_COLLATERAL_USD: f64 = 10.0;

/// Buffer added on top of the protocol minimum collateral to absorb fees (USD)
pub const MIN_COLLATERAL_FEE_BUFFER_USD: f64 = 1.0;

/// Display placeholder for an unresolved symbol
pub const UNKNOWN_SYMBOL: &str = "???";

/// Scale a decimal string ("123.456789") to a fixed-point integer with `decimals` places.
///
/// Extra fractional digits are truncated, never rounded up.
pub fn parse_units(value: &str, decimals: u8) -> Result<U256> {
    let value = value.trim();
    ensure!(!value.is_empty(), "Empty amount");
    ensure!(
        decimals <= MAX_TOKEN_DECIMALS,
        "Unsupported decimals: {}",
        decimals
    );

    let (whole, fraction) = match value.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (value, ""),
    };

    if whole.is_empty() && fraction.is_empty() {
        bail!("Invalid amount: {}", value);
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        bail!("Invalid amount: {}", value);
    }

    let precision = decimals as usize;
    let mut digits = String::with_capacity(whole.len() + precision);
    digits.push_str(if whole.is_empty() { "0" } else { whole });
    if fraction.len() >= precision {
        digits.push_str(&fraction[..precision]);
    } else {
        digits.push_str(fraction);
        digits.extend(std::iter::repeat('0').take(precision - fraction.len()));
    }

    U256::from_str_radix(&digits, 10).map_err(|e| eyre::eyre!("Amount out of range: {}", e))
}

/// Render a fixed-point integer as a decimal string, trimming trailing zeros
pub fn format_units(value: U256, decimals: u8) -> String {
    let digits = value.to_string();
    let precision = decimals as usize;
    if precision == 0 {
        return digits;
    }

    let padded = if digits.len() <= precision {
        format!("{}{}", "0".repeat(precision - digits.len() + 1), digits)
    } else {
        digits
    };
    let (whole, fraction) = padded.split_at(padded.len() - precision);
    let fraction = fraction.trim_end_matches('0');

    if fraction.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, fraction)
    }
}

/// Scale a floating point value to U256 with specified decimals
pub fn scale_to_decimals(value: f64, decimals: u8) -> U256 {
    if !value.is_finite() || value <= 0.0 {
        return U256::ZERO;
    }
    // Go through a string so large decimals don't overflow u128
    let rendered = format!("{:.*}", decimals.min(18) as usize, value);
    parse_units(&rendered, decimals).unwrap_or(U256::ZERO)
}

/// Unscale a U256 value to floating point with specified decimals
pub fn unscale_from_decimals(value: U256, decimals: u8) -> f64 {
    format_units(value, decimals).parse::<f64>().unwrap_or(0.0)
}

/// USD value (30 decimals) as f64
pub fn usd_to_f64(value: U256) -> f64 {
    unscale_from_decimals(value, USD_DECIMALS)
}

/// Convert a keeper price to USD per whole token.
///
/// Keeper prices are USD-per-smallest-unit with `30 - token_decimals` decimals, so the
/// per-whole-token value is `raw * 10^token_decimals / 10^30`.
pub fn price_to_f64(raw: U256, token_decimals: u8) -> f64 {
    unscale_from_decimals(raw, USD_DECIMALS - token_decimals.min(USD_DECIMALS))
}

/// Inverse of [`price_to_f64`]
pub fn price_from_f64(price: f64, token_decimals: u8) -> U256 {
    scale_to_decimals(price, USD_DECIMALS - token_decimals.min(USD_DECIMALS))
}

/// Value of `amount` token units at a keeper `price`, in 30-decimal USD.
///
/// The price already carries the `30 - decimals` scale so the product is USD directly.
pub fn token_amount_to_usd(amount: U256, price: U256) -> U256 {
    amount.saturating_mul(price)
}

/// GMX V2 order type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum GmxOrderType {
    MarketSwap = 0,
    LimitSwap = 1,
    MarketIncrease = 2,
    LimitIncrease = 3,
    MarketDecrease = 4,
    LimitDecrease = 5,
    StopLossDecrease = 6,
    Liquidation = 7,
}

impl From<GmxOrderType> for u8 {
    fn from(order_type: GmxOrderType) -> u8 {
        order_type as u8
    }
}
