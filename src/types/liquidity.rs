//! Liquidity (GM token) types

use alloy::primitives::{Address, U256};

/// Deposit `amount` of a market's long or short token to mint GM tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositRequest {
    pub market: Address,
    pub token: Address,
    /// Whole tokens, e.g. "250.5"
    pub amount: String,
}

impl DepositRequest {
    pub fn new(market: Address, token: Address, amount: impl Into<String>) -> Self {
        Self {
            market,
            token,
            amount: amount.into(),
        }
    }
}

/// Burn `amount` GM tokens for the underlying long/short tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalRequest {
    pub market: Address,
    /// Whole GM tokens
    pub amount: String,
}

impl WithdrawalRequest {
    pub fn new(market: Address, amount: impl Into<String>) -> Self {
        Self {
            market,
            amount: amount.into(),
        }
    }
}

/// An account's share of a market's pool
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidityPosition {
    pub market: Address,
    pub gm_balance: U256,
    pub total_supply: U256,
    /// Percentage of the GM supply held (0-100)
    pub share_pct: f64,
    pub pool_value_usd: f64,
    /// `pool_value_usd` scaled by the share
    pub value_usd: f64,
}

impl LiquidityPosition {
    pub fn compute(
        market: Address,
        gm_balance: U256,
        total_supply: U256,
        gm_decimals: u8,
        pool_value_usd: f64,
    ) -> Self {
        let share = if total_supply.is_zero() {
            0.0
        } else {
            let balance = crate::constants::unscale_from_decimals(gm_balance, gm_decimals);
            let supply = crate::constants::unscale_from_decimals(total_supply, gm_decimals);
            (balance / supply).clamp(0.0, 1.0)
        };

        Self {
            market,
            gm_balance,
            total_supply,
            share_pct: share * 100.0,
            pool_value_usd,
            value_usd: pool_value_usd * share,
        }
    }
}
