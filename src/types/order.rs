//! Order request types

use super::{OrderKind, Side};
use crate::constants::{format_units, USD_DECIMALS};
use crate::contracts::OrderInfo;
use crate::order::AcceptablePricePolicy;
use crate::position::Position;
use alloy::primitives::{Address, B256, U256};

/// Parameters for opening or growing a position
#[derive(Debug, Clone, PartialEq)]
pub struct IncreaseOrderRequest {
    /// Market (GM token) address
    pub market: Address,
    /// Token posted as collateral; must be the market's long or short token
    pub collateral_token: Address,
    pub side: Side,
    /// Collateral in whole tokens, e.g. "1000" USDC
    pub collateral_amount: String,
    /// Position size in USD, e.g. "5000"
    pub size_usd: String,
    pub policy: AcceptablePricePolicy,
}

impl IncreaseOrderRequest {
    /// Market order with the default bounded slippage
    pub fn market(
        market: Address,
        collateral_token: Address,
        side: Side,
        collateral_amount: impl Into<String>,
        size_usd: impl Into<String>,
    ) -> Self {
        Self {
            market,
            collateral_token,
            side,
            collateral_amount: collateral_amount.into(),
            size_usd: size_usd.into(),
            policy: AcceptablePricePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: AcceptablePricePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Bounded slippage in basis points
    pub fn with_slippage_bps(mut self, slippage_bps: u32) -> Self {
        self.policy = AcceptablePricePolicy::Bounded { slippage_bps };
        self
    }

    /// Accept any execution price
    pub fn permissive(self) -> Self {
        self.with_policy(AcceptablePricePolicy::Permissive)
    }
}

/// Parameters for shrinking or closing a position
#[derive(Debug, Clone, PartialEq)]
pub struct DecreaseOrderRequest {
    pub market: Address,
    pub collateral_token: Address,
    pub side: Side,
    /// USD size to remove, e.g. "5000"
    pub size_delta_usd: String,
    pub policy: AcceptablePricePolicy,
}

impl DecreaseOrderRequest {
    pub fn market(
        market: Address,
        collateral_token: Address,
        side: Side,
        size_delta_usd: impl Into<String>,
    ) -> Self {
        Self {
            market,
            collateral_token,
            side,
            size_delta_usd: size_delta_usd.into(),
            policy: AcceptablePricePolicy::default(),
        }
    }

    /// Close the whole of `position`
    pub fn close(position: &Position) -> Self {
        Self::market(
            position.market,
            position.collateral_token,
            position.side,
            format_units(position.size_usd, USD_DECIMALS),
        )
    }

    pub fn with_policy(mut self, policy: AcceptablePricePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_slippage_bps(mut self, slippage_bps: u32) -> Self {
        self.policy = AcceptablePricePolicy::Bounded { slippage_bps };
        self
    }
}

/// An order created on-chain and still waiting for a keeper
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOrder {
    pub key: B256,
    pub market: Address,
    pub collateral_token: Address,
    pub side: Side,
    /// `None` for swaps
    pub kind: Option<OrderKind>,
    pub order_type: u8,
    pub size_delta_usd: U256,
    pub collateral_delta: U256,
    pub acceptable_price: U256,
    pub execution_fee: U256,
    pub is_frozen: bool,
}

impl From<&OrderInfo> for PendingOrder {
    fn from(info: &OrderInfo) -> Self {
        let order = &info.order;
        let order_type = order.numbers.orderType;
        let kind = match order_type {
            2 | 3 => Some(OrderKind::Increase),
            4..=7 => Some(OrderKind::Decrease),
            _ => None,
        };
        Self {
            key: info.orderKey,
            market: order.addresses.market,
            collateral_token: order.addresses.initialCollateralToken,
            side: Side::from_is_long(order.flags.isLong),
            kind,
            order_type,
            size_delta_usd: order.numbers.sizeDeltaUsd,
            collateral_delta: order.numbers.initialCollateralDeltaAmount,
            acceptable_price: order.numbers.acceptablePrice,
            execution_fee: order.numbers.executionFee,
            is_frozen: order.flags.isFrozen,
        }
    }
}
