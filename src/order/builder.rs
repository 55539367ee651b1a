//! Multicall construction
//!
//! Funding the vault and creating the request always travel in one `multicall`, so a fee or
//! collateral transfer can never land without the request that consumes it.

use crate::config::Contracts;
use crate::constants::GmxOrderType;
use crate::contracts::{
    CreateDepositParams, CreateDepositParamsAddresses, CreateOrderParams,
    CreateOrderParamsAddresses, CreateOrderParamsNumbers, CreateWithdrawalParams,
    CreateWithdrawalParamsAddresses, IExchangeRouter,
};
use crate::registry::Market;
use crate::signer::TxRequest;
use crate::types::{OrderKind, Side};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::SolCall;

/// A fully scaled market order
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledOrder {
    pub kind: OrderKind,
    pub market: Address,
    pub collateral_token: Address,
    pub side: Side,
    /// 30-decimal USD
    pub size_delta_usd: U256,
    /// Collateral token decimals; always zero for decreases
    pub collateral_amount: U256,
    /// `30 - index decimals`
    pub acceptable_price: U256,
    /// Wei
    pub execution_fee: U256,
}

impl ScaledOrder {
    fn order_type(&self) -> GmxOrderType {
        match self.kind {
            OrderKind::Increase => GmxOrderType::MarketIncrease,
            OrderKind::Decrease => GmxOrderType::MarketDecrease,
        }
    }

    fn create_order_params(&self, account: Address) -> CreateOrderParams {
        let collateral_delta = match self.kind {
            OrderKind::Increase => self.collateral_amount,
            OrderKind::Decrease => U256::ZERO,
        };

        CreateOrderParams {
            addresses: CreateOrderParamsAddresses {
                receiver: account,
                cancellationReceiver: account,
                callbackContract: Address::ZERO,
                uiFeeReceiver: Address::ZERO,
                market: self.market,
                initialCollateralToken: self.collateral_token,
                swapPath: vec![],
            },
            numbers: CreateOrderParamsNumbers {
                sizeDeltaUsd: self.size_delta_usd,
                initialCollateralDeltaAmount: collateral_delta,
                triggerPrice: U256::ZERO,
                acceptablePrice: self.acceptable_price,
                executionFee: self.execution_fee,
                callbackGasLimit: U256::ZERO,
                minOutputAmount: U256::ZERO,
                validFromTime: U256::ZERO,
            },
            orderType: self.order_type().into(),
            decreasePositionSwapType: 0,
            isLong: self.side.is_long(),
            shouldUnwrapNativeToken: false,
            autoCancel: false,
            referralCode: B256::ZERO,
            dataList: vec![],
        }
    }
}

fn send_wnt(receiver: Address, amount: U256) -> Bytes {
    IExchangeRouter::sendWntCall { receiver, amount }
        .abi_encode()
        .into()
}

fn send_tokens(token: Address, receiver: Address, amount: U256) -> Bytes {
    IExchangeRouter::sendTokensCall {
        token,
        receiver,
        amount,
    }
    .abi_encode()
    .into()
}

/// Calls for an increase (`sendWnt`, `sendTokens`, `createOrder`) or a decrease
/// (`sendWnt`, `createOrder`)
pub fn order_calls(order: &ScaledOrder, account: Address, contracts: &Contracts) -> Vec<Bytes> {
    let mut calls = vec![send_wnt(contracts.order_vault, order.execution_fee)];
    if order.kind == OrderKind::Increase {
        calls.push(send_tokens(
            order.collateral_token,
            contracts.order_vault,
            order.collateral_amount,
        ));
    }
    let create = IExchangeRouter::createOrderCall {
        params: order.create_order_params(account),
    };
    calls.push(create.abi_encode().into());
    calls
}

/// Calls depositing `amount` of `token` into `market`
pub fn deposit_calls(
    market: &Market,
    token: Address,
    amount: U256,
    execution_fee: U256,
    account: Address,
    contracts: &Contracts,
) -> Vec<Bytes> {
    let params = CreateDepositParams {
        addresses: CreateDepositParamsAddresses {
            receiver: account,
            callbackContract: Address::ZERO,
            uiFeeReceiver: Address::ZERO,
            market: market.market_token,
            initialLongToken: market.long_token,
            initialShortToken: market.short_token,
            longTokenSwapPath: vec![],
            shortTokenSwapPath: vec![],
        },
        minMarketTokens: U256::ZERO,
        shouldUnwrapNativeToken: false,
        executionFee: execution_fee,
        callbackGasLimit: U256::ZERO,
        dataList: vec![],
    };

    vec![
        send_wnt(contracts.deposit_vault, execution_fee),
        send_tokens(token, contracts.deposit_vault, amount),
        IExchangeRouter::createDepositCall { params }.abi_encode().into(),
    ]
}

/// Calls burning `gm_amount` market tokens
pub fn withdrawal_calls(
    market: Address,
    gm_amount: U256,
    execution_fee: U256,
    account: Address,
    contracts: &Contracts,
) -> Vec<Bytes> {
    let params = CreateWithdrawalParams {
        addresses: CreateWithdrawalParamsAddresses {
            receiver: account,
            callbackContract: Address::ZERO,
            uiFeeReceiver: Address::ZERO,
            market,
            longTokenSwapPath: vec![],
            shortTokenSwapPath: vec![],
        },
        minLongTokenAmount: U256::ZERO,
        minShortTokenAmount: U256::ZERO,
        shouldUnwrapNativeToken: false,
        executionFee: execution_fee,
        callbackGasLimit: U256::ZERO,
        dataList: vec![],
    };

    vec![
        send_wnt(contracts.withdrawal_vault, execution_fee),
        send_tokens(market, contracts.withdrawal_vault, gm_amount),
        IExchangeRouter::createWithdrawalCall { params }
            .abi_encode()
            .into(),
    ]
}

/// Wrap calls into one `multicall` paying `value`
pub fn multicall_request(exchange_router: Address, calls: Vec<Bytes>, value: U256) -> TxRequest {
    let data = IExchangeRouter::multicallCall { data: calls }.abi_encode();
    TxRequest::new(exchange_router, data).with_value(value)
}
