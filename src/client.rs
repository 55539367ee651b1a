//! GmxClient - main entry point for the SDK

use crate::approval::{self, ApprovalState};
use crate::chain::{ChainReader, RpcChainReader};
use crate::config::NetworkConfig;
use crate::constants::{parse_units, token_amount_to_usd, usd_to_f64, USD_DECIMALS};
use crate::contracts::decode_revert_reason;
use crate::engine::TradingEngine;
use crate::error::{classify_submission_error, TxError, ValidationError};
use crate::order::{
    acceptable_price, deposit_calls, multicall_request, order_calls, validation, withdrawal_calls,
    IntentId, NewIntent, ScaledOrder,
};
use crate::position::Position;
use crate::price::PriceReader;
use crate::signer::{TransactionSigner, TxRequest};
use crate::types::{
    DecreaseOrderRequest, DepositRequest, IncreaseOrderRequest, LiquidityPosition, OrderKind,
    WithdrawalRequest,
};
use alloy::primitives::{Address, TxHash, U256};
use eyre::{Context, Result};
use std::sync::Arc;

/// Outcome of a mined order
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedOrder {
    pub intent_id: IntentId,
    pub tx_hash: TxHash,
    pub acceptable_price: U256,
    /// Optimistic position synthesized for an increase
    pub position: Option<Position>,
}

/// Main client for interacting with a GMX V2 deployment
pub struct GmxClient<S: TransactionSigner, R: ChainReader> {
    signer: S,
    engine: TradingEngine<R>,
}

impl<S: TransactionSigner> GmxClient<S, RpcChainReader> {
    /// Create a client reading the chain over JSON-RPC
    pub fn new(signer: S, config: NetworkConfig, prices: PriceReader) -> Result<Self> {
        let reader = RpcChainReader::new(&config.rpc_url, config.contracts.clone())?;
        Ok(Self::with_reader(signer, Arc::new(reader), config, prices))
    }
}

impl<S: TransactionSigner, R: ChainReader + 'static> GmxClient<S, R> {
    /// Create a client over any chain reader
    pub fn with_reader(signer: S, reader: Arc<R>, config: NetworkConfig, prices: PriceReader) -> Self {
        let engine = TradingEngine::new(reader, signer.address(), config, prices);
        Self { signer, engine }
    }

    /// Get the signer's address
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// Get the network configuration
    pub fn config(&self) -> &NetworkConfig {
        self.engine.config()
    }

    pub fn engine(&self) -> &TradingEngine<R> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut TradingEngine<R> {
        &mut self.engine
    }

    fn reader(&self) -> &R {
        self.engine.reader()
    }

    // ========== Balances & Approvals ==========

    /// ERC20 balance of the signer
    pub async fn token_balance(&self, token: Address) -> Result<U256> {
        self.reader()
            .balance_of(token, self.address())
            .await
            .with_context(|| format!("Failed to read balance of {}", token))
    }

    /// Native balance of the signer
    pub async fn native_balance(&self) -> Result<U256> {
        self.signer.get_balance().await
    }

    /// Signer's allowance of `token` to the router
    pub async fn check_approval(&self, token: Address, required: U256) -> Result<ApprovalState> {
        approval::check_approval(
            self.reader(),
            token,
            self.address(),
            self.config().contracts.router,
            required,
        )
        .await
    }

    /// Approve the router for an unlimited amount of `token` and wait for it to land
    pub async fn approve_collateral(
        &self,
        token: Address,
        required: U256,
    ) -> Result<ApprovalState, TxError> {
        approval::approve_and_confirm(
            &self.signer,
            self.reader(),
            token,
            self.config().contracts.router,
            required,
        )
        .await
    }

    // ========== Trading Operations ==========

    /// Open or grow a position.
    ///
    /// Runs every pre-flight check, records a pending intent, submits the fee, collateral and
    /// `createOrder` legs in one multicall and waits for the receipt. On success an optimistic
    /// position is added until the confirmed one appears.
    pub async fn submit_increase_order(
        &self,
        req: IncreaseOrderRequest,
    ) -> Result<SubmittedOrder, TxError> {
        let config = self.config();
        let account = self.address();

        let (market, collateral_decimals, collateral_symbol, index_decimals) = {
            let registry = self.engine.registry().read().await;
            let market = registry.market(req.market)?.clone();
            if !market.accepts_collateral(req.collateral_token) {
                return Err(TxError::UnknownToken(req.collateral_token));
            }
            (
                market,
                registry.decimals(req.collateral_token)?,
                registry.token_symbol(req.collateral_token).to_string(),
                registry.index_decimals(req.market)?,
            )
        };

        let size_usd = parse_amount(&req.size_usd, USD_DECIMALS)?;
        let collateral_amount = parse_amount(&req.collateral_amount, collateral_decimals)?;

        let prices = self.engine.prices();
        let max_age = config.polling.max_price_age;
        let index_price = prices.fresh_price(market.index_token, max_age)?;
        let collateral_price = prices.fresh_price(req.collateral_token, max_age)?;
        let collateral_usd = usd_to_f64(token_amount_to_usd(collateral_amount, collateral_price));

        let reader = self.reader();
        let (balance, native, min_collateral) = tokio::join!(
            reader.balance_of(req.collateral_token, account),
            reader.native_balance(account),
            validation::min_collateral_usd(reader, &config.risk),
        );
        let checks = validation::IncreaseChecks {
            collateral_amount,
            collateral_usd,
            size_usd: usd_to_f64(size_usd),
            collateral_balance: balance.map_err(read_failure)?,
            collateral_symbol,
            native_balance: native.map_err(read_failure)?,
            execution_fee: config.min_execution_fee,
            min_collateral_usd: min_collateral,
        };
        validation::validate_increase(&checks, &config.risk)?;
        validation::ensure_allowance(
            reader,
            req.collateral_token,
            account,
            config.contracts.router,
            collateral_amount,
        )
        .await?;

        let order = ScaledOrder {
            kind: OrderKind::Increase,
            market: req.market,
            collateral_token: req.collateral_token,
            side: req.side,
            size_delta_usd: size_usd,
            collateral_amount,
            acceptable_price: acceptable_price(index_price, req.side, OrderKind::Increase, req.policy),
            execution_fee: config.min_execution_fee,
        };
        tracing::info!(
            market = %order.market,
            side = %order.side,
            size_usd = %req.size_usd,
            collateral = %req.collateral_amount,
            leverage = checks.leverage(),
            permissive = req.policy.is_permissive(),
            "Submitting increase order"
        );

        let (intent_id, tx_hash) = self.submit_order(&order, index_price).await?;

        let position = Position::optimistic(
            intent_id,
            order.market,
            order.collateral_token,
            order.side,
            size_usd,
            index_price,
            index_decimals,
            collateral_usd,
            config.risk.maintenance_factor,
        );
        self.engine
            .position_book()
            .write()
            .await
            .push_optimistic(position.clone());

        Ok(SubmittedOrder {
            intent_id,
            tx_hash,
            acceptable_price: order.acceptable_price,
            position: Some(position),
        })
    }

    /// Shrink or close a position.
    ///
    /// Acceptable-price polarity is inverted relative to opening. When the order covers the
    /// whole displayed position it is removed locally as soon as the order is mined.
    pub async fn submit_decrease_order(
        &self,
        req: DecreaseOrderRequest,
    ) -> Result<SubmittedOrder, TxError> {
        let config = self.config();

        let index_token = {
            let registry = self.engine.registry().read().await;
            let index = registry
                .index_token(req.market)
                .ok_or(TxError::UnknownMarket(req.market))?;
            registry.decimals(index)?;
            index
        };

        let size_delta = parse_amount(&req.size_delta_usd, USD_DECIMALS)?;
        let index_price = self
            .engine
            .prices()
            .fresh_price(index_token, config.polling.max_price_age)?;
        let native = self
            .reader()
            .native_balance(self.address())
            .await
            .map_err(read_failure)?;
        validation::validate_decrease(size_delta, native, config.min_execution_fee)?;

        let closes_fully = self
            .engine
            .positions()
            .await
            .iter()
            .find(|p| {
                p.market == req.market
                    && p.collateral_token == req.collateral_token
                    && p.side == req.side
            })
            .map_or(true, |p| size_delta >= p.size_usd);

        let order = ScaledOrder {
            kind: OrderKind::Decrease,
            market: req.market,
            collateral_token: req.collateral_token,
            side: req.side,
            size_delta_usd: size_delta,
            collateral_amount: U256::ZERO,
            acceptable_price: acceptable_price(index_price, req.side, OrderKind::Decrease, req.policy),
            execution_fee: config.min_execution_fee,
        };
        tracing::info!(
            market = %order.market,
            side = %order.side,
            size_usd = %req.size_delta_usd,
            closes_fully,
            "Submitting decrease order"
        );

        let (intent_id, tx_hash) = self.submit_order(&order, index_price).await?;

        if closes_fully {
            self.engine
                .position_book()
                .write()
                .await
                .mark_closed(req.market, req.collateral_token, req.side);
        }

        Ok(SubmittedOrder {
            intent_id,
            tx_hash,
            acceptable_price: order.acceptable_price,
            position: None,
        })
    }

    /// Record an intent, send the order multicall and resolve the intent from the receipt
    async fn submit_order(
        &self,
        order: &ScaledOrder,
        index_price: U256,
    ) -> Result<(IntentId, TxHash), TxError> {
        let config = self.config();
        let intent_id = self.engine.intents().write().await.record(NewIntent {
            kind: order.kind,
            side: order.side,
            market: order.market,
            size_usd: order.size_delta_usd,
            requested_price: index_price,
            acceptable_price: order.acceptable_price,
        });

        let tx = multicall_request(
            config.contracts.exchange_router,
            order_calls(order, self.address(), &config.contracts),
            order.execution_fee,
        );

        match self.send_and_confirm(tx, Some(intent_id)).await {
            Ok(tx_hash) => {
                self.engine
                    .intents()
                    .write()
                    .await
                    .mark_executed(intent_id, tx_hash);
                Ok((intent_id, tx_hash))
            }
            Err(err) => {
                let tx_hash = match &err {
                    TxError::Reverted { tx_hash, .. } => Some(*tx_hash),
                    _ => None,
                };
                self.engine
                    .intents()
                    .write()
                    .await
                    .mark_failed(intent_id, tx_hash, err.user_message());
                Err(err)
            }
        }
    }

    /// Send, wait for the receipt and decode the revert reason of a failed transaction
    async fn send_and_confirm(&self, tx: TxRequest, intent: Option<IntentId>) -> Result<TxHash, TxError> {
        let replay = tx.clone();
        let tx_hash = self.signer.sign_and_send(tx).await.map_err(|e| {
            let err = classify_submission_error(&e);
            tracing::warn!(?intent, "Submission failed: {e:#}");
            err
        })?;

        if let Some(id) = intent {
            self.engine.intents().write().await.set_tx_hash(id, tx_hash);
        }
        tracing::info!(%tx_hash, url = %self.config().tx_url(tx_hash), "Transaction submitted");

        let receipt = self
            .signer
            .wait_for_receipt(tx_hash)
            .await
            .map_err(|e| TxError::Submission(format!("{e:#}")))?;
        if receipt.succeeded {
            return Ok(tx_hash);
        }

        let reason = match receipt.block_number {
            Some(block) => match self.reader().revert_data(self.address(), &replay, block).await {
                Ok(data) => data.and_then(|d| decode_revert_reason(&d)),
                Err(e) => {
                    tracing::debug!(%tx_hash, "Could not replay reverted transaction: {e:#}");
                    None
                }
            },
            None => None,
        };
        tracing::warn!(%tx_hash, reason = ?reason, "Transaction reverted");
        Err(TxError::Reverted { tx_hash, reason })
    }

    // ========== Liquidity Operations ==========

    /// Deposit a market's long or short token for GM tokens
    pub async fn create_deposit(&self, req: DepositRequest) -> Result<TxHash, TxError> {
        let config = self.config();
        let account = self.address();

        let (market, decimals, symbol) = {
            let registry = self.engine.registry().read().await;
            let market = registry.market(req.market)?.clone();
            if !market.accepts_collateral(req.token) {
                return Err(TxError::UnknownToken(req.token));
            }
            (
                market,
                registry.decimals(req.token)?,
                registry.token_symbol(req.token).to_string(),
            )
        };
        let amount = parse_amount(&req.amount, decimals)?;

        self.check_funds(req.token, &symbol, amount).await?;
        validation::ensure_allowance(
            self.reader(),
            req.token,
            account,
            config.contracts.router,
            amount,
        )
        .await?;

        let calls = deposit_calls(
            &market,
            req.token,
            amount,
            config.min_execution_fee,
            account,
            &config.contracts,
        );
        tracing::info!(market = %market.market_token, token = %symbol, amount = %req.amount, "Submitting deposit");
        let tx = multicall_request(config.contracts.exchange_router, calls, config.min_execution_fee);
        self.send_and_confirm(tx, None).await
    }

    /// Burn GM tokens for the pool's long and short tokens.
    ///
    /// The fee, the GM transfer and `createWithdrawal` are one multicall.
    pub async fn create_withdrawal(&self, req: WithdrawalRequest) -> Result<TxHash, TxError> {
        let config = self.config();
        let account = self.address();

        let (decimals, symbol) = {
            let registry = self.engine.registry().read().await;
            registry.market(req.market)?;
            (
                registry.decimals(req.market)?,
                registry.token_symbol(req.market).to_string(),
            )
        };
        let amount = parse_amount(&req.amount, decimals)?;

        self.check_funds(req.market, &symbol, amount).await?;
        validation::ensure_allowance(
            self.reader(),
            req.market,
            account,
            config.contracts.router,
            amount,
        )
        .await?;

        let calls = withdrawal_calls(
            req.market,
            amount,
            config.min_execution_fee,
            account,
            &config.contracts,
        );
        tracing::info!(market = %req.market, amount = %req.amount, "Submitting withdrawal");
        let tx = multicall_request(config.contracts.exchange_router, calls, config.min_execution_fee);
        self.send_and_confirm(tx, None).await
    }

    /// Signer's share of a market's pool
    pub async fn liquidity_position(&self, market: Address) -> Result<LiquidityPosition> {
        let (pool_value_usd, decimals) = {
            let registry = self.engine.registry().read().await;
            let pool = registry.market(market)?.pool_value_usd;
            (pool, registry.decimals(market)?)
        };

        let reader = self.reader();
        let (balance, supply) = tokio::join!(
            reader.balance_of(market, self.address()),
            reader.total_supply(market),
        );
        let balance = balance.context("Failed to read GM balance")?;
        let supply = supply.context("Failed to read GM supply")?;

        Ok(LiquidityPosition::compute(
            market,
            balance,
            supply,
            decimals,
            pool_value_usd,
        ))
    }

    /// Token balance and execution-fee checks shared by deposits and withdrawals
    async fn check_funds(&self, token: Address, symbol: &str, amount: U256) -> Result<(), TxError> {
        if amount.is_zero() {
            return Err(ValidationError::InvalidAmount.into());
        }
        let reader = self.reader();
        let account = self.address();
        let (balance, native) = tokio::join!(
            reader.balance_of(token, account),
            reader.native_balance(account),
        );
        if amount > balance.map_err(read_failure)? {
            return Err(ValidationError::InsufficientBalance {
                symbol: symbol.to_string(),
            }
            .into());
        }
        if native.map_err(read_failure)? < self.config().min_execution_fee {
            return Err(ValidationError::InsufficientGas.into());
        }
        Ok(())
    }
}

/// User-entered amount at `decimals`; anything unparseable is an invalid amount
fn parse_amount(value: &str, decimals: u8) -> Result<U256, TxError> {
    parse_units(value, decimals).map_err(|_| ValidationError::InvalidAmount.into())
}

fn read_failure(err: eyre::Report) -> TxError {
    TxError::Submission(format!("{err:#}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{price_from_f64, price_to_f64};
    use crate::contracts::IExchangeRouter;
    use crate::order::{AcceptablePricePolicy, IntentStatus};
    use crate::price::{price_store, PriceSnapshot, PriceWriter};
    use crate::testing::{raw_position, units, usd, MockChain, MockSigner, ETH, GM, TRADER, USDC};
    use crate::types::Side;
    use alloy::sol_types::{Revert, SolCall, SolError};
    use std::collections::HashMap;

    struct Harness {
        chain: Arc<MockChain>,
        client: GmxClient<MockSigner, MockChain>,
        _writer: PriceWriter,
    }

    async fn harness() -> Harness {
        let chain = Arc::new(MockChain::standard());
        let (writer, reader) = price_store();
        let mut prices = HashMap::new();
        prices.insert(ETH, price_from_f64(2850.0, 18));
        prices.insert(USDC, price_from_f64(1.0, 6));
        writer.publish(PriceSnapshot::new(prices));

        let signer = MockSigner::new().with_chain(chain.clone());
        let client = GmxClient::with_reader(signer, chain.clone(), NetworkConfig::new(), reader);
        client.engine().refresh_markets().await.unwrap();
        Harness {
            chain,
            client,
            _writer: writer,
        }
    }

    async fn approve_usdc(h: &Harness) {
        h.client
            .approve_collateral(USDC, units(1000, 6))
            .await
            .unwrap();
    }

    fn open_long() -> IncreaseOrderRequest {
        IncreaseOrderRequest::market(GM, USDC, Side::Long, "1000", "5000")
    }

    #[tokio::test]
    async fn test_open_long_scenario() {
        let h = harness().await;
        approve_usdc(&h).await;

        let submitted = h.client.submit_increase_order(open_long()).await.unwrap();
        assert!(submitted.acceptable_price >= price_from_f64(2850.0, 18));
        assert!((price_to_f64(submitted.acceptable_price, 18) - 2878.5).abs() < 1e-9);

        let position = submitted.position.unwrap();
        assert!((position.entry_price - 2850.0).abs() < 1e-6);
        assert!((position.leverage - 5.0).abs() < 1e-9);
        assert!((position.liquidation_price - 2337.0).abs() < 1e-6);

        let intent = h.client.engine().intent_list().await.remove(0);
        assert_eq!(intent.status, IntentStatus::Executed);
        assert_eq!(intent.tx_hash, Some(submitted.tx_hash));

        // Approval plus one multicall carrying the execution fee
        let sent = h.client.signer.sent();
        assert_eq!(sent.len(), 2);
        let order_tx = &sent[1];
        assert_eq!(order_tx.to, h.client.config().contracts.exchange_router);
        assert_eq!(order_tx.value, h.client.config().min_execution_fee);
        let calls = IExchangeRouter::multicallCall::abi_decode(&order_tx.data)
            .unwrap()
            .data;
        assert_eq!(calls.len(), 3);
    }

    #[tokio::test]
    async fn test_open_long_permissive() {
        let h = harness().await;
        approve_usdc(&h).await;

        let submitted = h
            .client
            .submit_increase_order(open_long().permissive())
            .await
            .unwrap();
        assert_eq!(submitted.acceptable_price, U256::MAX);
    }

    #[tokio::test]
    async fn test_optimistic_collapses_into_confirmed() {
        let h = harness().await;
        approve_usdc(&h).await;
        h.client.submit_increase_order(open_long()).await.unwrap();

        let view = h.client.engine().positions().await;
        assert_eq!(view.len(), 1);
        assert!(view[0].is_optimistic());

        // Keeper executes the order
        h.chain.set_positions(vec![raw_position(
            GM,
            USDC,
            true,
            usd(5000),
            units(5000, 18) / U256::from(2850u64),
            units(1000, 6),
        )]);
        h.client.engine().refresh_positions().await.unwrap();

        let view = h.client.engine().positions().await;
        assert_eq!(view.len(), 1);
        assert!(!view[0].is_optimistic());
        assert!(h.client.engine().position_book().read().await.optimistic().is_empty());
    }

    #[tokio::test]
    async fn test_approval_required_blocks_submission() {
        let h = harness().await;
        let err = h.client.submit_increase_order(open_long()).await.unwrap_err();
        assert!(matches!(err, TxError::ApprovalRequired { .. }));
        assert!(err.is_preflight());
        assert!(h.client.signer.sent().is_empty());
        assert!(h.client.engine().intent_list().await.is_empty());
    }

    #[tokio::test]
    async fn test_leverage_out_of_range_rejected() {
        let h = harness().await;
        approve_usdc(&h).await;
        let req = IncreaseOrderRequest::market(GM, USDC, Side::Long, "1000", "60000");
        let err = h.client.submit_increase_order(req).await.unwrap_err();
        assert!(matches!(
            err,
            TxError::Validation(ValidationError::LeverageOutOfRange { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_amount_rejected() {
        let h = harness().await;
        let req = IncreaseOrderRequest::market(GM, USDC, Side::Long, "abc", "5000");
        let err = h.client.submit_increase_order(req).await.unwrap_err();
        assert_eq!(err.user_message(), "Amount must be greater than 0");
    }

    #[tokio::test]
    async fn test_cancelled_signature_marks_intent_failed() {
        let h = harness().await;
        approve_usdc(&h).await;
        h.client.signer.fail_sends_with("User denied transaction signature");

        let err = h.client.submit_increase_order(open_long()).await.unwrap_err();
        assert!(matches!(err, TxError::Cancelled));
        let intent = h.client.engine().intent_list().await.remove(0);
        assert_eq!(intent.status, IntentStatus::Failed);
        assert!(h.client.engine().positions().await.is_empty());
    }

    #[tokio::test]
    async fn test_revert_reason_decoded() {
        let h = harness().await;
        approve_usdc(&h).await;
        h.client.signer.revert_receipts();
        h.chain.set_revert_data(Some(
            Revert::from("InsufficientExecutionFee").abi_encode().into(),
        ));

        let err = h.client.submit_increase_order(open_long()).await.unwrap_err();
        match err {
            TxError::Reverted { reason, .. } => {
                assert_eq!(reason.as_deref(), Some("InsufficientExecutionFee"))
            }
            other => panic!("unexpected {other:?}"),
        }
        let intent = h.client.engine().intent_list().await.remove(0);
        assert_eq!(intent.status, IntentStatus::Failed);
        assert_eq!(
            intent.failure.as_deref(),
            Some("Transaction reverted: InsufficientExecutionFee")
        );
    }

    #[tokio::test]
    async fn test_close_removes_position_pessimistically() {
        let h = harness().await;
        h.chain.set_positions(vec![raw_position(
            GM,
            USDC,
            true,
            usd(5000),
            units(2, 18),
            units(1000, 6),
        )]);
        h.client.engine().refresh_positions().await.unwrap();
        let position = h.client.engine().positions().await.remove(0);

        let req = DecreaseOrderRequest::close(&position);
        let submitted = h.client.submit_decrease_order(req).await.unwrap();
        // Closing a long sells: floor below the current price
        assert!(submitted.acceptable_price <= price_from_f64(2850.0, 18));
        assert!(h.client.engine().positions().await.is_empty());

        let sent = h.client.signer.sent();
        let calls = IExchangeRouter::multicallCall::abi_decode(&sent[0].data)
            .unwrap()
            .data;
        assert_eq!(calls.len(), 2);
    }

    #[tokio::test]
    async fn test_partial_close_keeps_position() {
        let h = harness().await;
        h.chain.set_positions(vec![raw_position(
            GM,
            USDC,
            false,
            usd(5000),
            units(2, 18),
            units(1000, 6),
        )]);
        h.client.engine().refresh_positions().await.unwrap();

        let req = DecreaseOrderRequest::market(GM, USDC, Side::Short, "1000")
            .with_policy(AcceptablePricePolicy::Permissive);
        let submitted = h.client.submit_decrease_order(req).await.unwrap();
        // Closing a short buys back: permissive ceiling
        assert_eq!(submitted.acceptable_price, U256::MAX);
        assert_eq!(h.client.engine().positions().await.len(), 1);
    }

    #[tokio::test]
    async fn test_stale_price_blocks_order() {
        let chain = Arc::new(MockChain::standard());
        let (_writer, reader) = price_store();
        let client = GmxClient::with_reader(
            MockSigner::new(),
            chain.clone(),
            NetworkConfig::new(),
            reader,
        );
        client.engine().refresh_markets().await.unwrap();

        let err = client.submit_increase_order(open_long()).await.unwrap_err();
        assert!(matches!(err, TxError::MissingPrice(_)));
    }

    #[tokio::test]
    async fn test_deposit_and_withdrawal() {
        let h = harness().await;
        approve_usdc(&h).await;
        h.client
            .create_deposit(DepositRequest::new(GM, USDC, "250"))
            .await
            .unwrap();

        // Withdrawing GM needs a balance and an approval of the GM token
        let err = h
            .client
            .create_withdrawal(WithdrawalRequest::new(GM, "3"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TxError::Validation(ValidationError::InsufficientBalance { .. })
        ));

        h.chain.set_balance(GM, TRADER, units(25, 18));
        h.client.approve_collateral(GM, units(3, 18)).await.unwrap();
        h.client
            .create_withdrawal(WithdrawalRequest::new(GM, "3"))
            .await
            .unwrap();

        let sent = h.client.signer.sent();
        let withdrawal = sent.last().unwrap();
        let calls = IExchangeRouter::multicallCall::abi_decode(&withdrawal.data)
            .unwrap()
            .data;
        let send = IExchangeRouter::sendTokensCall::abi_decode(&calls[1]).unwrap();
        assert_eq!(send.amount, units(3, 18));

        let share = h.client.liquidity_position(GM).await.unwrap();
        assert!((share.share_pct - 2.5).abs() < 1e-9);
    }
}
