//! Indexer client for trade and liquidity history

use crate::constants::{price_to_f64, usd_to_f64};
use crate::registry::address_key;
use crate::types::Side;
use alloy::primitives::{Address, I256, U256};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Trade events shown in history
const TRADE_EVENTS: [&str; 2] = ["OrderExecuted", "OrderCancelled"];

/// Upper bound the indexer returns for the count query
const COUNT_LIMIT: u32 = 1000;

/// An executed or cancelled order
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeAction {
    pub id: String,
    pub event_name: String,
    pub order_key: String,
    pub order_type: serde_json::Value,
    pub account: String,
    pub market_address: Option<String>,
    pub initial_collateral_token_address: String,
    pub size_delta_usd: Option<String>,
    pub execution_price: Option<String>,
    pub trigger_price: Option<String>,
    pub acceptable_price: Option<String>,
    pub price_impact_usd: Option<String>,
    pub pnl_usd: Option<String>,
    pub base_pnl_usd: Option<String>,
    pub position_fee_amount: Option<String>,
    pub borrowing_fee_amount: Option<String>,
    pub funding_fee_amount: Option<String>,
    pub is_long: Option<bool>,
    pub timestamp: i64,
    pub transaction: TransactionRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionRef {
    pub hash: String,
}

impl TradeAction {
    pub fn side(&self) -> Option<Side> {
        self.is_long.map(Side::from_is_long)
    }

    pub fn is_executed(&self) -> bool {
        self.event_name == "OrderExecuted"
    }

    /// Size delta in USD
    pub fn size_delta_usd_f64(&self) -> Option<f64> {
        parse_u256(self.size_delta_usd.as_deref()).map(usd_to_f64)
    }

    /// Execution price in USD per whole index token
    pub fn execution_price_f64(&self, index_decimals: u8) -> Option<f64> {
        parse_u256(self.execution_price.as_deref()).map(|p| price_to_f64(p, index_decimals))
    }

    /// Realized PnL in USD
    pub fn pnl_usd_f64(&self) -> Option<f64> {
        signed_usd(self.pnl_usd.as_deref())
    }
}

/// One page of trade history
#[derive(Debug, Clone)]
pub struct TradeHistoryPage {
    pub trades: Vec<TradeAction>,
    pub total: u32,
    pub total_pages: u32,
    pub has_next_page: bool,
}

/// A change of an account's GM token balance
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityChange {
    pub id: String,
    pub timestamp: i64,
    pub tokens_balance: String,
    pub cumulative_income: String,
    pub market_address: String,
    /// Balance difference to the next older change; filled in by the client
    #[serde(skip)]
    pub change_amount: I256,
}

/// Balance changes, newest first, and the latest cumulative income
#[derive(Debug, Clone, Default)]
pub struct LiquidityHistory {
    pub changes: Vec<LiquidityChange>,
    /// 30-decimal USD income of the latest change
    pub income_usd: f64,
}

#[derive(Serialize)]
struct GraphQLRequest {
    query: &'static str,
    variables: serde_json::Value,
}

#[derive(Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Deserialize, Debug)]
struct GraphQLError {
    message: String,
}

#[derive(Deserialize)]
struct TradeActionsData {
    #[serde(rename = "TradeAction", default)]
    trade_actions: Vec<TradeAction>,
}

#[derive(Deserialize)]
struct TradeIdsData {
    #[serde(rename = "TradeAction", default)]
    trade_actions: Vec<IdOnly>,
}

#[derive(Deserialize)]
struct IdOnly {
    #[allow(dead_code)]
    id: String,
}

#[derive(Deserialize)]
struct LiquidityData {
    #[serde(rename = "UserGmTokensBalanceChange", default)]
    changes: Vec<LiquidityChange>,
}

const TRADE_HISTORY_QUERY: &str = r#"
    query GetTradeHistory($account: String!, $events: [String!]!, $limit: Int!, $skip: Int!) {
        TradeAction(
            where: { account: { _ilike: $account }, eventName: { _in: $events } }
            order_by: { timestamp: desc }
            limit: $limit
            offset: $skip
        ) {
            id
            eventName
            orderKey
            orderType
            account
            marketAddress
            initialCollateralTokenAddress
            sizeDeltaUsd
            executionPrice
            triggerPrice
            acceptablePrice
            priceImpactUsd
            pnlUsd
            basePnlUsd
            positionFeeAmount
            borrowingFeeAmount
            fundingFeeAmount
            isLong
            timestamp
            transaction {
                hash
            }
        }
    }
"#;

const TRADE_COUNT_QUERY: &str = r#"
    query GetTradeCount($account: String!, $events: [String!]!, $limit: Int!) {
        TradeAction(
            where: { account: { _ilike: $account }, eventName: { _in: $events } }
            limit: $limit
        ) {
            id
        }
    }
"#;

const LIQUIDITY_HISTORY_QUERY: &str = r#"
    query GetLiquidityHistory($account: String!) {
        UserGmTokensBalanceChange(
            where: { account: { _ilike: $account } }
            order_by: { timestamp: desc }
        ) {
            id
            timestamp
            tokensBalance
            cumulativeIncome
            marketAddress
        }
    }
"#;

/// GraphQL client for the indexer
#[derive(Debug, Clone)]
pub struct SubgraphClient {
    url: String,
    client: reqwest::Client,
}

impl SubgraphClient {
    /// Client for `{base_url}/v1/graphql`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("GmxRustSDK/0.1.0")
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .use_rustls_tls()
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            url: format!("{}/v1/graphql", base_url.trim_end_matches('/')),
            client,
        })
    }

    /// Executed and cancelled orders of `account`, newest first; `page` starts at 1
    pub async fn trade_history(
        &self,
        account: Address,
        page: u32,
        limit: u32,
    ) -> Result<Vec<TradeAction>> {
        let skip = page.saturating_sub(1).saturating_mul(limit);
        let data: TradeActionsData = self
            .query(
                TRADE_HISTORY_QUERY,
                serde_json::json!({
                    "account": address_key(account),
                    "events": TRADE_EVENTS,
                    "limit": limit,
                    "skip": skip,
                }),
            )
            .await?;
        Ok(data.trade_actions)
    }

    /// Number of executed and cancelled orders (capped by the indexer at 1000)
    pub async fn trade_count(&self, account: Address) -> Result<u32> {
        let data: TradeIdsData = self
            .query(
                TRADE_COUNT_QUERY,
                serde_json::json!({
                    "account": address_key(account),
                    "events": TRADE_EVENTS,
                    "limit": COUNT_LIMIT,
                }),
            )
            .await?;
        Ok(data.trade_actions.len() as u32)
    }

    /// A page of history together with paging totals
    pub async fn trade_page(&self, account: Address, page: u32, limit: u32) -> Result<TradeHistoryPage> {
        let (trades, total) = tokio::try_join!(
            self.trade_history(account, page, limit),
            self.trade_count(account),
        )?;
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Ok(TradeHistoryPage {
            trades,
            total,
            total_pages,
            has_next_page: page < total_pages,
        })
    }

    /// GM balance changes of `account`, newest first
    pub async fn liquidity_history(&self, account: Address) -> Result<LiquidityHistory> {
        let data: LiquidityData = self
            .query(
                LIQUIDITY_HISTORY_QUERY,
                serde_json::json!({ "account": address_key(account) }),
            )
            .await?;
        Ok(build_liquidity_history(data.changes))
    }

    async fn query<T: for<'de> Deserialize<'de>>(
        &self,
        query: &'static str,
        variables: serde_json::Value,
    ) -> Result<T> {
        let request = GraphQLRequest { query, variables };

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to query subgraph")?;

        let result: GraphQLResponse<T> = response
            .json()
            .await
            .context("Failed to parse subgraph response")?;

        if let Some(errors) = result.errors {
            let error_msgs: Vec<_> = errors.iter().map(|e| e.message.clone()).collect();
            eyre::bail!("Subgraph errors: {:?}", error_msgs);
        }

        result
            .data
            .ok_or_else(|| eyre::eyre!("Subgraph response has no data"))
    }
}

/// Fill in each change against the next older one
fn build_liquidity_history(mut changes: Vec<LiquidityChange>) -> LiquidityHistory {
    let balances: Vec<I256> = changes
        .iter()
        .map(|c| I256::from_dec_str(c.tokens_balance.trim()).unwrap_or(I256::ZERO))
        .collect();
    for (i, change) in changes.iter_mut().enumerate() {
        let older = balances.get(i + 1).copied().unwrap_or(I256::ZERO);
        change.change_amount = balances[i].saturating_sub(older);
    }

    let income_usd = changes
        .first()
        .and_then(|latest| signed_usd(Some(&latest.cumulative_income)))
        .unwrap_or(0.0);

    LiquidityHistory {
        changes,
        income_usd,
    }
}

fn parse_u256(value: Option<&str>) -> Option<U256> {
    value.and_then(|v| U256::from_str_radix(v.trim(), 10).ok())
}

/// Signed 30-decimal USD string as f64
fn signed_usd(value: Option<&str>) -> Option<f64> {
    let value = I256::from_dec_str(value?.trim()).ok()?;
    let magnitude = usd_to_f64(value.unsigned_abs());
    Some(if value.is_negative() { -magnitude } else { magnitude })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{serve_json, serve_json_capturing, TRADER};

    fn change(id: &str, balance: &str) -> LiquidityChange {
        LiquidityChange {
            id: id.into(),
            timestamp: 0,
            tokens_balance: balance.into(),
            cumulative_income: "0".into(),
            market_address: String::new(),
            change_amount: I256::ZERO,
        }
    }

    #[test]
    fn test_liquidity_changes_against_older_rows() {
        let history = build_liquidity_history(vec![
            change("c", "150"),
            change("b", "200"),
            change("a", "120"),
        ]);
        let amounts: Vec<String> = history
            .changes
            .iter()
            .map(|c| c.change_amount.to_string())
            .collect();
        assert_eq!(amounts, vec!["-50", "80", "120"]);
    }

    #[test]
    fn test_signed_usd() {
        let minus_twelve = format!("-12{}", "0".repeat(30));
        assert_eq!(signed_usd(Some(&minus_twelve)), Some(-12.0));
        assert_eq!(signed_usd(Some("oops")), None);
        assert_eq!(signed_usd(None), None);
    }

    fn trade_json(id: u32) -> String {
        format!(
            r#"{{
            "id": "{id}", "eventName": "OrderExecuted", "orderKey": "0x01", "orderType": "2",
            "account": "0x000000000000000000000000000000000000beef",
            "marketAddress": null, "initialCollateralTokenAddress": "0x00",
            "sizeDeltaUsd": "5000000000000000000000000000000000", "executionPrice": null,
            "triggerPrice": null, "acceptablePrice": null, "priceImpactUsd": null,
            "pnlUsd": null, "basePnlUsd": null, "positionFeeAmount": null,
            "borrowingFeeAmount": null, "fundingFeeAmount": null, "isLong": true,
            "timestamp": 1700000000, "transaction": {{"hash": "0xabc"}}
        }}"#
        )
    }

    fn trades_body(ids: &[u32]) -> String {
        let trades: Vec<String> = ids.iter().map(|id| trade_json(*id)).collect();
        format!(r#"{{"data": {{"TradeAction": [{}]}}}}"#, trades.join(","))
    }

    #[tokio::test]
    async fn test_trade_history_request() {
        let (url, requests) = serve_json_capturing(trades_body(&[1])).await;
        let client = SubgraphClient::new(&url, Duration::from_secs(2)).unwrap();

        let trades = client.trade_history(TRADER, 3, 10).await.unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].side(), Some(Side::Long));
        assert_eq!(trades[0].size_delta_usd_f64(), Some(5000.0));
        assert!(trades[0].is_executed());

        let request: serde_json::Value =
            serde_json::from_str(&requests.lock().unwrap()[0]).unwrap();
        assert_eq!(request["variables"]["skip"], 20);
        assert_eq!(
            request["variables"]["account"],
            "0x000000000000000000000000000000000000beef"
        );
    }

    #[tokio::test]
    async fn test_trade_page_totals() {
        // The fixture answers both the page and the count query with five trades
        let (url, requests) = serve_json_capturing(trades_body(&[1, 2, 3, 4, 5])).await;
        let client = SubgraphClient::new(&url, Duration::from_secs(2)).unwrap();

        let page = client.trade_page(TRADER, 2, 2).await.unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next_page);

        let last = client.trade_page(TRADER, 3, 2).await.unwrap();
        assert!(!last.has_next_page);

        let bodies: Vec<serde_json::Value> = requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| serde_json::from_str(r).unwrap())
            .collect();
        assert_eq!(bodies.len(), 4);
        assert!(bodies.iter().any(|b| b["variables"]["skip"] == 2));
        assert!(bodies.iter().any(|b| b["variables"]["limit"] == 1000));
    }

    #[tokio::test]
    async fn test_graphql_errors_surface() {
        let url = serve_json(r#"{"errors": [{"message": "field not found"}]}"#.into()).await;
        let client = SubgraphClient::new(&url, Duration::from_secs(2)).unwrap();
        let err = client.trade_count(TRADER).await.unwrap_err();
        assert!(err.to_string().contains("field not found"));
    }
}
