//! In-memory chain, signer and HTTP fixtures for unit tests

use crate::chain::ChainReader;
use crate::contracts::{
    MarketProps, OrderAddresses, OrderFlags, OrderInfo, OrderNumbers, OrderProps,
    PositionAddresses, PositionFlags, PositionNumbers, PositionProps, IERC20,
};
use crate::signer::{TransactionSigner, TxReceipt, TxRequest};
use alloy::primitives::{address, keccak256, Address, Bytes, TxHash, B256, U256};
use alloy::sol_types::SolCall;
use eyre::{bail, eyre, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Long collateral and index token (the default wrapped native token)
pub const ETH: Address = address!("0xd020d6D39b5550bdc3440Ff8f6EA5f1Cf745b13c");
/// Short collateral token (the default stable token)
pub const USDC: Address = address!("0xE0105CF6930e8767ADb5425ddc7f8B6df25699A6");
/// ETH-USD market token (the default market)
pub const GM: Address = address!("0x68dE251394Ccfda893Cc6796B68e5A8b6944F66e");
/// Swap-only market without an index token
pub const GM_SWAP: Address = address!("0x00000000000000000000000000000000000005a9");
pub const TRADER: Address = address!("0x000000000000000000000000000000000000beef");

pub fn units(whole: u64, decimals: u8) -> U256 {
    U256::from(whole) * U256::from(10u64).pow(U256::from(decimals))
}

pub fn usd(whole: u64) -> U256 {
    units(whole, 30)
}

#[derive(Default)]
struct ChainState {
    markets: Vec<MarketProps>,
    tokens: HashMap<Address, (String, u8)>,
    balances: HashMap<(Address, Address), U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
    supplies: HashMap<Address, U256>,
    native: HashMap<Address, U256>,
    positions: Vec<PositionProps>,
    orders: Vec<OrderInfo>,
    min_collateral: Option<U256>,
    fail_positions: bool,
    revert_data: Option<Bytes>,
}

/// [`ChainReader`] over mutable in-memory state
#[derive(Default)]
pub struct MockChain {
    state: Mutex<ChainState>,
    position_reads: AtomicU64,
}

impl MockChain {
    /// ETH-USD market backed by 10 ETH and 50,000 USDC, a swap-only pool, and a trader
    /// holding 1 ETH of gas and 10,000 USDC
    pub fn standard() -> Self {
        let chain = Self::default();
        {
            let mut state = chain.state.lock().unwrap();
            state.tokens.insert(ETH, ("ETH".into(), 18));
            state.tokens.insert(USDC, ("USDC".into(), 6));
            state.tokens.insert(GM, ("GM".into(), 18));
            state.tokens.insert(GM_SWAP, ("GM".into(), 18));
            state.balances.insert((ETH, GM), units(10, 18));
            state.balances.insert((USDC, GM), units(50_000, 6));
            state.balances.insert((USDC, TRADER), units(10_000, 6));
            state.supplies.insert(GM, units(1_000, 18));
            state.native.insert(TRADER, units(1, 18));
            state.min_collateral = Some(usd(10));
        }
        chain.add_market(GM, ETH, ETH, USDC);
        chain.add_market(GM_SWAP, Address::ZERO, ETH, USDC);
        chain
    }

    pub fn add_market(&self, market: Address, index: Address, long: Address, short: Address) {
        self.state.lock().unwrap().markets.push(MarketProps {
            marketToken: market,
            indexToken: index,
            longToken: long,
            shortToken: short,
        });
    }

    pub fn set_balance(&self, token: Address, owner: Address, amount: U256) {
        self.state
            .lock()
            .unwrap()
            .balances
            .insert((token, owner), amount);
    }

    pub fn set_allowance(&self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.state
            .lock()
            .unwrap()
            .allowances
            .insert((token, owner, spender), amount);
    }

    pub fn set_native_balance(&self, account: Address, amount: U256) {
        self.state.lock().unwrap().native.insert(account, amount);
    }

    pub fn set_positions(&self, positions: Vec<PositionProps>) {
        self.state.lock().unwrap().positions = positions;
    }

    pub fn add_order(&self, order: OrderInfo) {
        self.state.lock().unwrap().orders.push(order);
    }

    /// `None` makes the DataStore read fail
    pub fn set_min_collateral(&self, value: Option<U256>) {
        self.state.lock().unwrap().min_collateral = value;
    }

    pub fn fail_position_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_positions = fail;
    }

    /// Payload returned when a mined transaction is replayed
    pub fn set_revert_data(&self, data: Option<Bytes>) {
        self.state.lock().unwrap().revert_data = data;
    }

    pub fn position_reads(&self) -> u64 {
        self.position_reads.load(Ordering::SeqCst)
    }
}

impl ChainReader for MockChain {
    async fn markets(&self, start: u64, end: u64) -> Result<Vec<MarketProps>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .markets
            .iter()
            .skip(start as usize)
            .take(end.saturating_sub(start) as usize)
            .cloned()
            .collect())
    }

    async fn market(&self, market: Address) -> Result<MarketProps> {
        let state = self.state.lock().unwrap();
        state
            .markets
            .iter()
            .find(|m| m.marketToken == market)
            .cloned()
            .ok_or_else(|| eyre!("execution reverted"))
    }

    async fn account_positions(
        &self,
        account: Address,
        start: u64,
        end: u64,
    ) -> Result<Vec<PositionProps>> {
        self.position_reads.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if state.fail_positions {
            bail!("connection refused");
        }
        Ok(state
            .positions
            .iter()
            .filter(|p| p.addresses.account == account)
            .skip(start as usize)
            .take(end.saturating_sub(start) as usize)
            .cloned()
            .collect())
    }

    async fn account_orders(
        &self,
        account: Address,
        start: u64,
        end: u64,
    ) -> Result<Vec<OrderInfo>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .orders
            .iter()
            .filter(|o| o.order.addresses.account == account)
            .skip(start as usize)
            .take(end.saturating_sub(start) as usize)
            .cloned()
            .collect())
    }

    async fn token_symbol(&self, token: Address) -> Result<String> {
        let state = self.state.lock().unwrap();
        state
            .tokens
            .get(&token)
            .map(|(symbol, _)| symbol.clone())
            .ok_or_else(|| eyre!("execution reverted"))
    }

    async fn token_decimals(&self, token: Address) -> Result<u8> {
        let state = self.state.lock().unwrap();
        state
            .tokens
            .get(&token)
            .map(|(_, decimals)| *decimals)
            .ok_or_else(|| eyre!("execution reverted"))
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256> {
        let state = self.state.lock().unwrap();
        Ok(state
            .balances
            .get(&(token, owner))
            .copied()
            .unwrap_or_default())
    }

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        let state = self.state.lock().unwrap();
        Ok(state
            .allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default())
    }

    async fn total_supply(&self, token: Address) -> Result<U256> {
        let state = self.state.lock().unwrap();
        Ok(state.supplies.get(&token).copied().unwrap_or_default())
    }

    async fn min_collateral_usd(&self) -> Result<U256> {
        let state = self.state.lock().unwrap();
        state
            .min_collateral
            .ok_or_else(|| eyre!("DataStore unavailable"))
    }

    async fn native_balance(&self, account: Address) -> Result<U256> {
        let state = self.state.lock().unwrap();
        Ok(state.native.get(&account).copied().unwrap_or_default())
    }

    async fn revert_data(
        &self,
        _from: Address,
        _tx: &TxRequest,
        _block: u64,
    ) -> Result<Option<Bytes>> {
        Ok(self.state.lock().unwrap().revert_data.clone())
    }
}

/// Raw position as the Reader would return it
pub fn raw_position(
    market: Address,
    collateral_token: Address,
    is_long: bool,
    size_usd: U256,
    size_in_tokens: U256,
    collateral_amount: U256,
) -> PositionProps {
    PositionProps {
        addresses: PositionAddresses {
            account: TRADER,
            market,
            collateralToken: collateral_token,
        },
        numbers: PositionNumbers {
            sizeInUsd: size_usd,
            sizeInTokens: size_in_tokens,
            collateralAmount: collateral_amount,
            ..Default::default()
        },
        flags: PositionFlags { isLong: is_long },
    }
}

/// Order waiting for a keeper, owned by [`TRADER`]
pub fn raw_order(key: u8, market: Address, order_type: u8, is_long: bool, size_usd: U256) -> OrderInfo {
    OrderInfo {
        orderKey: B256::repeat_byte(key),
        order: OrderProps {
            addresses: OrderAddresses {
                account: TRADER,
                market,
                initialCollateralToken: USDC,
                ..Default::default()
            },
            numbers: OrderNumbers {
                orderType: order_type,
                sizeDeltaUsd: size_usd,
                ..Default::default()
            },
            flags: OrderFlags {
                isLong: is_long,
                ..Default::default()
            },
            dataList: vec![],
        },
    }
}

/// Records every transaction instead of sending it
pub struct MockSigner {
    address: Address,
    chain: Option<Arc<MockChain>>,
    sent: Mutex<Vec<TxRequest>>,
    send_error: Mutex<Option<String>>,
    receipt_success: AtomicBool,
    balance: U256,
    nonce: AtomicU64,
}

impl MockSigner {
    pub fn new() -> Self {
        Self {
            address: TRADER,
            chain: None,
            sent: Mutex::new(Vec::new()),
            send_error: Mutex::new(None),
            receipt_success: AtomicBool::new(true),
            balance: units(1, 18),
            nonce: AtomicU64::new(0),
        }
    }

    /// Apply ERC20 approvals to `chain` when they are sent
    pub fn with_chain(mut self, chain: Arc<MockChain>) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Make every send fail with `message`
    pub fn fail_sends_with(&self, message: &str) {
        *self.send_error.lock().unwrap() = Some(message.to_string());
    }

    /// Receipts report a revert
    pub fn revert_receipts(&self) {
        self.receipt_success.store(false, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<TxRequest> {
        self.sent.lock().unwrap().clone()
    }
}

impl TransactionSigner for MockSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_and_send(&self, tx: TxRequest) -> Result<TxHash> {
        if let Some(message) = self.send_error.lock().unwrap().clone() {
            bail!(message);
        }
        if let (Some(chain), Ok(approve)) =
            (&self.chain, IERC20::approveCall::abi_decode(&tx.data))
        {
            chain.set_allowance(tx.to, self.address, approve.spender, approve.amount);
        }
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().unwrap().push(tx);
        Ok(keccak256(nonce.to_be_bytes()))
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt> {
        Ok(TxReceipt {
            tx_hash,
            succeeded: self.receipt_success.load(Ordering::SeqCst),
            block_number: Some(100),
            gas_used: 250_000,
        })
    }

    async fn get_balance(&self) -> Result<U256> {
        Ok(self.balance)
    }
}

/// Serve `body` as JSON to every request; returns the base URL
pub async fn serve_json(body: String) -> String {
    serve_json_capturing(body).await.0
}

/// Like [`serve_json`], also recording each request body
pub async fn serve_json_capturing(body: String) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let requests = Arc::new(Mutex::new(Vec::new()));
    let captured = requests.clone();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let body = body.clone();
            let captured = captured.clone();
            tokio::spawn(async move {
                let request = read_request(&mut socket).await;
                captured.lock().unwrap().push(request);
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (url, requests)
}

/// Read headers plus a `Content-Length` body; returns the body
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let Ok(n) = socket.read(&mut chunk).await else {
            break;
        };
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf).to_string();
        if let Some(split) = text.find("\r\n\r\n") {
            let length = text[..split]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= split + 4 + length {
                return String::from_utf8_lossy(&buf[split + 4..split + 4 + length]).to_string();
            }
        }
    }
    String::new()
}
