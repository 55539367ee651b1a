//! Transaction signer abstraction for the GMX SDK
//!
//! Order, approval and liquidity submission only ever needs "send this calldata and tell me
//! what happened", so signing is hidden behind [`TransactionSigner`].

mod local;

pub use local::LocalSigner;

use alloy::network::ReceiptResponse;
use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::rpc::types::TransactionReceipt;
use eyre::Result;

/// A contract call to sign and broadcast
#[derive(Debug, Clone, PartialEq)]
pub struct TxRequest {
    pub to: Address,
    /// Native value attached, e.g. the keeper execution fee
    pub value: U256,
    pub data: Bytes,
    /// Skips gas estimation when set
    pub gas_limit: Option<u64>,
}

impl TxRequest {
    /// Zero-value call of `data` on `to`
    pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            value: U256::ZERO,
            data: data.into(),
            gas_limit: None,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Pin the gas limit
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }
}

/// The parts of a receipt the SDK acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    /// False when the transaction reverted
    pub succeeded: bool,
    pub block_number: Option<u64>,
    pub gas_used: u64,
}

impl From<&TransactionReceipt> for TxReceipt {
    fn from(receipt: &TransactionReceipt) -> Self {
        Self {
            tx_hash: receipt.transaction_hash(),
            succeeded: receipt.status(),
            block_number: receipt.block_number(),
            gas_used: receipt.gas_used(),
        }
    }
}

/// Signs and broadcasts transactions for one account
pub trait TransactionSigner: Send + Sync {
    fn address(&self) -> Address;

    /// Broadcast `tx`; a user rejection surfaces as an error mentioning "user rejected"
    fn sign_and_send(
        &self,
        tx: TxRequest,
    ) -> impl std::future::Future<Output = Result<TxHash>> + Send;

    /// Wait until `tx_hash` is mined
    fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
    ) -> impl std::future::Future<Output = Result<TxReceipt>> + Send;

    /// Native balance, used to cover execution fees
    fn get_balance(&self) -> impl std::future::Future<Output = Result<U256>> + Send;
}
