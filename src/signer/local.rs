//! Private-key signer over a wallet-filled JSON-RPC provider

use super::{TransactionSigner, TxReceipt, TxRequest};
use crate::config::NetworkConfig;
use alloy::network::{Ethereum, EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use eyre::{ensure, Context, Result};
use std::sync::Arc;
use std::time::Duration;

/// Headroom added to `eth_estimateGas`, in percent
const GAS_BUFFER_PCT: u64 = 20;

/// Signs locally with a raw EVM private key
pub struct LocalSigner {
    /// Fills nonce, fees and chain id, then signs
    provider: Arc<dyn Provider<Ethereum>>,
    address: Address,
    receipt_poll_interval: Duration,
    receipt_timeout: Duration,
}

impl LocalSigner {
    /// Build from a hex private key (`0x` optional) and an RPC URL
    pub async fn from_private_key(
        private_key: impl AsRef<str>,
        rpc_url: impl AsRef<str>,
    ) -> Result<Self> {
        let key = private_key.as_ref().trim();
        let signer: PrivateKeySigner = key
            .strip_prefix("0x")
            .unwrap_or(key)
            .parse()
            .context("Failed to parse private key")?;
        let address = signer.address();

        let url: Url = rpc_url.as_ref().parse().context("Invalid RPC URL")?;
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(url);

        Ok(Self {
            provider: Arc::new(provider),
            address,
            receipt_poll_interval: Duration::from_secs(1),
            receipt_timeout: Duration::from_secs(120),
        })
    }

    /// Build against `config.rpc_url`, refusing an RPC that serves a different chain
    pub async fn from_config(private_key: impl AsRef<str>, config: &NetworkConfig) -> Result<Self> {
        let signer = Self::from_private_key(private_key, &config.rpc_url).await?;
        let chain_id = signer
            .provider
            .get_chain_id()
            .await
            .context("Failed to read chain id")?;
        ensure!(
            chain_id == config.chain_id,
            "RPC serves chain {} but the config expects {}",
            chain_id,
            config.chain_id
        );
        Ok(signer)
    }

    /// Override how long to wait for a receipt
    pub fn with_receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    async fn poll_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt> {
        let mut ticker = tokio::time::interval(self.receipt_poll_interval);
        loop {
            ticker.tick().await;
            let receipt = self
                .provider
                .get_transaction_receipt(tx_hash)
                .await
                .context("Failed to get transaction receipt")?;
            if let Some(receipt) = receipt {
                return Ok(TxReceipt::from(&receipt));
            }
        }
    }
}

impl TransactionSigner for LocalSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_and_send(&self, tx: TxRequest) -> Result<TxHash> {
        let mut request = TransactionRequest::default()
            .with_from(self.address)
            .with_to(tx.to)
            .with_value(tx.value)
            .with_input(tx.data);

        // Estimate plus headroom unless the caller pinned a limit
        let gas_limit = match tx.gas_limit {
            Some(limit) => limit,
            None => {
                let estimate = self
                    .provider
                    .estimate_gas(request.clone())
                    .await
                    .context("Failed to estimate gas")?;
                estimate.saturating_add(estimate * GAS_BUFFER_PCT / 100)
            }
        };
        request = request.with_gas_limit(gas_limit);

        let pending = self
            .provider
            .send_transaction(request)
            .await
            .context("Failed to send transaction")?;
        tracing::debug!(tx_hash = %pending.tx_hash(), gas_limit, "Transaction broadcast");
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt> {
        tokio::time::timeout(self.receipt_timeout, self.poll_receipt(tx_hash))
            .await
            .map_err(|_| eyre::eyre!("No receipt for {} after {:?}", tx_hash, self.receipt_timeout))?
    }

    async fn get_balance(&self) -> Result<U256> {
        self.provider
            .get_balance(self.address)
            .await
            .context("Failed to get balance")
    }
}
