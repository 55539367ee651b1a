//! ERC20 allowance checks and unlimited approvals

use crate::chain::ChainReader;
use crate::contracts::IERC20;
use crate::error::{classify_submission_error, TxError};
use crate::signer::{TransactionSigner, TxRequest};
use alloy::primitives::{Address, TxHash, U256};
use alloy::sol_types::SolCall;
use eyre::{Context, Result};

/// Allowance of one (token, spender) pair against an amount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalState {
    pub token: Address,
    pub spender: Address,
    pub allowance: U256,
    pub required_amount: U256,
}

impl ApprovalState {
    pub fn is_approved(&self) -> bool {
        self.allowance >= self.required_amount
    }
}

/// Read `owner`'s allowance for `spender`
pub async fn check_approval<R: ChainReader>(
    reader: &R,
    token: Address,
    owner: Address,
    spender: Address,
    required_amount: U256,
) -> Result<ApprovalState> {
    let allowance = reader
        .allowance(token, owner, spender)
        .await
        .with_context(|| format!("Failed to read allowance of {} for {}", token, spender))?;

    Ok(ApprovalState {
        token,
        spender,
        allowance,
        required_amount,
    })
}

/// Submit an unlimited approval; returns once the transaction is broadcast
pub async fn approve<S: TransactionSigner>(
    signer: &S,
    token: Address,
    spender: Address,
) -> Result<TxHash, TxError> {
    let call = IERC20::approveCall {
        spender,
        amount: U256::MAX,
    };
    let tx = TxRequest::new(token, call.abi_encode());

    let tx_hash = signer
        .sign_and_send(tx)
        .await
        .map_err(|e| classify_submission_error(&e))?;
    tracing::info!(%token, %spender, %tx_hash, "Approval submitted");
    Ok(tx_hash)
}

/// Approve, wait for the receipt, then re-read the allowance
pub async fn approve_and_confirm<S: TransactionSigner, R: ChainReader>(
    signer: &S,
    reader: &R,
    token: Address,
    spender: Address,
    required_amount: U256,
) -> Result<ApprovalState, TxError> {
    let tx_hash = approve(signer, token, spender).await?;

    let receipt = signer
        .wait_for_receipt(tx_hash)
        .await
        .map_err(|e| TxError::Submission(format!("{e:#}")))?;
    if !receipt.succeeded {
        return Err(TxError::Reverted {
            tx_hash,
            reason: None,
        });
    }

    check_approval(reader, token, signer.address(), spender, required_amount)
        .await
        .map_err(|e| TxError::Submission(format!("{e:#}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{units, MockChain, MockSigner, TRADER, USDC};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_approval_cycle() {
        let chain = Arc::new(MockChain::standard());
        let signer = MockSigner::new().with_chain(chain.clone());
        let router = crate::config::Contracts::default().router;

        let state = check_approval(chain.as_ref(), USDC, TRADER, router, units(100, 6))
            .await
            .unwrap();
        assert_eq!(state.allowance, U256::ZERO);
        assert!(!state.is_approved());

        let state = approve_and_confirm(&signer, chain.as_ref(), USDC, router, units(100, 6))
            .await
            .unwrap();
        assert_eq!(state.allowance, U256::MAX);
        assert!(state.is_approved());
        assert!(ApprovalState {
            required_amount: U256::MAX,
            ..state
        }
        .is_approved());

        let sent = signer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, USDC);
    }

    #[tokio::test]
    async fn test_rejected_signature_is_cancellation() {
        let chain = MockChain::standard();
        let signer = MockSigner::new();
        signer.fail_sends_with("User rejected the request.");
        let router = crate::config::Contracts::default().router;

        let err = approve_and_confirm(&signer, &chain, USDC, router, units(100, 6))
            .await
            .unwrap_err();
        assert!(matches!(err, TxError::Cancelled));
    }

    #[tokio::test]
    async fn test_reverted_approval() {
        let chain = MockChain::standard();
        let signer = MockSigner::new();
        signer.revert_receipts();
        let router = crate::config::Contracts::default().router;

        let err = approve_and_confirm(&signer, &chain, USDC, router, units(100, 6))
            .await
            .unwrap_err();
        assert!(matches!(err, TxError::Reverted { .. }));
    }
}
