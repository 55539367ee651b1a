//! Error types for the GMX SDK
//!
//! Plumbing (RPC, HTTP, ABI decoding) uses `eyre` for ergonomic error handling with context.
//! Anything that reaches a trader goes through [`TxError`], which maps every failure onto
//! one user-facing outcome.

use alloy::primitives::{Address, TxHash, U256};
use std::time::Duration;

pub use eyre::{eyre, Context, Report, Result};

/// Pre-flight validation failures, declared in display priority order
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Amount must be greater than 0")]
    InvalidAmount,
    #[error("Min collateral: ${min_usd:.0} (GMX requirement)")]
    BelowMinCollateral { min_usd: f64 },
    #[error("Insufficient {symbol} balance")]
    InsufficientBalance { symbol: String },
    #[error("Insufficient native balance for the execution fee")]
    InsufficientGas,
    #[error("Leverage must be between {min}x and {max}x")]
    LeverageOutOfRange { min: f64, max: f64 },
}

/// Outcome of a failed order, approval or liquidity action
#[derive(Debug, Clone, thiserror::Error)]
pub enum TxError {
    /// The wallet refused to sign; never retried
    #[error("Transaction cancelled")]
    Cancelled,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Approval required: allowance {allowance} < {required} for {token} -> {spender}")]
    ApprovalRequired {
        token: Address,
        spender: Address,
        required: U256,
        allowance: U256,
    },
    #[error("Insufficient funds for gas")]
    InsufficientGas,
    #[error("Price for {token} is {age:?} old")]
    StalePrice { token: Address, age: Duration },
    #[error("No price available for {0}")]
    MissingPrice(Address),
    #[error("Token {0} is not in the registry")]
    UnknownToken(Address),
    #[error("Market {0} is not in the registry")]
    UnknownMarket(Address),
    #[error("Transaction submission failed: {0}")]
    Submission(String),
    #[error("Transaction {tx_hash} reverted{}", revert_suffix(.reason))]
    Reverted {
        tx_hash: TxHash,
        reason: Option<String>,
    },
}

impl TxError {
    /// Short message suitable for a toast or log line shown to the trader
    pub fn user_message(&self) -> String {
        match self {
            Self::Cancelled => "Transaction cancelled".to_string(),
            Self::Validation(err) => err.to_string(),
            Self::ApprovalRequired { .. } => "Approval required before submitting".to_string(),
            Self::InsufficientGas => "Insufficient funds for gas".to_string(),
            Self::StalePrice { .. } | Self::MissingPrice(_) => {
                "Price feed unavailable, try again shortly".to_string()
            }
            Self::UnknownToken(_) | Self::UnknownMarket(_) => "Unknown market".to_string(),
            Self::Submission(_) => "Transaction failed".to_string(),
            Self::Reverted { reason: Some(reason), .. } => format!("Transaction reverted: {reason}"),
            Self::Reverted { reason: None, .. } => "Transaction reverted".to_string(),
        }
    }

    /// Whether the failure happened before anything touched the network
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::ApprovalRequired { .. }
                | Self::StalePrice { .. }
                | Self::MissingPrice(_)
                | Self::UnknownToken(_)
                | Self::UnknownMarket(_)
        )
    }
}

fn revert_suffix(reason: &Option<String>) -> String {
    reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default()
}

/// Translate a raw signer/RPC error into the user-facing taxonomy
pub fn classify_submission_error(err: &Report) -> TxError {
    let text = format!("{err:#}").to_lowercase();

    if text.contains("user rejected") || text.contains("user denied") {
        return TxError::Cancelled;
    }
    if text.contains("insufficient funds") {
        return TxError::InsufficientGas;
    }

    let revert_data = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<alloy::transports::TransportError>())
        .and_then(|rpc| rpc.as_error_resp())
        .and_then(|payload| payload.as_revert_data());

    if let Some(data) = revert_data {
        return TxError::Reverted {
            tx_hash: TxHash::ZERO,
            reason: crate::contracts::decode_revert_reason(&data),
        };
    }

    TxError::Submission(format!("{err:#}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_rejection_is_cancellation() {
        let err = eyre!("Failed to send transaction").wrap_err("User rejected the request.");
        assert!(matches!(classify_submission_error(&err), TxError::Cancelled));
    }

    #[test]
    fn test_insufficient_funds_is_gas_error() {
        let err = eyre!("insufficient funds for gas * price + value");
        assert!(matches!(
            classify_submission_error(&err),
            TxError::InsufficientGas
        ));
    }

    #[test]
    fn test_other_errors_are_submission_failures() {
        let err = eyre!("connection reset by peer");
        match classify_submission_error(&err) {
            TxError::Submission(msg) => assert!(msg.contains("connection reset")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_reverted_message_includes_reason() {
        let err = TxError::Reverted {
            tx_hash: TxHash::ZERO,
            reason: Some("InsufficientCollateral".into()),
        };
        assert_eq!(
            err.user_message(),
            "Transaction reverted: InsufficientCollateral"
        );
        let generic = TxError::Reverted {
            tx_hash: TxHash::ZERO,
            reason: None,
        };
        assert_eq!(generic.user_message(), "Transaction reverted");
    }

    #[test]
    fn test_preflight_classification() {
        assert!(TxError::from(ValidationError::InvalidAmount).is_preflight());
        assert!(!TxError::Cancelled.is_preflight());
        assert!(!TxError::Submission("x".into()).is_preflight());
    }
}
