//! Pre-flight validation
//!
//! Every check here runs before anything is signed. When several fail, the first in
//! [`ValidationError`] declaration order is reported.

use crate::chain::ChainReader;
use crate::config::RiskParams;
use crate::constants::usd_to_f64;
use crate::error::{TxError, ValidationError};
use alloy::primitives::{Address, U256};

/// Inputs of an increase-order check, all already scaled
#[derive(Debug, Clone)]
pub struct IncreaseChecks {
    /// Collateral token units
    pub collateral_amount: U256,
    pub collateral_usd: f64,
    pub size_usd: f64,
    /// Trader's collateral token balance
    pub collateral_balance: U256,
    pub collateral_symbol: String,
    /// Trader's native balance (wei)
    pub native_balance: U256,
    pub execution_fee: U256,
    /// Protocol minimum plus fee buffer
    pub min_collateral_usd: f64,
}

impl IncreaseChecks {
    /// `size / collateral`, zero when there is no collateral value
    pub fn leverage(&self) -> f64 {
        if self.collateral_usd > 0.0 {
            self.size_usd / self.collateral_usd
        } else {
            0.0
        }
    }
}

/// Validate an increase order in priority order
pub fn validate_increase(checks: &IncreaseChecks, risk: &RiskParams) -> Result<(), ValidationError> {
    if checks.collateral_amount.is_zero() || checks.size_usd <= 0.0 {
        return Err(ValidationError::InvalidAmount);
    }
    if checks.collateral_usd < checks.min_collateral_usd {
        return Err(ValidationError::BelowMinCollateral {
            min_usd: checks.min_collateral_usd,
        });
    }
    if checks.collateral_amount > checks.collateral_balance {
        return Err(ValidationError::InsufficientBalance {
            symbol: checks.collateral_symbol.clone(),
        });
    }
    if checks.native_balance < checks.execution_fee {
        return Err(ValidationError::InsufficientGas);
    }
    let leverage = checks.leverage();
    if !(risk.min_leverage..=risk.max_leverage).contains(&leverage) {
        return Err(ValidationError::LeverageOutOfRange {
            min: risk.min_leverage,
            max: risk.max_leverage,
        });
    }
    Ok(())
}

/// Validate a decrease order: a non-zero size and gas for the execution fee
pub fn validate_decrease(
    size_delta_usd: U256,
    native_balance: U256,
    execution_fee: U256,
) -> Result<(), ValidationError> {
    if size_delta_usd.is_zero() {
        return Err(ValidationError::InvalidAmount);
    }
    if native_balance < execution_fee {
        return Err(ValidationError::InsufficientGas);
    }
    Ok(())
}

/// Protocol minimum collateral in USD plus the fee buffer.
///
/// Falls back to the configured minimum when the DataStore read fails or returns zero.
pub async fn min_collateral_usd<R: ChainReader>(reader: &R, risk: &RiskParams) -> f64 {
    let base = match reader.min_collateral_usd().await {
        Ok(raw) if !raw.is_zero() => usd_to_f64(raw),
        Ok(_) => risk.fallback_min_collateral_usd,
        Err(e) => {
            tracing::warn!("Failed to read MIN_COLLATERAL_USD, using fallback: {e:#}");
            risk.fallback_min_collateral_usd
        }
    };
    base + risk.min_collateral_buffer_usd
}

/// Block submission unless `owner` has approved `spender` for `required` of `token`
pub async fn ensure_allowance<R: ChainReader>(
    reader: &R,
    token: Address,
    owner: Address,
    spender: Address,
    required: U256,
) -> Result<(), TxError> {
    let allowance = reader
        .allowance(token, owner, spender)
        .await
        .map_err(|e| TxError::Submission(format!("Failed to read allowance: {e:#}")))?;
    if allowance < required {
        return Err(TxError::ApprovalRequired {
            token,
            spender,
            required,
            allowance,
        });
    }
    Ok(())
}
