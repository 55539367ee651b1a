//! User-facing request and view types

mod liquidity;
mod order;

pub use liquidity::{DepositRequest, LiquidityPosition, WithdrawalRequest};
pub use order::{DecreaseOrderRequest, IncreaseOrderRequest, PendingOrder};

use std::fmt;

/// Direction of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn from_is_long(is_long: bool) -> Self {
        if is_long {
            Self::Long
        } else {
            Self::Short
        }
    }

    pub fn is_long(self) -> bool {
        self == Self::Long
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
        }
    }
}

/// Whether an order opens/grows or shrinks/closes a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderKind {
    Increase,
    Decrease,
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Increase => write!(f, "INCREASE"),
            Self::Decrease => write!(f, "DECREASE"),
        }
    }
}
