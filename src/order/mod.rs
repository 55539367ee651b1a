//! Order intents: pricing, request building, validation and tracking

mod builder;
mod intent;
mod pricing;
pub mod validation;

pub use builder::{
    deposit_calls, multicall_request, order_calls, withdrawal_calls, ScaledOrder,
};
pub use intent::{IntentBook, IntentId, IntentStatus, NewIntent, OrderIntent};
pub use pricing::{acceptable_price, is_price_ceiling, AcceptablePricePolicy};
