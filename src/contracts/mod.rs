//! Contract bindings for the GMX V2 protocol

pub mod data_store;
pub mod erc20;
pub mod exchange_router;
pub mod reader;

pub use data_store::*;
pub use erc20::*;
pub use exchange_router::*;
pub use reader::*;

/// Best-effort human-readable reason from raw revert data.
///
/// Standard `Error(string)` / `Panic(uint256)` payloads are decoded by alloy; anything else
/// falls back to the longest printable ASCII run in the payload.
pub fn decode_revert_reason(data: &[u8]) -> Option<String> {
    use alloy::sol_types::{Panic, Revert, SolError};

    if data.is_empty() {
        return None;
    }
    if let Ok(revert) = Revert::abi_decode(data) {
        return Some(revert.reason);
    }
    if let Ok(panic) = Panic::abi_decode(data) {
        return Some(panic.to_string());
    }
    if let Some(reason) = alloy::sol_types::decode_revert_reason(data) {
        let reason = reason.trim_matches(char::from(0)).trim().to_string();
        if !reason.is_empty() && reason.chars().all(|c| !c.is_control()) {
            return Some(reason);
        }
    }

    data.split(|b| !(b.is_ascii_graphic() || *b == b' '))
        .filter(|run| run.len() >= 4)
        .max_by_key(|run| run.len())
        .map(|run| String::from_utf8_lossy(run).trim().to_string())
        .filter(|s| !s.is_empty())
}
