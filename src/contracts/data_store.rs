//! DataStore contract bindings for protocol parameters

use alloy::primitives::{keccak256, B256};
use alloy::sol;
use alloy::sol_types::SolValue;

sol! {
    /// Key/value store holding GMX protocol parameters
    #[sol(rpc)]
    interface IDataStore {
        /// Read a uint parameter
        function getUint(bytes32 key) external view returns (uint256);
    }
}

/// Parameter keys are `keccak256(abi.encode(name))`
pub fn data_store_key(name: &str) -> B256 {
    keccak256(name.to_string().abi_encode())
}

/// Key of the protocol-wide minimum collateral (30-decimal USD)
pub fn min_collateral_usd_key() -> B256 {
    data_store_key("MIN_COLLATERAL_USD")
}
