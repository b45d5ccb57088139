// src/blockchain/mod.rs

// The execution side of a tool call: signing, broadcasting and reading.
pub mod executor;
pub mod nonce_manager;
pub mod rpc;

pub use executor::ContractExecutor;
pub use rpc::{RpcEndpoint, RpcExecutor};

// Re-export commonly used types
pub use ethers::{
    types::{Address, TxHash, U256},
    utils::to_checksum,
};
