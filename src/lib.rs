// src/lib.rs

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

// Re-export commonly used types
pub use ethers::types::{Address, TxHash, U256};

pub mod api;
pub mod blockchain;
pub mod config;
pub mod contract;
pub mod mcp;
pub mod tools;

use blockchain::{ContractExecutor, RpcExecutor};
use contract::ContractDescriptor;
use tools::Dispatcher;

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: config::Config,
    /// Routes tool calls to the contract
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    /// Builds the descriptor, validates the tool registry against it and wires the
    /// given executor in. Any tool/ABI mismatch is reported here, before serving.
    pub fn new(config: config::Config, executor: Arc<dyn ContractExecutor>) -> Result<Self> {
        let address = config.contract_address()?;
        let descriptor = match &config.contract_abi_path {
            Some(path) => ContractDescriptor::from_abi_file(address, path)?,
            None => ContractDescriptor::with_default_abi(address)
                .context("Embedded contract ABI is invalid")?,
        };

        let dispatcher = Dispatcher::new(Arc::new(descriptor), executor)
            .context("Tool registry does not match the contract ABI")?;
        info!(
            "Registered {} contract tools for {:?}",
            dispatcher.registry().len(),
            address
        );

        Ok(Self {
            config,
            dispatcher: Arc::new(dispatcher),
        })
    }

    /// State backed by the JSON-RPC executor described by `config`.
    pub fn from_config(config: config::Config) -> Result<Self> {
        let executor = RpcExecutor::from_config(&config)?;
        match executor.sender() {
            Some(sender) => info!("Transactions will be sent from {:?}", sender),
            None => info!("No TX_PRIVATE_KEY configured; only read-only tools will succeed"),
        }
        Self::new(config, Arc::new(executor))
    }
}
