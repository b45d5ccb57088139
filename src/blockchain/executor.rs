// src/blockchain/executor.rs

use anyhow::Result;
use async_trait::async_trait;
use ethers_core::abi::{Function, Token};
use ethers_core::types::{Address, TransactionReceipt, TransactionRequest, TxHash};

/// Everything the dispatcher needs from the wallet/provider side.
///
/// Implementations own signing, nonce sequencing, gas estimation and receipt polling,
/// including any timeout while waiting. Each method is attempted once; errors are
/// reported back as-is.
#[async_trait]
pub trait ContractExecutor: Send + Sync {
    /// Signs and broadcasts `tx`, returning its hash.
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash>;

    /// Waits until `tx_hash` is mined. A reverted transaction is an error.
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TransactionReceipt>;

    /// Executes a `view`/`pure` function via `eth_call` and decodes its outputs.
    async fn read_contract(
        &self,
        contract: Address,
        function: &Function,
        args: Vec<Token>,
    ) -> Result<Vec<Token>>;
}
