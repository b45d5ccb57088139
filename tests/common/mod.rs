#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers_core::abi::{Function, Token};
use ethers_core::types::{Address, TransactionReceipt, TransactionRequest, TxHash, U256};

use contract_tools_mcp::{blockchain::ContractExecutor, config::Config, AppState};

/// Executor that records every call and answers from canned values.
#[derive(Default)]
pub struct MockExecutor {
    pub sent: Mutex<Vec<TransactionRequest>>,
    pub awaited: Mutex<Vec<TxHash>>,
    pub reads: Mutex<Vec<(Address, String, Vec<Token>)>>,
    pub fail_send: Option<String>,
    pub fail_receipt: Option<String>,
    pub fail_read: Option<String>,
    pub read_value: u64,
}

impl MockExecutor {
    pub fn calls(&self) -> usize {
        self.sent.lock().unwrap().len() + self.reads.lock().unwrap().len()
    }
}

#[async_trait]
impl ContractExecutor for MockExecutor {
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash> {
        self.sent.lock().unwrap().push(tx);
        match &self.fail_send {
            Some(msg) => Err(anyhow!(msg.clone())),
            None => Ok(TxHash::repeat_byte(0x11)),
        }
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TransactionReceipt> {
        self.awaited.lock().unwrap().push(tx_hash);
        match &self.fail_receipt {
            Some(msg) => Err(anyhow!(msg.clone())),
            None => Ok(TransactionReceipt {
                transaction_hash: tx_hash,
                ..Default::default()
            }),
        }
    }

    async fn read_contract(
        &self,
        contract: Address,
        function: &Function,
        args: Vec<Token>,
    ) -> Result<Vec<Token>> {
        self.reads
            .lock()
            .unwrap()
            .push((contract, function.name.clone(), args));
        match &self.fail_read {
            Some(msg) => Err(anyhow!(msg.clone())),
            None => Ok(vec![Token::Uint(U256::from(self.read_value))]),
        }
    }
}

/// App state over the default config and ABI with the given executor.
pub fn app_state(executor: Arc<MockExecutor>) -> AppState {
    AppState::new(Config::default(), executor).unwrap()
}
