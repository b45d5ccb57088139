// src/blockchain/nonce_manager.rs

use std::sync::Arc;

use dashmap::DashMap;
use ethers_core::types::{Address, U256};
use serde_json::json;
use tokio::sync::Mutex;

use super::rpc::{parse_quantity, RpcEndpoint};

// Hands out sequential nonces per sender so back-to-back transactions never collide.
#[derive(Debug, Clone, Default)]
pub struct NonceManager {
    // One lock per sender; DashMap keeps unrelated senders from contending.
    nonces: Arc<DashMap<Address, Arc<Mutex<NonceState>>>>,
}

#[derive(Debug)]
struct NonceState {
    next_nonce: Option<U256>,
}

impl NonceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next nonce for `address`. The first call per sender asks the node for the
    /// pending transaction count; later calls increment the cached value.
    pub async fn get_next_nonce(
        &self,
        address: Address,
        endpoint: &RpcEndpoint,
    ) -> anyhow::Result<U256> {
        let address_nonce_lock = self
            .nonces
            .entry(address)
            .or_insert_with(|| Arc::new(Mutex::new(NonceState { next_nonce: None })))
            .clone();

        let mut state = address_nonce_lock.lock().await;

        let nonce_to_use = match state.next_nonce {
            Some(nonce) => nonce,
            None => {
                let result = endpoint
                    .request(
                        "eth_getTransactionCount",
                        json!([format!("{:?}", address), "pending"]),
                    )
                    .await?;
                parse_quantity(&result, "nonce")?
            }
        };

        state.next_nonce = Some(nonce_to_use + U256::one());

        Ok(nonce_to_use)
    }

    /// Forgets the cached nonce so the next call re-reads it from the node.
    /// Used after a transaction fails to reach the mempool.
    pub fn reset(&self, address: Address) {
        self.nonces.remove(&address);
    }
}
