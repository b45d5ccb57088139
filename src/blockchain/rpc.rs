//! JSON-RPC implementation of [`ContractExecutor`].
//!
//! Talks to a single EVM node over plain JSON-RPC. Transactions are signed locally with
//! the configured key; nonces come from [`NonceManager`]; gas and gas price are estimated
//! by the node unless a fixed limit is configured.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use ethers_core::abi::{Function, Token};
use ethers_core::types::{
    Address, TransactionReceipt, TransactionRequest, TxHash, U256, U64,
};
use ethers_signers::{LocalWallet, Signer};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::executor::ContractExecutor;
use super::nonce_manager::NonceManager;
use crate::config::Config;

/// A JSON-RPC URL plus the HTTP client used to reach it.
#[derive(Debug, Clone)]
pub struct RpcEndpoint {
    client: Client,
    url: String,
}

impl RpcEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends one JSON-RPC request and returns its `result`.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });
        debug!("RPC -> {} {}", method, payload["params"]);

        let response: Value = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("{} request to {} failed", method, self.url))?
            .json()
            .await
            .with_context(|| format!("{} returned a non-JSON response", method))?;

        if let Some(err) = response.get("error") {
            return Err(anyhow!("RPC error in {}: {}", method, err));
        }
        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }
}

/// Decodes a hex quantity such as `"0x5208"`.
pub fn parse_quantity(value: &Value, what: &str) -> Result<U256> {
    let hex_str = value
        .as_str()
        .ok_or_else(|| anyhow!("Failed to get {} from RPC response", what))?;
    U256::from_str_radix(hex_str.trim_start_matches("0x"), 16)
        .with_context(|| format!("Invalid {} quantity: {}", what, hex_str))
}

pub struct RpcExecutor {
    endpoint: RpcEndpoint,
    wallet: Option<LocalWallet>,
    chain_id: OnceCell<u64>,
    nonce_manager: NonceManager,
    default_gas_limit: Option<U256>,
    receipt_poll_interval: Duration,
    receipt_timeout: Duration,
}

impl RpcExecutor {
    /// Executor without a signer; only read-only calls will succeed.
    pub fn read_only(rpc_url: &str) -> Self {
        Self {
            endpoint: RpcEndpoint::new(rpc_url),
            wallet: None,
            chain_id: OnceCell::new(),
            nonce_manager: NonceManager::new(),
            default_gas_limit: None,
            receipt_poll_interval: Duration::from_secs(2),
            receipt_timeout: Duration::from_secs(120),
        }
    }

    pub fn with_private_key(mut self, private_key: &str) -> Result<Self> {
        let wallet = LocalWallet::from_str(private_key)
            .map_err(|e| anyhow!("Invalid private key: {}", e))?;
        self.wallet = Some(wallet);
        Ok(self)
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = OnceCell::new_with(Some(chain_id));
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.default_gas_limit = Some(U256::from(gas_limit));
        self
    }

    pub fn with_receipt_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.receipt_poll_interval = interval;
        self.receipt_timeout = timeout;
        self
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let mut executor = Self::read_only(&config.rpc_url).with_receipt_polling(
            Duration::from_millis(config.receipt_poll_interval_ms),
            Duration::from_secs(config.receipt_timeout_secs),
        );
        if let Some(key) = &config.tx_private_key {
            executor = executor
                .with_private_key(key.expose_secret())
                .context("TX_PRIVATE_KEY is not a valid private key")?;
        }
        if let Some(chain_id) = config.chain_id {
            executor = executor.with_chain_id(chain_id);
        }
        if let Some(gas_limit) = config.default_gas_limit {
            executor = executor.with_gas_limit(gas_limit);
        }
        Ok(executor)
    }

    /// Address transactions are sent from, if a key is configured.
    pub fn sender(&self) -> Option<Address> {
        self.wallet.as_ref().map(|w| w.address())
    }

    async fn chain_id(&self) -> Result<u64> {
        self.chain_id
            .get_or_try_init(|| async {
                let result = self.endpoint.request("eth_chainId", json!([])).await?;
                let chain_id = parse_quantity(&result, "chain_id")?;
                u64::try_from(chain_id)
                    .map_err(|_| anyhow!("Chain id {} reported by the node is out of range", chain_id))
            })
            .await
            .copied()
    }

    async fn sign_and_send(&self, wallet: &LocalWallet, mut tx: TransactionRequest) -> Result<TxHash> {
        if tx.gas.is_none() {
            let gas = match self.default_gas_limit {
                Some(limit) => limit,
                None => {
                    let call_obj = serde_json::to_value(&tx)?;
                    let result = self
                        .endpoint
                        .request("eth_estimateGas", json!([call_obj]))
                        .await?;
                    parse_quantity(&result, "gas estimate")?
                }
            };
            tx = tx.gas(gas);
        }

        if tx.gas_price.is_none() {
            let result = self.endpoint.request("eth_gasPrice", json!([])).await?;
            tx = tx.gas_price(parse_quantity(&result, "gasPrice")?);
        }

        let signature = wallet.sign_transaction(&tx.clone().into()).await?;
        let raw_tx = tx.rlp_signed(&signature);

        let result = self
            .endpoint
            .request(
                "eth_sendRawTransaction",
                json!([format!("0x{}", hex::encode(&raw_tx))]),
            )
            .await?;

        let tx_hash = result
            .as_str()
            .ok_or_else(|| anyhow!("Failed to extract transaction hash from response"))?;
        TxHash::from_str(tx_hash).with_context(|| format!("Invalid transaction hash: {}", tx_hash))
    }
}

#[async_trait]
impl ContractExecutor for RpcExecutor {
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash> {
        let wallet = self
            .wallet
            .as_ref()
            .ok_or_else(|| anyhow!("No signing key configured; set TX_PRIVATE_KEY to send transactions"))?;
        let from = wallet.address();

        let chain_id = self.chain_id().await?;
        let nonce = self
            .nonce_manager
            .get_next_nonce(from, &self.endpoint)
            .await?;
        let tx = tx.from(from).nonce(nonce).chain_id(chain_id);

        match self.sign_and_send(wallet, tx).await {
            Ok(hash) => Ok(hash),
            Err(e) => {
                warn!("Send from {:?} failed, dropping cached nonce {}", from, nonce);
                self.nonce_manager.reset(from);
                Err(e)
            }
        }
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TransactionReceipt> {
        let started = Instant::now();
        loop {
            let result = self
                .endpoint
                .request("eth_getTransactionReceipt", json!([format!("{:?}", tx_hash)]))
                .await?;

            if !result.is_null() {
                let receipt: TransactionReceipt =
                    serde_json::from_value(result).context("Malformed transaction receipt")?;
                if receipt.status == Some(U64::zero()) {
                    bail!("Transaction {:?} reverted", tx_hash);
                }
                return Ok(receipt);
            }

            if started.elapsed() >= self.receipt_timeout {
                bail!(
                    "Timed out after {}s waiting for receipt of {:?}",
                    self.receipt_timeout.as_secs(),
                    tx_hash
                );
            }
            tokio::time::sleep(self.receipt_poll_interval).await;
        }
    }

    async fn read_contract(
        &self,
        contract: Address,
        function: &Function,
        args: Vec<Token>,
    ) -> Result<Vec<Token>> {
        let data = function
            .encode_input(&args)
            .with_context(|| format!("Failed to encode call to {}", function.name))?;

        let result = self
            .endpoint
            .request(
                "eth_call",
                json!([
                    {"to": format!("{:?}", contract), "data": format!("0x{}", hex::encode(&data))},
                    "latest"
                ]),
            )
            .await?;

        let hex_str = result
            .as_str()
            .ok_or_else(|| anyhow!("eth_call returned a non-string result"))?;
        let bytes = hex::decode(hex_str.trim_start_matches("0x"))
            .context("eth_call returned invalid hex")?;
        if bytes.is_empty() && !function.outputs.is_empty() {
            bail!("eth_call returned no data; is {:?} a deployed contract?", contract);
        }

        function
            .decode_output(&bytes)
            .with_context(|| format!("Failed to decode return value of {}", function.name))
    }
}
