// src/config.rs

use std::env;
use std::str::FromStr;

use anyhow::{Context, Result};
use ethers_core::types::Address;
use secrecy::SecretString;

use crate::contract::DEFAULT_CONTRACT_ADDRESS;

pub const DEFAULT_RPC_URL: &str = "https://sepolia.base.org";
pub const DEFAULT_NETWORK_NAME: &str = "base-sepolia";

// All configuration, loaded once at startup from the environment / .env file.
#[derive(Clone, Debug)]
pub struct Config {
    // Server settings
    pub port: u16,

    /// JSON-RPC endpoint of the chain the contract lives on.
    pub rpc_url: String,
    /// Chain id used for signing; fetched with `eth_chainId` when unset.
    pub chain_id: Option<u64>,
    /// Human-readable network name, surfaced to the agent in the MCP instructions.
    pub network_name: String,

    // Contract settings
    pub contract_address: String,
    pub contract_abi_path: Option<String>,

    // Transaction settings
    pub tx_private_key: Option<SecretString>,
    pub default_gas_limit: Option<u64>,
    pub receipt_poll_interval_ms: u64,
    pub receipt_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            rpc_url: DEFAULT_RPC_URL.to_string(),
            chain_id: None,
            network_name: DEFAULT_NETWORK_NAME.to_string(),
            contract_address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            contract_abi_path: None,
            tx_private_key: None,
            default_gas_limit: None,
            receipt_poll_interval_ms: 2_000,
            receipt_timeout_secs: 120,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        // Load variables from the .env file into the environment
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let rpc_url = env::var("RPC_URL").unwrap_or(defaults.rpc_url);
        url::Url::parse(&rpc_url).with_context(|| format!("RPC_URL is not a valid URL: {}", rpc_url))?;

        let contract_address =
            env::var("CONTRACT_ADDRESS").unwrap_or(defaults.contract_address);
        Address::from_str(&contract_address)
            .with_context(|| format!("CONTRACT_ADDRESS is not a valid address: {}", contract_address))?;

        Ok(Config {
            port: parse_var("PORT", defaults.port)?,

            rpc_url,
            chain_id: parse_optional_var("CHAIN_ID")?,
            network_name: env::var("NETWORK_NAME").unwrap_or(defaults.network_name),

            contract_address,
            contract_abi_path: env::var("CONTRACT_ABI_PATH").ok().filter(|p| !p.is_empty()),

            tx_private_key: env::var("TX_PRIVATE_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty())
                .map(SecretString::new),
            default_gas_limit: parse_optional_var("DEFAULT_GAS_LIMIT")?,
            receipt_poll_interval_ms: parse_var(
                "RECEIPT_POLL_INTERVAL_MS",
                defaults.receipt_poll_interval_ms,
            )?,
            receipt_timeout_secs: parse_var("RECEIPT_TIMEOUT_SECS", defaults.receipt_timeout_secs)?,
        })
    }

    /// Parsed contract address.
    pub fn contract_address(&self) -> Result<Address> {
        Address::from_str(&self.contract_address)
            .with_context(|| format!("Invalid contract address: {}", self.contract_address))
    }
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", key)),
        Err(_) => Ok(default),
    }
}

fn parse_optional_var<T: FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} must be a valid number", key)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_deployed_contract() {
        let config = Config::default();
        assert_eq!(config.network_name, "base-sepolia");
        assert_eq!(
            config.contract_address().unwrap(),
            Address::from_str(DEFAULT_CONTRACT_ADDRESS).unwrap()
        );
        assert!(config.tx_private_key.is_none());
    }

    #[test]
    fn invalid_contract_address_is_reported() {
        let config = Config {
            contract_address: "0xnope".into(),
            ..Config::default()
        };
        assert!(config.contract_address().is_err());
    }
}
