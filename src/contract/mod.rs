//! # Contract Interface Module
//!
//! Static description of the single contract this server talks to: its address and
//! the signature of every function in its ABI. Both the tool registry and the call
//! encoder read argument order and types from here, so the two cannot drift apart.

pub mod encoder;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::Context;
use ethers_core::abi::{Abi, Function, ParamType, StateMutability};
use ethers_core::types::Address;
use thiserror::Error;

/// ABI of the deployed vault/counter contract, embedded at build time.
pub const DEFAULT_CONTRACT_ABI: &str = include_str!("abi.json");

/// Address of the deployed contract on Base Sepolia.
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0xa633656593bB24252A55A468146fe9536eA899cB";

#[derive(Error, Debug)]
pub enum DescriptorError {
    #[error("unknown contract function '{0}'")]
    UnknownFunction(String),
    #[error("function '{0}' is overloaded in the ABI; function names must be unique")]
    DuplicateFunction(String),
    #[error("invalid contract ABI: {0}")]
    InvalidAbi(#[from] serde_json::Error),
}

/// Solidity state mutability of a contract function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    Pure,
    View,
    NonPayable,
    Payable,
}

impl Mutability {
    /// `view` and `pure` functions are served by `eth_call`, everything else needs a transaction.
    pub fn is_read_only(self) -> bool {
        matches!(self, Mutability::Pure | Mutability::View)
    }

    pub fn is_payable(self) -> bool {
        self == Mutability::Payable
    }
}

impl From<StateMutability> for Mutability {
    fn from(value: StateMutability) -> Self {
        match value {
            StateMutability::Pure => Mutability::Pure,
            StateMutability::View => Mutability::View,
            StateMutability::NonPayable => Mutability::NonPayable,
            StateMutability::Payable => Mutability::Payable,
        }
    }
}

impl fmt::Display for Mutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mutability::Pure => "pure",
            Mutability::View => "view",
            Mutability::NonPayable => "nonpayable",
            Mutability::Payable => "payable",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    /// Canonical solidity type, e.g. `address` or `uint256`.
    pub solidity_type: String,
    pub kind: ParamType,
}

/// One function of the contract, in ABI order.
#[derive(Debug, Clone)]
pub struct FunctionSpec {
    pub name: String,
    pub inputs: Vec<ParamSpec>,
    pub mutability: Mutability,
    function: Function,
}

impl FunctionSpec {
    fn from_abi(function: &Function) -> Self {
        let inputs = function
            .inputs
            .iter()
            .map(|p| ParamSpec {
                name: p.name.clone(),
                solidity_type: p.kind.to_string(),
                kind: p.kind.clone(),
            })
            .collect();

        Self {
            name: function.name.clone(),
            inputs,
            mutability: function.state_mutability.into(),
            function: function.clone(),
        }
    }

    /// The raw ABI fragment, used for encoding inputs and decoding outputs.
    pub fn abi_function(&self) -> &Function {
        &self.function
    }

    /// Canonical signature such as `withdraw(address,uint256)`.
    pub fn signature(&self) -> String {
        let types: Vec<&str> = self.inputs.iter().map(|p| p.solidity_type.as_str()).collect();
        format!("{}({})", self.name, types.join(","))
    }
}

/// Immutable description of the target contract, built once at startup.
#[derive(Debug, Clone)]
pub struct ContractDescriptor {
    address: Address,
    functions: BTreeMap<String, FunctionSpec>,
}

impl ContractDescriptor {
    pub fn new(address: Address, abi: &Abi) -> Result<Self, DescriptorError> {
        let mut functions = BTreeMap::new();
        for (name, overloads) in &abi.functions {
            if overloads.len() != 1 {
                return Err(DescriptorError::DuplicateFunction(name.clone()));
            }
            functions.insert(name.clone(), FunctionSpec::from_abi(&overloads[0]));
        }
        Ok(Self { address, functions })
    }

    /// Builds a descriptor from a JSON ABI document.
    pub fn from_abi_json(address: Address, abi_json: &str) -> Result<Self, DescriptorError> {
        let abi: Abi = serde_json::from_str(abi_json)?;
        Self::new(address, &abi)
    }

    /// Loads a JSON ABI document from disk.
    pub fn from_abi_file(address: Address, path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let abi_json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read contract ABI from {}", path.display()))?;
        Self::from_abi_json(address, &abi_json)
            .with_context(|| format!("Invalid contract ABI in {}", path.display()))
    }

    /// The embedded ABI of the deployed contract at `address`.
    pub fn with_default_abi(address: Address) -> Result<Self, DescriptorError> {
        Self::from_abi_json(address, DEFAULT_CONTRACT_ABI)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn lookup(&self, function_name: &str) -> Result<&FunctionSpec, DescriptorError> {
        self.functions
            .get(function_name)
            .ok_or_else(|| DescriptorError::UnknownFunction(function_name.to_string()))
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionSpec> {
        self.functions.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn descriptor() -> ContractDescriptor {
        let address = Address::from_str(DEFAULT_CONTRACT_ADDRESS).unwrap();
        ContractDescriptor::with_default_abi(address).unwrap()
    }

    #[test]
    fn embedded_abi_matches_deployed_surface() {
        let descriptor = descriptor();
        let mut signatures: Vec<String> = descriptor.functions().map(|f| f.signature()).collect();
        signatures.sort();
        assert_eq!(
            signatures,
            vec![
                "deposit()",
                "depositERC20(address,uint256)",
                "destroyContract()",
                "getBalance()",
                "getCounter()",
                "getERC20Balance(address)",
                "incrementCounter()",
                "withdraw(address,uint256)",
                "withdrawERC20(address,address,uint256)",
            ]
        );
    }

    #[test]
    fn mutability_is_taken_from_the_abi() {
        let descriptor = descriptor();
        assert_eq!(descriptor.lookup("deposit").unwrap().mutability, Mutability::Payable);
        assert_eq!(descriptor.lookup("getCounter").unwrap().mutability, Mutability::View);
        assert_eq!(
            descriptor.lookup("withdrawERC20").unwrap().mutability,
            Mutability::NonPayable
        );
        assert!(descriptor.lookup("getBalance").unwrap().mutability.is_read_only());
        assert!(!descriptor.lookup("incrementCounter").unwrap().mutability.is_read_only());
    }

    #[test]
    fn lookup_of_missing_function_fails() {
        let err = descriptor().lookup("selfdestruct").unwrap_err();
        assert!(matches!(err, DescriptorError::UnknownFunction(name) if name == "selfdestruct"));
    }

    #[test]
    fn overloaded_functions_are_rejected() {
        let abi = r#"[
            {"inputs": [], "name": "ping", "outputs": [], "stateMutability": "nonpayable", "type": "function"},
            {"inputs": [{"internalType": "uint256", "name": "n", "type": "uint256"}], "name": "ping", "outputs": [], "stateMutability": "nonpayable", "type": "function"}
        ]"#;
        let err = ContractDescriptor::from_abi_json(Address::zero(), abi).unwrap_err();
        assert!(matches!(err, DescriptorError::DuplicateFunction(name) if name == "ping"));
    }

    #[test]
    fn malformed_abi_is_reported() {
        let err = ContractDescriptor::from_abi_json(Address::zero(), "{not json").unwrap_err();
        assert!(matches!(err, DescriptorError::InvalidAbi(_)));
    }
}
