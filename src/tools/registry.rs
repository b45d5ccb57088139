//! Catalogue of the contract tools exposed to agent runtimes.

use std::collections::HashSet;

use ethers_core::abi::ParamType;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use super::args::{ArgKind, ArgSlot, Binding};
use crate::contract::{ContractDescriptor, DescriptorError};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("tool '{tool}' is bound to a missing function: {source}")]
    UnknownFunction {
        tool: String,
        #[source]
        source: DescriptorError,
    },
    #[error("tool '{tool}' declares {declared} argument slot(s) but {function} takes {expected}")]
    ArityMismatch {
        tool: String,
        function: String,
        declared: usize,
        expected: usize,
    },
    #[error("tool '{tool}' slot {label} ({kind:?}) cannot encode {function} parameter of type {solidity_type}")]
    SlotTypeMismatch {
        tool: String,
        function: String,
        label: String,
        kind: ArgKind,
        solidity_type: String,
    },
    #[error("tool '{tool}' sends a value but {function} is not payable")]
    ValueNotPayable { tool: String, function: String },
    #[error("tool '{tool}' declares more than one value slot")]
    MultipleValueSlots { tool: String },
    #[error("tool '{0}' is registered twice")]
    DuplicateTool(String),
}

/// Static description of one tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub function_name: &'static str,
    pub slots: &'static [ArgSlot],
    /// Sample input shown when the caller gets the grammar wrong.
    pub example: &'static str,
}

impl ToolSpec {
    /// Space-separated slot labels, e.g. `TOKEN_ADDRESS AMOUNT`.
    pub fn usage(&self) -> String {
        self.slots.iter().map(|s| s.label).collect::<Vec<_>>().join(" ")
    }

    pub fn supports_value(&self) -> bool {
        self.slots.iter().any(|s| s.binding == Binding::Value)
    }

    pub fn definition(&self) -> ToolDefinition {
        let input_description = if self.slots.is_empty() {
            "Leave empty; this tool takes no arguments.".to_string()
        } else {
            format!(
                "Space-separated arguments: '{}'. Example: '{}'",
                self.usage(),
                self.example
            )
        };

        ToolDefinition {
            name: self.name.to_string(),
            description: self.description.to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "input": { "type": "string", "description": input_description }
                },
                "required": if self.slots.is_empty() { json!([]) } else { json!(["input"]) },
                "additionalProperties": false
            }),
        }
    }
}

/// Tool definition as listed to an MCP client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

pub const CONTRACT_TOOLS: &[ToolSpec] = &[
    ToolSpec {
        name: "deposit_eth",
        description: "Deposit ETH into the custom smart contract. Argument: an ETH amount like '0.0001'.",
        function_name: "deposit",
        slots: &[ArgSlot::eth_value("AMOUNT_IN_ETH")],
        example: "0.0001",
    },
    ToolSpec {
        name: "deposit_erc20",
        description: "Deposit ERC20 tokens into the custom contract. Provide 'TOKEN_ADDRESS AMOUNT' (AMOUNT is a raw integer).",
        function_name: "depositERC20",
        slots: &[ArgSlot::address("TOKEN_ADDRESS"), ArgSlot::integer("AMOUNT")],
        example: "0xSomeToken 5000",
    },
    ToolSpec {
        name: "increment_counter",
        description: "Increment the counter in the custom smart contract (no arguments).",
        function_name: "incrementCounter",
        slots: &[],
        example: "",
    },
    ToolSpec {
        name: "get_contract_balance",
        description: "Get the ETH balance (in Wei) of the custom smart contract (no arguments).",
        function_name: "getBalance",
        slots: &[],
        example: "",
    },
    ToolSpec {
        name: "get_contract_counter",
        description: "Get the current counter value of the custom smart contract (no arguments).",
        function_name: "getCounter",
        slots: &[],
        example: "",
    },
    ToolSpec {
        name: "get_contract_erc20_balance",
        description: "Get the ERC20 token balance of the custom contract. Provide a single 'TOKEN_ADDRESS'.",
        function_name: "getERC20Balance",
        slots: &[ArgSlot::address("TOKEN_ADDRESS")],
        example: "0xSomeToken",
    },
    ToolSpec {
        name: "withdraw",
        description: "Withdraw native ETH from the custom contract. Provide 'TO_ADDRESS AMOUNT_IN_ETH'. Example: '0xReceiver 0.01'",
        function_name: "withdraw",
        slots: &[ArgSlot::address("TO_ADDRESS"), ArgSlot::eth_decimal("AMOUNT_IN_ETH")],
        example: "0xReceiver 0.01",
    },
    ToolSpec {
        name: "withdraw_erc20",
        description: "Withdraw ERC20 tokens from the custom contract. Provide 'TOKEN_ADDRESS TO_ADDRESS AMOUNT'. Example: '0xSomeToken 0xReceiver 1000'",
        function_name: "withdrawERC20",
        slots: &[
            ArgSlot::address("TOKEN_ADDRESS"),
            ArgSlot::address("TO_ADDRESS"),
            ArgSlot::integer("AMOUNT"),
        ],
        example: "0xSomeToken 0xReceiver 100000",
    },
];

/// Validated, immutable tool catalogue.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Vec<ToolSpec>,
}

impl ToolRegistry {
    /// Validates every tool against `descriptor`. Any mismatch is a startup error.
    pub fn new(descriptor: &ContractDescriptor, tools: &[ToolSpec]) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for tool in tools {
            if !seen.insert(tool.name) {
                return Err(RegistryError::DuplicateTool(tool.name.to_string()));
            }
            validate_tool(descriptor, tool)?;
            debug!("Registered tool {} -> {}", tool.name, tool.function_name);
        }
        Ok(Self {
            tools: tools.to_vec(),
        })
    }

    /// Registry with the built-in contract tools.
    pub fn with_contract_tools(descriptor: &ContractDescriptor) -> Result<Self, RegistryError> {
        Self::new(descriptor, CONTRACT_TOOLS)
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn validate_tool(descriptor: &ContractDescriptor, tool: &ToolSpec) -> Result<(), RegistryError> {
    let function = descriptor
        .lookup(tool.function_name)
        .map_err(|source| RegistryError::UnknownFunction {
            tool: tool.name.to_string(),
            source,
        })?;

    let value_slots = tool.slots.iter().filter(|s| s.binding == Binding::Value).count();
    if value_slots > 1 {
        return Err(RegistryError::MultipleValueSlots {
            tool: tool.name.to_string(),
        });
    }
    if tool.supports_value() && !function.mutability.is_payable() {
        return Err(RegistryError::ValueNotPayable {
            tool: tool.name.to_string(),
            function: function.name.clone(),
        });
    }

    let arg_slots: Vec<&ArgSlot> = tool.slots.iter().filter(|s| s.binding == Binding::Arg).collect();
    if arg_slots.len() != function.inputs.len() {
        return Err(RegistryError::ArityMismatch {
            tool: tool.name.to_string(),
            function: function.name.clone(),
            declared: arg_slots.len(),
            expected: function.inputs.len(),
        });
    }

    for (slot, param) in arg_slots.into_iter().zip(&function.inputs) {
        let compatible = matches!(
            (slot.kind, &param.kind),
            (ArgKind::Address, ParamType::Address)
                | (ArgKind::Integer | ArgKind::EthDecimal, ParamType::Uint(_))
        );
        if !compatible {
            return Err(RegistryError::SlotTypeMismatch {
                tool: tool.name.to_string(),
                function: function.name.clone(),
                label: slot.label.to_string(),
                kind: slot.kind,
                solidity_type: param.solidity_type.clone(),
            });
        }
    }
    Ok(())
}
