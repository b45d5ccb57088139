//! # Tool Dispatcher
//!
//! Routes `(tool name, raw input)` to the parser, the encoder and then either the
//! read-only or the transaction path of the injected [`ContractExecutor`]. Every
//! invocation ends in exactly one rendered string; failures are values, not panics.

use std::fmt;
use std::sync::Arc;

use ethers_core::abi::Token;
use ethers_core::types::{TxHash, I256};
use ethers_core::utils::to_checksum;
use tracing::{error, info, warn};

use super::args::{parse_args, ArgError};
use super::registry::{RegistryError, ToolDefinition, ToolRegistry, ToolSpec};
use crate::blockchain::executor::ContractExecutor;
use crate::contract::encoder::{encode_call, to_tokens, EncodingError, ParsedCall};
use crate::contract::{ContractDescriptor, FunctionSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    UnknownTool,
    InvalidArguments,
    /// Descriptor/registry inconsistency discovered at call time.
    Encoding,
    /// RPC, signing or on-chain failure reported by the executor.
    Execution,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallSuccess {
    Transaction { function_name: String, tx_hash: TxHash },
    Value { function_name: String, value: String },
}

impl fmt::Display for CallSuccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallSuccess::Transaction {
                function_name,
                tx_hash,
            } => write!(
                f,
                "Successfully called {}. Transaction hash: {:?}",
                function_name, tx_hash
            ),
            CallSuccess::Value { value, .. } => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl CallFailure {
    fn new(kind: FailureKind, message: String) -> Self {
        Self { kind, message }
    }
}

impl fmt::Display for CallFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

pub type CallOutcome = Result<CallSuccess, CallFailure>;

/// The single text channel back to the agent.
pub fn render(outcome: &CallOutcome) -> String {
    match outcome {
        Ok(success) => success.to_string(),
        Err(failure) => failure.to_string(),
    }
}

pub struct Dispatcher {
    descriptor: Arc<ContractDescriptor>,
    registry: ToolRegistry,
    executor: Arc<dyn ContractExecutor>,
}

impl Dispatcher {
    /// Dispatcher over the built-in contract tools.
    pub fn new(
        descriptor: Arc<ContractDescriptor>,
        executor: Arc<dyn ContractExecutor>,
    ) -> Result<Self, RegistryError> {
        let registry = ToolRegistry::with_contract_tools(&descriptor)?;
        Ok(Self::with_registry(descriptor, registry, executor))
    }

    pub fn with_registry(
        descriptor: Arc<ContractDescriptor>,
        registry: ToolRegistry,
        executor: Arc<dyn ContractExecutor>,
    ) -> Self {
        Self {
            descriptor,
            registry,
            executor,
        }
    }

    pub fn descriptor(&self) -> &ContractDescriptor {
        &self.descriptor
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Enumerates the catalogue as callable entries.
    pub fn tools(&self) -> impl Iterator<Item = BoundTool<'_>> {
        self.registry.iter().map(move |spec| BoundTool {
            spec,
            dispatcher: self,
        })
    }

    pub fn tool(&self, name: &str) -> Option<BoundTool<'_>> {
        self.registry.get(name).map(|spec| BoundTool {
            spec,
            dispatcher: self,
        })
    }

    /// Runs one tool call and renders the outcome.
    pub async fn dispatch(&self, tool_name: &str, raw_input: &str) -> String {
        render(&self.invoke(tool_name, raw_input).await)
    }

    pub async fn invoke(&self, tool_name: &str, raw_input: &str) -> CallOutcome {
        let Some(spec) = self.registry.get(tool_name) else {
            warn!("Unknown tool requested: {}", tool_name);
            return Err(CallFailure::new(
                FailureKind::UnknownTool,
                format!(
                    "Error: Unknown tool '{}'. Available tools: {}",
                    tool_name,
                    self.registry.names().join(", ")
                ),
            ));
        };

        let parsed = parse_args(spec.slots, raw_input).map_err(|e| {
            warn!("Invalid arguments for {}: {}", spec.name, e);
            CallFailure::new(FailureKind::InvalidArguments, argument_message(spec, &e))
        })?;

        let function = self.descriptor.lookup(spec.function_name).map_err(|e| {
            error!("Tool {} is bound to a missing function: {}", spec.name, e);
            CallFailure::new(
                FailureKind::Encoding,
                format!("Error calling {}: {}", spec.function_name, e),
            )
        })?;

        let call = ParsedCall {
            function_name: function.name.clone(),
            args: parsed.args,
            value_wei: parsed.value_wei,
        };

        info!(
            "Dispatching tool {} -> {} ({})",
            spec.name,
            function.signature(),
            function.mutability
        );

        if function.mutability.is_read_only() {
            self.read(function, &call).await
        } else {
            self.transact(&call).await
        }
    }

    async fn read(&self, function: &FunctionSpec, call: &ParsedCall) -> CallOutcome {
        let tokens = to_tokens(function, &call.args)
            .map_err(|e| encoding_failure("Error reading from contract", e))?;

        let outputs = self
            .executor
            .read_contract(self.descriptor.address(), function.abi_function(), tokens)
            .await
            .map_err(|e| {
                error!("Read of {} failed: {:#}", function.name, e);
                CallFailure::new(
                    FailureKind::Execution,
                    format!("Error reading from contract: {:#}", e),
                )
            })?;

        Ok(CallSuccess::Value {
            function_name: function.name.clone(),
            value: render_tokens(&outputs),
        })
    }

    async fn transact(&self, call: &ParsedCall) -> CallOutcome {
        let prefix = format!("Error calling {}", call.function_name);
        let encoded =
            encode_call(&self.descriptor, call).map_err(|e| encoding_failure(&prefix, e))?;
        let tx = encoded.to_transaction_request(self.descriptor.address());

        let execution_failure = |e: anyhow::Error| {
            error!("{}: {:#}", prefix, e);
            CallFailure::new(FailureKind::Execution, format!("{}: {:#}", prefix, e))
        };

        let tx_hash = self
            .executor
            .send_transaction(tx)
            .await
            .map_err(execution_failure)?;
        info!("Submitted {} in tx {:?}", call.function_name, tx_hash);

        self.executor
            .wait_for_receipt(tx_hash)
            .await
            .map_err(execution_failure)?;
        info!("Transaction {:?} confirmed", tx_hash);

        Ok(CallSuccess::Transaction {
            function_name: call.function_name.clone(),
            tx_hash,
        })
    }
}

/// A catalogue entry bound to its dispatcher.
#[derive(Clone, Copy)]
pub struct BoundTool<'a> {
    spec: &'a ToolSpec,
    dispatcher: &'a Dispatcher,
}

impl BoundTool<'_> {
    pub fn name(&self) -> &'static str {
        self.spec.name
    }

    pub fn description(&self) -> &'static str {
        self.spec.description
    }

    pub fn definition(&self) -> ToolDefinition {
        self.spec.definition()
    }

    pub async fn call(&self, raw_input: &str) -> String {
        self.dispatcher.dispatch(self.spec.name, raw_input).await
    }
}

fn argument_message(spec: &ToolSpec, err: &ArgError) -> String {
    match err {
        ArgError::ArgumentCount { found, .. } if spec.slots.is_empty() => format!(
            "Error: {} takes no arguments, got {}.",
            spec.name, found
        ),
        ArgError::ArgumentCount { expected, found } => format!(
            "Error: Provide '{}' separated by spaces ({} expected, got {}). Example: '{}'",
            spec.usage(),
            expected,
            found,
            spec.example
        ),
        ArgError::NotAnInteger { .. } | ArgError::NotADecimal { .. } => {
            format!("Error: {}. Usage: '{}'", err, spec.usage())
        }
    }
}

fn encoding_failure(prefix: &str, err: EncodingError) -> CallFailure {
    if err.is_user_input() {
        warn!("{}: {}", prefix, err);
        CallFailure::new(FailureKind::InvalidArguments, format!("{}: {}", prefix, err))
    } else {
        error!("{}: {} (tool/ABI mismatch)", prefix, err);
        CallFailure::new(FailureKind::Encoding, format!("{}: {}", prefix, err))
    }
}

fn render_tokens(tokens: &[Token]) -> String {
    if tokens.is_empty() {
        return "(no return value)".to_string();
    }
    tokens.iter().map(render_token).collect::<Vec<_>>().join(", ")
}

fn render_token(token: &Token) -> String {
    match token {
        Token::Uint(n) => n.to_string(),
        Token::Int(n) => I256::from_raw(*n).to_string(),
        Token::Address(a) => to_checksum(a, None),
        Token::Bool(b) => b.to_string(),
        Token::String(s) => s.clone(),
        Token::Bytes(b) | Token::FixedBytes(b) => format!("0x{}", hex::encode(b)),
        Token::Array(items) | Token::FixedArray(items) | Token::Tuple(items) => {
            format!("[{}]", items.iter().map(render_token).collect::<Vec<_>>().join(", "))
        }
    }
}
