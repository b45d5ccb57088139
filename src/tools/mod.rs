//! # Contract Tools
//!
//! The tool layer the agent talks to: a declarative argument parser, the validated tool
//! catalogue, and the dispatcher that turns a tool call into a contract call.
//!
//! ## Tools
//!
//! ### Transactions
//! - `deposit_eth` - `AMOUNT_IN_ETH`, sent as value to `deposit()`
//! - `deposit_erc20` - `TOKEN_ADDRESS AMOUNT`
//! - `increment_counter` - no arguments
//! - `withdraw` - `TO_ADDRESS AMOUNT_IN_ETH`
//! - `withdraw_erc20` - `TOKEN_ADDRESS TO_ADDRESS AMOUNT`
//!
//! ### Reads
//! - `get_contract_balance` - no arguments
//! - `get_contract_counter` - no arguments
//! - `get_contract_erc20_balance` - `TOKEN_ADDRESS`

pub mod args;
pub mod dispatcher;
pub mod registry;

pub use dispatcher::{BoundTool, CallFailure, CallOutcome, CallSuccess, Dispatcher, FailureKind};
pub use registry::{ToolDefinition, ToolRegistry, ToolSpec, CONTRACT_TOOLS};
