// MCP (JSON-RPC) surface over the contract tools
pub mod handler;
pub mod protocol;
pub mod stdio;
