//! # MCP Handler Module
//!
//! Implements the subset of the Model Context Protocol an agent runtime needs to use
//! the contract tools: `initialize`, `tools/list`, `tools/call` and `ping`.
//! A tool name can also be used directly as the method name; such requests are
//! rewritten into `tools/call`.
//!
//! Tool failures are *not* JSON-RPC errors. They come back as a normal result whose
//! text explains what went wrong, with `isError` set, so the agent can correct itself.

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::{
    mcp::protocol::{
        error_codes, Request, Response, ToolCallParams, ToolCallResult, MCP_PROTOCOL_VERSION,
    },
    AppState,
};

/// This is the main dispatcher for all incoming MCP requests.
pub async fn handle_mcp_request(req: Request, state: AppState) -> Option<Response> {
    info!("Handling MCP request for method: {}", req.method);

    if req.is_notification() {
        debug!("Ignoring notification {}", req.method);
        return None;
    }

    let response = match req.method.as_str() {
        "initialize" => handle_initialize(&req, &state),
        "ping" => Response::success(req.id.clone(), json!({})),
        "tools/list" => handle_tools_list(&req, &state),
        "tools/call" => handle_tool_call(req, &state).await,
        name if state.dispatcher.registry().get(name).is_some() => {
            let wrapped = Request {
                jsonrpc: req.jsonrpc.clone(),
                id: req.id.clone(),
                method: "tools/call".to_string(),
                params: Some(json!({
                    "name": name,
                    "arguments": req.params.clone().unwrap_or(Value::Null)
                })),
            };
            handle_tool_call(wrapped, &state).await
        }
        _ => Response::error(
            req.id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", req.method),
        ),
    };

    Some(response)
}

/// Handles a 'tools/call' request by handing the raw input string to the dispatcher.
async fn handle_tool_call(req: Request, state: &AppState) -> Response {
    let params: ToolCallParams = match req
        .params
        .clone()
        .map(serde_json::from_value::<ToolCallParams>)
        .transpose()
    {
        Ok(Some(p)) => p,
        Ok(None) => {
            return Response::error(
                req.id,
                error_codes::INVALID_PARAMS,
                "Missing 'params' object".into(),
            )
        }
        Err(e) => {
            return Response::error(
                req.id,
                error_codes::INVALID_PARAMS,
                format!("Invalid tools/call params: {}", e),
            )
        }
    };

    let input = match params.input() {
        Ok(input) => input,
        Err(message) => return Response::error(req.id, error_codes::INVALID_PARAMS, message),
    };

    let outcome = state.dispatcher.invoke(&params.name, &input).await;
    let result = match &outcome {
        Ok(success) => ToolCallResult::text(success.to_string(), false),
        Err(failure) => ToolCallResult::text(failure.to_string(), true),
    };

    match serde_json::to_value(result) {
        Ok(value) => Response::success(req.id, value),
        Err(e) => Response::error(req.id, error_codes::INTERNAL_ERROR, e.to_string()),
    }
}

/// Handles the 'initialize' request.
fn handle_initialize(req: &Request, state: &AppState) -> Response {
    let server_info = json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    });
    let capabilities = json!({ "tools": { "listChanged": false } });

    Response::success(
        req.id.clone(),
        json!({
            "serverInfo": server_info,
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": capabilities,
            "instructions": instructions(state)
        }),
    )
}

/// Guidance for the agent, naming the contract and network it is bound to.
pub fn instructions(state: &AppState) -> String {
    format!(
        "You interface with the smart contract deployed at {} on the {} network. \
         It accepts ETH and ERC20 deposits and withdrawals, keeps a counter and reports balances. \
         Every tool takes a single string of space-separated arguments; ETH amounts are decimals \
         (e.g. 0.01) converted to Wei for you, ERC20 amounts are raw integers. \
         Report the transaction hash after every state-changing call and never reveal wallet secrets.",
        state.config.contract_address, state.config.network_name
    )
}

/// Handles the 'tools/list' request from the registry.
fn handle_tools_list(req: &Request, state: &AppState) -> Response {
    let tools: Vec<_> = state.dispatcher.tools().map(|t| t.definition()).collect();
    Response::success(req.id.clone(), json!({ "tools": tools }))
}
