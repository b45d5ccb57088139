// src/api/tools.rs

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    mcp::{
        handler::handle_mcp_request,
        protocol::{error_codes, Request, Response},
    },
    tools::{FailureKind, ToolDefinition},
    AppState,
};

/// Body of `POST /tools/:name`. An empty body means "no arguments".
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolCallBody {
    #[serde(default)]
    pub input: Option<String>,
}

impl ToolCallBody {
    /// Parses the raw request body. Anything other than an empty body or
    /// `{"input": "<space-separated args>"}` is rejected so it can never run a tool.
    pub fn from_bytes(body: &[u8]) -> Result<Self, String> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| {
            format!(
                "Error: invalid request body ({}). Expected {{\"input\": \"<space-separated arguments>\"}}",
                e
            )
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolCallReply {
    pub tool: String,
    pub output: String,
    pub ok: bool,
}

pub async fn list_tools_handler(State(state): State<AppState>) -> Json<Vec<ToolDefinition>> {
    Json(state.dispatcher.tools().map(|t| t.definition()).collect())
}

/// Runs one tool. Tool-level failures are still `200 OK` with `ok: false`, except an
/// unknown tool name (`404`) and an unreadable body (`400`).
pub async fn call_tool_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> (StatusCode, Json<ToolCallReply>) {
    let input = match ToolCallBody::from_bytes(&body) {
        Ok(parsed) => parsed.input.unwrap_or_default(),
        Err(output) => {
            warn!("Rejected HTTP tool call {}: {}", name, output);
            let reply = ToolCallReply {
                tool: name,
                output,
                ok: false,
            };
            return (StatusCode::BAD_REQUEST, Json(reply));
        }
    };
    info!("HTTP tool call {} ({} bytes of input)", name, input.len());

    let outcome = state.dispatcher.invoke(&name, &input).await;
    let status = match &outcome {
        Err(failure) if failure.kind == FailureKind::UnknownTool => StatusCode::NOT_FOUND,
        _ => StatusCode::OK,
    };
    let reply = ToolCallReply {
        tool: name,
        ok: outcome.is_ok(),
        output: match outcome {
            Ok(success) => success.to_string(),
            Err(failure) => failure.to_string(),
        },
    };
    (status, Json(reply))
}

// Forward JSON-RPC requests over HTTP to the MCP handler
pub async fn rpc_handler(State(state): State<AppState>, Json(req): Json<Request>) -> Json<Response> {
    match handle_mcp_request(req, state).await {
        Some(resp) => Json(resp),
        None => Json(Response::error(
            serde_json::Value::Null,
            error_codes::INVALID_REQUEST,
            "Notifications are not supported over HTTP".into(),
        )),
    }
}
