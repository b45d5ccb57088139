//! # API Module
//!
//! HTTP access to the contract tools, for clients that do not speak MCP over stdio.
//!
//! ## Available Endpoints
//!
//! - `GET /health` - Liveness plus the bound contract and network
//! - `GET /tools` - Tool catalogue (name, description, input schema)
//! - `POST /tools/:name` - Run a tool with `{"input": "<space-separated args>"}` (empty body = no args)
//! - `POST /rpc` - MCP JSON-RPC (`initialize`, `tools/list`, `tools/call`)

pub mod health;
pub mod tools;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

/// Router with every endpoint mounted under `/api`.
pub fn create_router(state: AppState) -> Router {
    let api_router = Router::new()
        .route("/health", get(health::health_handler))
        .route("/tools", get(tools::list_tools_handler))
        .route("/tools/:name", post(tools::call_tool_handler))
        .route("/rpc", post(tools::rpc_handler));

    Router::new()
        .nest("/api", api_router)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
