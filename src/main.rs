// src/main.rs

use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use contract_tools_mcp::{api::create_router, config::Config, mcp::stdio, AppState};
use tokio::io::{self, BufReader};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Stdio,
    Http,
}

impl Mode {
    fn from_env() -> Self {
        if env::args().any(|arg| arg == "--mcp") || env::var("MCP_MODE").is_ok() {
            Mode::Stdio
        } else {
            Mode::Http
        }
    }
}

async fn run_http_server(state: AppState) -> Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], state.config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("🚀 HTTP Server listening on {}", addr);
    axum::serve(listener, create_router(state))
        .await
        .context("HTTP server error")
}

async fn run(mode: Mode) -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    // Registry/ABI mismatches abort here rather than on the first tool call.
    let state = AppState::from_config(config).context("Failed to initialize contract tools")?;
    info!(
        "Serving {} tools for contract {} on {}",
        state.dispatcher.registry().len(),
        state.config.contract_address,
        state.config.network_name
    );

    match mode {
        Mode::Stdio => {
            info!("🚀 Starting MCP server on stdin/stdout...");
            stdio::serve(BufReader::new(io::stdin()), io::stdout(), state)
                .await
                .context("MCP stdio transport failed")
        }
        Mode::Http => run_http_server(state).await,
    }
}

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries the MCP stream.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "contract_tools_mcp=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mode = Mode::from_env();
    if let Err(e) = run(mode).await {
        error!("❌ {:#}", e);
        std::process::exit(1);
    }
    info!("Server shut down");
}
