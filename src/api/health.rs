use axum::{extract::State, response::IntoResponse, Json};

use crate::AppState;

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "contract": state.config.contract_address,
        "network": state.config.network_name,
        "tools": state.dispatcher.registry().len(),
        "timestamp": chrono::Utc::now(),
    }))
}
