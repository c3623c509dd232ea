use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

const SERVICE_NAME: &str = "tailor-api";

/// GET /
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "Resume Tailoring API",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /health
/// Returns a simple status object with service version.
pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": SERVICE_NAME
    }))
}

/// GET /api/health
/// Probes the LLM provider with one un-retried call.
pub async fn api_health_handler(State(state): State<AppState>) -> Json<Value> {
    let llm_api = if state.llm.ping().await {
        "available"
    } else {
        "unavailable"
    };
    Json(json!({
        "status": "healthy",
        "llm_api": llm_api,
        "provider": state.llm.provider_name(),
        "model": state.llm.model(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}
