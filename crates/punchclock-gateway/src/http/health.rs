use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness probe, also the keep-alive target.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "punchclock",
        "version": env!("CARGO_PKG_VERSION"),
        "registered_users": state.registry.len(),
        "uptime_secs": (Utc::now() - state.started_at).num_seconds(),
    }))
}

/// GET /
pub async fn banner_handler() -> Json<Value> {
    Json(json!({
        "service": "punchclock",
        "description": "Telegram attendance bot",
        "endpoints": ["/", "/health"],
    }))
}
