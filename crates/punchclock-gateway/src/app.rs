use axum::{routing::get, Router};
use chrono::{DateTime, Utc};
use punchclock_users::UserRegistry;
use std::sync::Arc;

/// Shared state handed to the HTTP handlers as `Arc<AppState>`.
pub struct AppState {
    pub started_at: DateTime<Utc>,
    pub registry: Arc<UserRegistry>,
}

impl AppState {
    pub fn new(registry: Arc<UserRegistry>) -> Self {
        Self {
            started_at: Utc::now(),
            registry,
        }
    }
}

/// Assemble the Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(crate::http::health::banner_handler))
        .route("/health", get(crate::http::health::health_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
