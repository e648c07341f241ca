use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

pub mod health;
pub mod home;
pub mod metrics;
pub mod webhook;

/// Webhook bodies are small JSON documents; anything larger is refused.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Application routes. `/metrics` is mounted separately in `main` because it
/// carries its own state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health::health_check))
        .route("/callback", post(webhook::callback))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
}
