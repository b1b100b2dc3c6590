pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::export::handlers;
use crate::state::AppState;

/// Live page markup with inlined stylesheet text can exceed axum's 2 MB default.
const MAX_EXPORT_BODY_BYTES: usize = 16 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/export",
            post(handlers::handle_export).layer(DefaultBodyLimit::max(MAX_EXPORT_BODY_BYTES)),
        )
        .with_state(state)
}
