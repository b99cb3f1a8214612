//! Router assembly for the easylock HTTP API.
//!
//! [`build_router`] wires the handler functions to their routes with CORS and
//! tracing middleware layers.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Builds the complete axum router.
///
/// TraceLayer provides request-level logging via tracing.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/locks", get(handlers::locks::lock_status))
        .route("/locks/try-lock", post(handlers::locks::try_lock))
        .route("/locks/lock", post(handlers::locks::lock))
        .route("/locks/unlock", post(handlers::locks::unlock))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
