//! Liveness handler.

use axum::extract::State;
use axum::Json;

use crate::schema::locks::HealthResponse;
use crate::state::AppState;

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.service.timeout().reaper_running() {
        "ok"
    } else {
        "degraded"
    };
    Json(HealthResponse {
        status: status.to_string(),
        held_locks: state.service.status().len(),
        pending_expiries: state.service.timeout().pending_expiries(),
    })
}
