//! Lock operation handlers.

use axum::extract::State;
use axum::Json;

use easylock_core::{Request, Response};

use crate::error::ApiError;
use crate::schema::locks::{LockStatusResponse, LockStatusView};
use crate::state::AppState;

/// `POST /locks/try-lock`
pub async fn try_lock(
    State(state): State<AppState>,
    Json(req): Json<Request>,
) -> Result<Json<Response>, ApiError> {
    req.validate_acquire()?;
    Ok(Json(state.service.try_lock(&req)))
}

/// `POST /locks/lock`
///
/// Blocks until the key is handed to this caller. If the client goes away
/// the handler future is dropped and the caller leaves the queue.
pub async fn lock(
    State(state): State<AppState>,
    Json(req): Json<Request>,
) -> Result<Json<Response>, ApiError> {
    req.validate_acquire()?;
    let response = state.service.lock(req).await?;
    Ok(Json(response))
}

/// `POST /locks/unlock`
pub async fn unlock(
    State(state): State<AppState>,
    Json(req): Json<Request>,
) -> Result<Json<Response>, ApiError> {
    req.validate()?;
    Ok(Json(state.service.unlock(&req)))
}

/// `GET /locks`
pub async fn lock_status(State(state): State<AppState>) -> Json<LockStatusResponse> {
    let locks = state
        .service
        .status()
        .into_iter()
        .map(|(kind, entry)| LockStatusView {
            kind,
            key: entry.key,
            application: entry.owner.application,
            thread: entry.owner.thread,
            holds: entry.holds,
            waiting: entry.waiting,
            held_for_ms: entry.held_for.as_millis() as u64,
            expires_in_ms: entry.expires_in.map(|d| d.as_millis() as u64),
        })
        .collect();

    Json(LockStatusResponse { locks })
}
