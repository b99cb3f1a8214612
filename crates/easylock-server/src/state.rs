//! Application state shared by the axum handlers.
//!
//! [`AppState`] holds the [`LockService`] behind an `Arc`. The service needs
//! no outer mutex: every resolver synchronizes per key internally, so
//! handlers for different keys never contend.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::service::LockService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LockService>,
}

impl AppState {
    /// Creates the lock service and starts its reaper on the current tokio
    /// runtime. Cancelling `shutdown` stops the reaper and fails every
    /// blocked `lock` call.
    pub fn new(shutdown: CancellationToken) -> Self {
        AppState {
            service: Arc::new(LockService::start(shutdown)),
        }
    }
}
