//! Schema types for the lock status and health endpoints.
//!
//! Lock operations themselves exchange [`easylock_core::Request`] and
//! [`easylock_core::Response`] directly.

use serde::{Deserialize, Serialize};

use easylock_core::LockKind;

/// Response showing every currently held key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockStatusResponse {
    pub locks: Vec<LockStatusView>,
}

/// View of a single held key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockStatusView {
    pub kind: LockKind,
    pub key: String,
    pub application: String,
    pub thread: String,
    /// Hold count (above 1 only for reentrant locks).
    pub holds: u32,
    /// Callers blocked waiting for this key.
    pub waiting: usize,
    pub held_for_ms: u64,
    /// Time left before the server reclaims a timeout lock.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub held_locks: usize,
    pub pending_expiries: usize,
}
