//! Lock resolution: the engine, its three policies, and the expiry reaper.
//!
//! - [`engine::LockEngine`] owns per-key holder/waiter state and the FIFO
//!   hand-off
//! - [`SimpleLockResolver`], [`ReentrantLockResolver`] and
//!   [`TimeoutLockResolver`] map engine outcomes to [`Response`]s
//! - [`delay::DelayQueue`] and [`reaper`] expire timed locks

pub mod delay;
pub mod engine;
pub mod reaper;
pub mod reentrant;
pub mod simple;
pub mod timeout;

pub use delay::{DelayQueue, DelayRecord};
pub use engine::{Admission, Grant, GrantId, KeyStatus, LockEngine, Release, Revoked};
pub use reentrant::ReentrantLockResolver;
pub use simple::SimpleLockResolver;
pub use timeout::TimeoutLockResolver;

use std::future::Future;

use tokio_util::sync::CancellationToken;

use easylock_core::{Cause, LockKind, Operation, Request, Response};

/// Failure of a blocking wait. Everything else is a [`Response`].
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// The wait was cancelled, usually because the server is shutting down.
    #[error("wait for lock '{key}' was cancelled")]
    Cancelled { key: String },

    /// The permission channel closed without a grant.
    #[error("lock '{key}' was torn down while waiting")]
    Abandoned { key: String },
}

/// Request handling contract shared by all lock kinds.
pub trait LockResolver: Send + Sync {
    fn engine(&self) -> &LockEngine;

    /// Cause reported when a release comes from someone who is not the holder.
    fn stale_release_cause(&self) -> Cause {
        Cause::NotHeld
    }

    fn kind(&self) -> LockKind {
        self.engine().kind()
    }

    /// Non-blocking: claims a free key or fails with `AlreadyLocked`.
    fn try_lock(&self, request: &Request) -> Response {
        match self.engine().try_acquire(request) {
            Admission::Granted(_) | Admission::Reentered(_) => {
                Response::succeeded(request, Operation::TryLock)
            }
            Admission::Busy { .. } => {
                Response::failed(request, Operation::TryLock, Cause::AlreadyLocked)
            }
        }
    }

    /// Blocking and fair: waits behind earlier callers until handed the key.
    fn lock(
        &self,
        request: Request,
        cancel: &CancellationToken,
    ) -> impl Future<Output = Result<Response, ResolveError>> + Send {
        async move {
            let response = Response::succeeded(&request, Operation::Lock);
            self.engine().acquire(request, cancel).await?;
            Ok(response)
        }
    }

    /// Releases the key if `request` comes from its holder.
    fn unlock(&self, request: &Request) -> Response {
        match self.engine().release(request) {
            Release::Released { .. } | Release::Retained { .. } => {
                Response::succeeded(request, Operation::Unlock)
            }
            Release::NotHeld { holder } => {
                tracing::info!(
                    kind = %self.kind(),
                    key = %request.key,
                    owner = %request.owner,
                    holder = ?holder.map(|h| h.to_string()),
                    "release rejected"
                );
                Response::failed(request, Operation::Unlock, self.stale_release_cause())
            }
        }
    }
}
