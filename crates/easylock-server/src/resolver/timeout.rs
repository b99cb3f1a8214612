//! Locks that expire on their own.
//!
//! Every grant, fresh or handed off, schedules a delay record for
//! `now + request duration`. A dedicated reaper task revokes the grant when
//! the record comes due, unless the key was released or re-granted first.
//! Releases that arrive after expiry report `LockExpired`.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use easylock_core::{Cause, LockKind};

use super::delay::DelayQueue;
use super::engine::LockEngine;
use super::{reaper, LockResolver};

pub struct TimeoutLockResolver {
    engine: Arc<LockEngine>,
    queue: Arc<DelayQueue>,
    shutdown: CancellationToken,
    reaper: JoinHandle<()>,
}

impl TimeoutLockResolver {
    /// Creates the resolver and spawns its reaper on the current tokio
    /// runtime. The reaper stops when `shutdown` is cancelled or the
    /// resolver is dropped.
    pub fn start(shutdown: &CancellationToken) -> Self {
        let queue = Arc::new(DelayQueue::new());
        let engine = Arc::new(LockEngine::new(LockKind::Timeout).with_expiry(Arc::clone(&queue)));
        let shutdown = shutdown.child_token();
        let reaper = reaper::spawn(Arc::clone(&engine), Arc::clone(&queue), shutdown.clone());

        TimeoutLockResolver {
            engine,
            queue,
            shutdown,
            reaper,
        }
    }

    /// Delay records not yet consumed, stale ones included.
    pub fn pending_expiries(&self) -> usize {
        self.queue.len()
    }

    pub fn reaper_running(&self) -> bool {
        !self.reaper.is_finished()
    }
}

impl Drop for TimeoutLockResolver {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl LockResolver for TimeoutLockResolver {
    fn engine(&self) -> &LockEngine {
        &self.engine
    }

    fn stale_release_cause(&self) -> Cause {
        Cause::LockExpired
    }
}
