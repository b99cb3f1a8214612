//! Plain mutual exclusion.

use easylock_core::LockKind;

use super::engine::LockEngine;
use super::LockResolver;

/// Exclusive lock with no re-entrancy: a second acquisition by the holder
/// queues (or fails, for TryLock) like any other owner's.
pub struct SimpleLockResolver {
    engine: LockEngine,
}

impl SimpleLockResolver {
    pub fn new() -> Self {
        SimpleLockResolver {
            engine: LockEngine::new(LockKind::Simple),
        }
    }
}

impl Default for SimpleLockResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl LockResolver for SimpleLockResolver {
    fn engine(&self) -> &LockEngine {
        &self.engine
    }
}
