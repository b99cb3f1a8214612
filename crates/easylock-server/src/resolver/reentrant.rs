//! Reentrant locks.
//!
//! The holder may acquire again without blocking; each acquisition bumps a
//! hold count and each unlock drops it. The key is released, and handed to
//! the next waiter, only when the count reaches zero.

use easylock_core::LockKind;

use super::engine::LockEngine;
use super::LockResolver;

pub struct ReentrantLockResolver {
    engine: LockEngine,
}

impl ReentrantLockResolver {
    pub fn new() -> Self {
        ReentrantLockResolver {
            engine: LockEngine::new(LockKind::Reentrant),
        }
    }
}

impl Default for ReentrantLockResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl LockResolver for ReentrantLockResolver {
    fn engine(&self) -> &LockEngine {
        &self.engine
    }
}
