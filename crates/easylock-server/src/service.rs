//! LockService: the dispatch front between HTTP handlers and the resolvers.
//!
//! Owns one resolver per [`LockKind`] and routes each request by its kind.
//! Handlers stay thin wrappers around these methods.

use tokio_util::sync::CancellationToken;

use easylock_core::{LockKind, Request, Response};

use crate::resolver::{
    KeyStatus, LockResolver, ReentrantLockResolver, ResolveError, SimpleLockResolver,
    TimeoutLockResolver,
};

pub struct LockService {
    simple: SimpleLockResolver,
    reentrant: ReentrantLockResolver,
    timeout: TimeoutLockResolver,
    shutdown: CancellationToken,
}

impl LockService {
    /// Builds the resolvers and starts the timeout reaper. Blocked `lock`
    /// calls are cancelled when `shutdown` fires.
    pub fn start(shutdown: CancellationToken) -> Self {
        LockService {
            simple: SimpleLockResolver::new(),
            reentrant: ReentrantLockResolver::new(),
            timeout: TimeoutLockResolver::start(&shutdown),
            shutdown,
        }
    }

    pub fn simple(&self) -> &SimpleLockResolver {
        &self.simple
    }

    pub fn reentrant(&self) -> &ReentrantLockResolver {
        &self.reentrant
    }

    pub fn timeout(&self) -> &TimeoutLockResolver {
        &self.timeout
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    pub fn try_lock(&self, request: &Request) -> Response {
        match request.kind {
            LockKind::Simple => self.simple.try_lock(request),
            LockKind::Reentrant => self.reentrant.try_lock(request),
            LockKind::Timeout => self.timeout.try_lock(request),
        }
    }

    pub async fn lock(&self, request: Request) -> Result<Response, ResolveError> {
        match request.kind {
            LockKind::Simple => self.simple.lock(request, &self.shutdown).await,
            LockKind::Reentrant => self.reentrant.lock(request, &self.shutdown).await,
            LockKind::Timeout => self.timeout.lock(request, &self.shutdown).await,
        }
    }

    pub fn unlock(&self, request: &Request) -> Response {
        match request.kind {
            LockKind::Simple => self.simple.unlock(request),
            LockKind::Reentrant => self.reentrant.unlock(request),
            LockKind::Timeout => self.timeout.unlock(request),
        }
    }

    /// Held keys across all kinds, ordered by kind then key.
    pub fn status(&self) -> Vec<(LockKind, KeyStatus)> {
        let mut held = Vec::new();
        for kind in LockKind::ALL {
            let engine = match kind {
                LockKind::Simple => self.simple.engine(),
                LockKind::Reentrant => self.reentrant.engine(),
                LockKind::Timeout => self.timeout.engine(),
            };
            held.extend(engine.snapshot().into_iter().map(|status| (kind, status)));
        }
        held
    }
}
