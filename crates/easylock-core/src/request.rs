//! Lock requests and owner identity.
//!
//! The durable "who owns it" token is the [`Owner`], the pair of the client's
//! application name and thread name. The numeric `identity` on a [`Request`]
//! is a transient per-attempt counter echoed back in the response; it is never
//! used to authorize a release.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::RequestError;
use crate::kind::{LockDuration, LockKind};

/// The logical owner of a lock: an (application, thread) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
    pub application: String,
    pub thread: String,
}

impl Owner {
    pub fn new(application: impl Into<String>, thread: impl Into<String>) -> Self {
        Owner {
            application: application.into(),
            thread: thread.into(),
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.application, self.thread)
    }
}

/// A single TryLock, Lock or Unlock attempt on one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub key: String,
    /// Requester-side attempt counter, echoed in the response.
    pub identity: i32,
    #[serde(flatten)]
    pub owner: Owner,
    pub kind: LockKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<LockDuration>,
    /// Milliseconds since the Unix epoch at which the client issued the request.
    #[serde(default)]
    pub issued_at: u64,
}

impl Request {
    pub fn new(key: impl Into<String>, identity: i32, owner: Owner, kind: LockKind) -> Self {
        let issued_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        Request {
            key: key.into(),
            identity,
            owner,
            kind,
            duration: None,
            issued_at,
        }
    }

    /// Sets the hold duration of a timed lock.
    pub fn with_duration(mut self, duration: LockDuration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Returns `true` if both requests come from the same owner.
    pub fn same_owner(&self, other: &Request) -> bool {
        self.owner == other.owner
    }

    /// How long a grant for this request may live before it expires.
    pub fn lease(&self) -> Duration {
        self.duration.map(|d| d.to_std()).unwrap_or(Duration::ZERO)
    }

    /// Rejects requests that must never reach a resolver.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.key.trim().is_empty() {
            return Err(RequestError::EmptyLockKey);
        }
        Ok(())
    }

    /// Validation for TryLock and Lock. A timed lock needs its duration up
    /// front; an unlock never reads it.
    pub fn validate_acquire(&self) -> Result<(), RequestError> {
        self.validate()?;
        if self.kind == LockKind::Timeout && self.duration.is_none() {
            return Err(RequestError::MissingDuration {
                key: self.key.clone(),
            });
        }
        Ok(())
    }
}
