//! Resolver responses.
//!
//! A [`Response`] is built once per resolved request and never changed
//! afterwards. Contention outcomes ("someone else holds it", "your lock is
//! gone") are ordinary responses with `success == false`, not errors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::request::Request;

/// Which operation produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    TryLock,
    Lock,
    Unlock,
}

impl Operation {
    /// Numeric code used by older clients. Those clients report both
    /// acquisition styles as 1, so TryLock and Lock share it.
    pub fn code(&self) -> u8 {
        match self {
            Operation::TryLock | Operation::Lock => 1,
            Operation::Unlock => 2,
        }
    }
}

/// Why a request succeeded or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cause {
    Succeeded,
    /// The key is held by a different owner.
    AlreadyLocked,
    /// A timed lock expired (and may have moved on) before the release arrived.
    LockExpired,
    /// The releasing owner does not hold the key.
    NotHeld,
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Cause::Succeeded => "succeeded",
            Cause::AlreadyLocked => "lock is held by another owner",
            Cause::LockExpired => "lock expired before it was released",
            Cause::NotHeld => "lock is not held by this owner",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub key: String,
    pub identity: i32,
    pub success: bool,
    pub cause: Cause,
    pub operation: Operation,
}

impl Response {
    pub fn succeeded(request: &Request, operation: Operation) -> Self {
        Response {
            key: request.key.clone(),
            identity: request.identity,
            success: true,
            cause: Cause::Succeeded,
            operation,
        }
    }

    pub fn failed(request: &Request, operation: Operation, cause: Cause) -> Self {
        Response {
            key: request.key.clone(),
            identity: request.identity,
            success: false,
            cause,
            operation,
        }
    }
}
