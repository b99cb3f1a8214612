//! Request validation errors.
//!
//! These are raised before a request reaches any resolver. Contention
//! outcomes are reported through [`crate::Response`] instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RequestError {
    /// The lock key is empty or whitespace.
    #[error("lock key should not be empty")]
    EmptyLockKey,

    /// A timeout lock was requested without a hold duration.
    #[error("timeout lock '{key}' requires a duration")]
    MissingDuration { key: String },
}
