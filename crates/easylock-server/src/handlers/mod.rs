//! HTTP handler modules for the easylock API.
//!
//! Handlers parse and validate requests, delegate to [`crate::service::LockService`],
//! and return JSON responses. No lock logic lives in handlers.

pub mod health;
pub mod locks;
