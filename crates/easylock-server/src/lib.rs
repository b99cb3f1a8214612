//! Central lock server for easylock.
//!
//! Arbitrates lock and unlock requests from remote clients: at most one owner
//! per key, waiters served in arrival order, and timeout locks reclaimed by a
//! background reaper. This crate contains the resolution engine, the
//! dispatch service, and the HTTP/JSON front end.

pub mod config;
pub mod error;
pub mod handlers;
pub mod resolver;
pub mod router;
pub mod schema;
pub mod service;
pub mod state;
