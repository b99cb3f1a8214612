//! Protocol types shared by the easylock server and its clients.

pub mod error;
pub mod kind;
pub mod request;
pub mod response;

pub use error::RequestError;
pub use kind::{LockDuration, LockKind, TimeUnit};
pub use request::{Owner, Request};
pub use response::{Cause, Operation, Response};
