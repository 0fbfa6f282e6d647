//! Common types, protocol definitions, and errors shared across the `account-svc` workspace.

pub mod error;
pub mod protocol;

pub use error::ServiceError;
