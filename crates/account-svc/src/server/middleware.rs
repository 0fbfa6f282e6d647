//! Axum middleware settings applied to the router.
//!
//! Request tracing, timeout enforcement, and response compression are layered
//! in [`super::router::build`].

use std::time::Duration;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
