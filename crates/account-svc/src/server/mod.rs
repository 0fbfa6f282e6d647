//! Axum HTTP server, routing, and middleware.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Inject shared application state (`AppState`) into handlers.
//! - Map domain errors onto status codes and `{code, message}` bodies.

pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
