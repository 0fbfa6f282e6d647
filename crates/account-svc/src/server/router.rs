//! Axum router construction.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState) -> Router {
    let api = Router::new()
        .route("/createBankAccount", post(handlers::create_account))
        .route("/accounts", get(handlers::list_accounts))
        .route("/accounts/orphans", get(handlers::orphaned_accounts))
        .route("/decrypt", post(handlers::decrypt));

    Router::new()
        .nest("/api", api)
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state)
}
