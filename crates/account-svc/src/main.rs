//! `account-svc` binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (JSON logs, optional OTLP spans).
//! 3. Decode the field-encryption key and build the [`FieldCipher`].
//! 4. Open the account store.
//! 5. Build the Axum router and start the HTTP server.

mod config;
mod crypto;
mod provision;
mod retrieval;
mod server;
mod store;
mod telemetry;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use config::Config;
use crypto::FieldCipher;
use server::state::AppState;
use store::MemoryStore;

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cfg.port,
        max_allocation_attempts = cfg.max_allocation_attempts,
        "account-svc starting"
    );

    // -----------------------------------------------------------------------
    // 3. Field cipher
    // -----------------------------------------------------------------------
    let cipher = {
        let key = cfg.field_key()?;
        Arc::new(FieldCipher::new(&key))
    };

    // -----------------------------------------------------------------------
    // 4. Store
    // -----------------------------------------------------------------------
    let store = Arc::new(MemoryStore::new());

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let state = AppState::new(store, cipher, cfg.max_allocation_attempts);
    let router = server::router::build(state);

    let addr: std::net::SocketAddr = ([0, 0, 0, 0], cfg.port).into();
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
