//! Configuration loading and validation for the account service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::crypto::FieldKey;
use crate::provision::allocator::DEFAULT_MAX_ATTEMPTS;

/// Validated service configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// 64 hex characters (32 bytes) of AES-256 key material. **Required.**
    pub encryption_key: String,

    /// Port the HTTP server listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound on account-number candidates probed per allocation.
    #[serde(default = "default_max_allocation_attempts")]
    pub max_allocation_attempts: u32,

    /// OTLP endpoint for span export. Export is disabled when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_port() -> u16 {
    5000
}
fn default_max_allocation_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Decode the configured key.
    ///
    /// # Errors
    ///
    /// Returns an error unless `ENCRYPTION_KEY` is exactly 32 bytes of hex.
    pub fn field_key(&self) -> Result<FieldKey> {
        FieldKey::from_hex(&self.encryption_key).context("ENCRYPTION_KEY is invalid")
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.encryption_key.trim().is_empty() {
            anyhow::bail!("ENCRYPTION_KEY is required and must not be empty");
        }
        self.field_key()?;

        if self.max_allocation_attempts == 0 {
            anyhow::bail!("MAX_ALLOCATION_ATTEMPTS must be > 0");
        }
        if let Some(endpoint) = &self.otel_exporter_otlp_endpoint {
            if endpoint.trim().is_empty() {
                anyhow::bail!("OTEL_EXPORTER_OTLP_ENDPOINT must not be empty when set");
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("encryption_key", &"[REDACTED]")
            .field("port", &self.port)
            .field("max_allocation_attempts", &self.max_allocation_attempts)
            .field("otel_exporter_otlp_endpoint", &self.otel_exporter_otlp_endpoint)
            .field("log_level", &self.log_level)
            .finish()
    }
}
