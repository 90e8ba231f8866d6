//! Worker configuration loaded from the environment.
//!
//! Missing cipher key material is a hard startup error: a worker that cannot
//! decrypt payloads must not consume jobs.

use std::env;

/// A required environment variable was absent or unusable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}

/// Process-level configuration for the automation worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Postgres connection string.
    pub database_url: String,
    /// Redis connection string for the message topics.
    pub redis_url: String,
    /// Base URL of the WebDriver endpoint driving the browser.
    pub webdriver_url: String,
    /// Root directory for screenshot/markup evidence files.
    pub evidence_dir: String,
    /// Base64-encoded 32-byte AES key for the payload cipher.
    pub payload_key: String,
    /// Base64-encoded 12-byte nonce for the payload cipher.
    pub payload_nonce: String,
}

impl WorkerConfig {
    /// Read configuration from environment variables.
    ///
    /// `DATABASE_URL`, `PAYLOAD_KEY` and `PAYLOAD_NONCE` are required; the
    /// transport, browser, and evidence settings fall back to deployment
    /// defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            database_url: require("DATABASE_URL")?,
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://redis:6379".into()),
            webdriver_url: env::var("WEBDRIVER_URL")
                .unwrap_or_else(|_| "http://localhost:4444".into()),
            evidence_dir: env::var("EVIDENCE_DIR").unwrap_or_else(|_| "/data".into()),
            payload_key: require("PAYLOAD_KEY")?,
            payload_nonce: require("PAYLOAD_NONCE")?,
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}
