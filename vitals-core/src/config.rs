//! Environment-driven configuration, shared by both binaries. Mirrors the
//! teacher's `ExtConfig::from_env()` pattern (`ferrex-server::main`):
//! required values fail fast with a descriptive error, optional values fall
//! back to documented defaults.

use std::path::PathBuf;

use crate::stream::{DEFAULT_GROUP_NAME, DEFAULT_STREAM_KEY};

#[derive(Debug, Clone)]
pub struct Config {
    /// Location of the idempotency/rate-limit cache.
    pub cache_url: String,
    /// Connection string for the durable store.
    pub store_url: String,
    /// Named stream topic.
    pub stream_key: String,
    /// Consumer group identifier.
    pub group_name: String,
    /// File path to the pre-trained scorer artifact.
    pub model_path: PathBuf,
    /// Ingest bind host (`vitals-ingest` only).
    pub bind_host: String,
    /// Ingest bind port (`vitals-ingest` only).
    pub bind_port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let store_url = std::env::var("STORE_URL")
            .map_err(|_| anyhow::anyhow!("STORE_URL environment variable is required"))?;

        Ok(Self {
            cache_url: std::env::var("CACHE_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
            store_url,
            stream_key: std::env::var("STREAM_KEY").unwrap_or_else(|_| DEFAULT_STREAM_KEY.into()),
            group_name: std::env::var("GROUP_NAME").unwrap_or_else(|_| DEFAULT_GROUP_NAME.into()),
            model_path: std::env::var("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("model.json")),
            bind_host: std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            bind_port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
        })
    }
}
