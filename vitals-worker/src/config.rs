//! CLI overlay on `vitals_core::config::Config`, mirroring the
//! `vitals-ingest` split of the same teacher-derived pattern.

use std::path::PathBuf;

use clap::Parser;
use vitals_core::config::Config;

#[derive(Parser, Debug)]
#[command(name = "vitals-worker")]
#[command(about = "Stream consumer for the vitals pipeline")]
pub struct Args {
    /// Durable store connection string (overrides STORE_URL).
    #[arg(long, env = "STORE_URL")]
    pub store_url: Option<String>,

    /// Cache/stream connection string (overrides CACHE_URL).
    #[arg(long, env = "CACHE_URL")]
    pub cache_url: Option<String>,

    /// Named stream topic (overrides STREAM_KEY).
    #[arg(long, env = "STREAM_KEY")]
    pub stream_key: Option<String>,

    /// Consumer group identifier (overrides GROUP_NAME).
    #[arg(long, env = "GROUP_NAME")]
    pub group_name: Option<String>,

    /// Path to the pre-trained scorer artifact (overrides MODEL_PATH).
    #[arg(long, env = "MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    /// Consumer name for this process. Defaults to `worker-<uuid>` so
    /// concurrent processes never collide (spec §4.11).
    #[arg(long, env = "CONSUMER_NAME")]
    pub consumer_name: Option<String>,
}

impl Args {
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(store_url) = &self.store_url {
            config.store_url = store_url.clone();
        }
        if let Some(cache_url) = &self.cache_url {
            config.cache_url = cache_url.clone();
        }
        if let Some(stream_key) = &self.stream_key {
            config.stream_key = stream_key.clone();
        }
        if let Some(group_name) = &self.group_name {
            config.group_name = group_name.clone();
        }
        if let Some(model_path) = &self.model_path {
            config.model_path = model_path.clone();
        }
        config
    }
}
