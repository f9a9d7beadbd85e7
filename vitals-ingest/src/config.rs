//! CLI argument overlay on top of `vitals_core::config::Config`, mirroring
//! the teacher's `Args`/`ExtConfig::from_env()` split in
//! `ferrex-server::main` (CLI flags override environment-derived defaults).

use clap::Parser;
use vitals_core::config::Config;

#[derive(Parser, Debug)]
#[command(name = "vitals-ingest")]
#[command(about = "Ingestion front-end for the vitals pipeline")]
pub struct Args {
    /// Bind port (overrides SERVER_PORT).
    #[arg(short, long, env = "SERVER_PORT")]
    pub port: Option<u16>,

    /// Bind host (overrides SERVER_HOST).
    #[arg(long, env = "SERVER_HOST")]
    pub host: Option<String>,

    /// Durable store connection string (overrides STORE_URL).
    #[arg(long, env = "STORE_URL")]
    pub store_url: Option<String>,

    /// Cache connection string (overrides CACHE_URL).
    #[arg(long, env = "CACHE_URL")]
    pub cache_url: Option<String>,
}

impl Args {
    pub fn apply(&self, mut config: Config) -> Config {
        if let Some(port) = self.port {
            config.bind_port = port;
        }
        if let Some(host) = &self.host {
            config.bind_host = host.clone();
        }
        if let Some(store_url) = &self.store_url {
            config.store_url = store_url.clone();
        }
        if let Some(cache_url) = &self.cache_url {
            config.cache_url = cache_url.clone();
        }
        config
    }
}
