//! Stream consumer binary (C7–C12): per-patient windowing, threshold and
//! model-based anomaly detection, classification, and persistence.

mod config;
mod pipeline;
mod worker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use uuid::Uuid;
use vitals_core::config::Config;
use vitals_core::scorer::ModelScorer;
use vitals_core::store::Store;
use vitals_core::stream::Stream;
use vitals_core::windows::WindowStore;

use crate::config::Args;
use crate::worker::Worker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vitals_worker=info,vitals_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = args.apply(Config::from_env()?);

    // Missing or unloadable model is fatal at startup (§4.9) — this must
    // happen before any stream connection so a misconfigured worker never
    // claims pending entries it cannot score.
    info!("loading anomaly scorer from {}", config.model_path.display());
    let scorer = ModelScorer::load(&config.model_path)?;

    info!("connecting to durable store");
    let store = Store::connect(&config.store_url).await?;
    store.migrate().await?;

    info!("connecting to stream at {}", config.stream_key);
    let stream = Stream::connect(&config.cache_url, config.stream_key.clone()).await?;

    let consumer = args.consumer_name.clone().unwrap_or_else(default_consumer_name);
    info!(
        "starting vitals-worker, group={}, consumer={}",
        config.group_name, consumer
    );

    let mut worker = Worker {
        store,
        stream,
        scorer,
        windows: WindowStore::new(),
        group: config.group_name.clone(),
        consumer,
    };

    worker.recover().await?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_writer = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("shutdown signal received");
        shutdown_writer.store(true, Ordering::Relaxed);
    });

    worker.run(shutdown).await?;

    info!("vitals-worker exiting");
    Ok(())
}

/// Default consumer name when `CONSUMER_NAME`/`--consumer-name` is unset —
/// unique per process so concurrent workers never collide (spec §4.11).
fn default_consumer_name() -> String {
    format!("worker-{}", Uuid::new_v4())
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_consumer_names_are_unique_and_prefixed() {
        let a = default_consumer_name();
        let b = default_consumer_name();
        assert!(a.starts_with("worker-"));
        assert_ne!(a, b);
    }
}
