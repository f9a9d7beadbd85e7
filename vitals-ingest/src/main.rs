//! Ingestion front-end binary (C1–C6): validation, rate limiting,
//! idempotency filtering, durable commit, and stream handoff.

mod config;
mod error;
mod handlers;
mod middleware;
mod state;

use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use vitals_core::cache::Cache;
use vitals_core::config::Config;
use vitals_core::stream::Stream;
use vitals_core::store::Store;

use crate::config::Args;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "vitals_ingest=info,vitals_core=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = args.apply(Config::from_env()?);

    info!("connecting to durable store");
    let store = Store::connect(&config.store_url).await?;
    store.migrate().await?;

    info!("connecting to cache");
    let cache = Cache::connect(&config.cache_url).await?;

    info!("connecting to stream at {}", config.stream_key);
    let stream = Stream::connect(&config.cache_url, config.stream_key.clone()).await?;

    let state = AppState {
        store,
        cache,
        stream,
    };

    let app = Router::new()
        .route("/vitals", post(handlers::ingest_handler))
        .route("/health", get(handlers::health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(middleware::request_context))
        .with_state(state);

    let addr = format!("{}:{}", config.bind_host, config.bind_port);
    info!("starting vitals-ingest on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Drains in-flight requests on SIGINT/SIGTERM before the process exits
/// (spec §5: "ingest side drains in-flight requests, then closes the
/// stream and cache handles").
async fn shutdown_signal() {
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

    tracing::info!("shutdown signal received, draining in-flight requests");
}
