use anyhow::Context;
use axum::{routing::get, Router};
use clap::Parser;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vitals::config::Config;
use vitals::db::{self, PgStore};
use vitals::{metrics, rest};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; settings may come from the real environment
    let dotenv_path = dotenv::dotenv().ok();

    // Initialize logging, `info` unless RUST_LOG says otherwise
    tracing_subscriber::fmt()
        .with_env_filter(default_env_filter())
        .init();

    let config = Config::parse();
    match dotenv_path {
        Some(path) => info!("Loaded environment from {}", path.display()),
        None => info!("No .env file found, using process environment"),
    }

    info!("Starting vitals service");

    if let Err(e) = metrics::init_metrics() {
        warn!("Failed to register metrics: {}", e);
    }

    let database_url = config.database_url()?;
    info!(
        "Database: {}",
        database_url.split('@').last().unwrap_or("***")
    );

    let pool = db::make_pool(
        &database_url,
        config.db_max_connections,
        config.acquire_timeout(),
    )
    .await
    .context("failed to initialize database")?;

    let store = PgStore::new(pool.clone());

    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .merge(rest::create_router(Arc::new(store)))
        .layer(TraceLayer::new_for_http());

    let addr = config.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Shutting down, closing database pool");
    pool.close().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}

fn default_env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
