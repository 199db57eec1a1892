//! zabava-ledger server entry point.
//!
//! Opens the Redis store and starts the Axum HTTP server. An unreachable
//! Redis does not stop the server: requests answer 503 until it is back.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use zabava_ledger::api;
use zabava_ledger::app_state::AppState;
use zabava_ledger::config::{LedgerConfig, LogFormat};
use zabava_ledger::service::LedgerService;
use zabava_ledger::store::{KeyValueStore, RedisStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = LedgerConfig::from_env().context("loading configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, "starting zabava-ledger");

    // Open the store; the connection is made on first use
    let store = RedisStore::new(&config.redis_url, config.redis_connect_timeout())
        .context("opening redis store")?;
    if let Err(e) = store.ping().await {
        tracing::warn!(error = %e, "redis unreachable at startup, serving 503 until it recovers");
    }

    // Build service layer
    let ledger_service = LedgerService::new(Arc::new(store), config.fetch_concurrency)
        .with_catalog(config.reward_catalog.clone())
        .with_directory_key(config.partner_directory_key.clone());

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(config.request_timeout()))
        .with_state(AppState::new(ledger_service));

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
