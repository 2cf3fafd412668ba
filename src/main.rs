//! Vault server: multi-tenant node tree with sharing, an event journal,
//! and live push.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, fmt};

use vault_core::config::AppConfig;
use vault_core::error::AppError;
use vault_core::traits::{BlobStore, Publisher};
use vault_database::{DatabasePool, Store};
use vault_realtime::{Hub, WsState, ws_router};
use vault_service::{JournalService, Services};
use vault_storage::LocalBlobStore;

/// Interval between journal retention sweeps.
const RETENTION_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() {
    let env = std::env::var("VAULT_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Vault v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    let db_pool = DatabasePool::connect(&config.database).await?;
    let store: Arc<dyn Store> = Arc::new(db_pool.store());

    // ── Step 2: Blob store ───────────────────────────────────────
    let blobs: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(&config.storage.root_path).await?);
    tracing::info!(root = %config.storage.root_path, "Blob store ready");

    // ── Step 3: Notification hub + services ──────────────────────
    let hub = Arc::new(Hub::new(config.realtime.clone()));
    let publisher: Arc<dyn Publisher> = Arc::clone(&hub) as Arc<dyn Publisher>;
    let services = Services::new(Arc::clone(&store), blobs, publisher, &config);

    // ── Step 4: Journal retention sweep ──────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweep_handle = if config.journal.retention_days.is_some() {
        let journal = Arc::clone(&services.journal);
        Some(tokio::spawn(retention_sweep(journal, shutdown_rx.clone())))
    } else {
        tracing::info!("Journal retention disabled");
        None
    };

    // ── Step 5: Build and start HTTP server ──────────────────────
    let ws_state = WsState {
        hub: Arc::clone(&hub),
        verifier: services.verifier.clone(),
        ping_interval: Duration::from_secs(config.realtime.ping_interval_seconds),
    };
    let health_hub = Arc::clone(&hub);
    let app = Router::new()
        .route(
            "/health",
            get(move || {
                let hub = Arc::clone(&health_hub);
                async move {
                    Json(serde_json::json!({
                        "status": "ok",
                        "connected_users": hub.user_count(),
                        "connections": hub.total_connections(),
                    }))
                }
            }),
        )
        .merge(ws_router(ws_state))
        .layer(ServiceBuilder::new().layer(
            // Path only: the push handshake may carry a token in the query.
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        ));

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("Vault server listening on {}", addr);

    // ── Step 6: Graceful shutdown ────────────────────────────────
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });

    server
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    // ── Step 7: Wait for background tasks ────────────────────────
    if let Some(handle) = sweep_handle {
        let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
        let _ = tokio::time::timeout(grace, handle).await;
    }

    tracing::info!("Vault server shut down gracefully");
    Ok(())
}

/// Prune expired journal events until shutdown.
async fn retention_sweep(journal: Arc<JournalService>, mut shutdown: watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(RETENTION_SWEEP_INTERVAL);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = journal.prune_expired().await {
                    tracing::error!(error = %e, "Journal retention sweep failed");
                }
            }
            _ = shutdown.changed() => break,
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
