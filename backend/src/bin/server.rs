//! Event log ingestion server binary.
//!
//! # Usage
//!
//! ```bash
//! # Firestore with application-default credentials
//! GOOGLE_APPLICATION_CREDENTIALS=service-account.json cargo run --bin event-log-server
//!
//! # Firestore emulator
//! FIRESTORE_EMULATOR_HOST=localhost:8081 FIRESTORE_PROJECT_ID=demo \
//!   cargo run --bin event-log-server
//!
//! # In-memory store
//! LOG_STORE=local cargo run --bin event-log-server
//! ```
//!
//! # Environment Variables
//!
//! - `HOST`: Server host (default: 0.0.0.0)
//! - `PORT`: Server port (default: 8080)
//! - `CORS_ALLOWED_ORIGINS`: comma-separated origin allow-list
//! - `STORE_CONFIG`: path to a `store.toml` (otherwise `store.toml` is searched, then env)
//! - `LOG_STORE`, `FIRESTORE_*`: see `db::StoreConfig::from_env`
//! - `RUST_LOG`: Log level (default: info)

use std::env;

use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use event_log_ingest::config::ServerConfig;
use event_log_ingest::db::{StoreConfig, StoreFactory};
use event_log_ingest::http::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting event log server");

    let server_config = ServerConfig::from_env().map_err(|e| anyhow::anyhow!(e))?;

    let store_config = StoreConfig::load().unwrap_or_else(|e| {
        warn!("Invalid store configuration: {}. Using defaults.", e);
        StoreConfig::default()
    });

    // Degraded mode instead of exiting when the store is unreachable
    let store = StoreFactory::connect_or_degrade(&store_config).await;
    if store.is_available() {
        info!("Store '{}' initialized successfully", store.name());
    }

    let app = create_router(AppState::new(store.clone()), &server_config.allowed_origins);

    let listener = server_config.bind().await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind {}:{}: {}",
            server_config.host,
            server_config.port,
            e
        )
    })?;
    info!("Event log server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    store.close().await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
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
                warn!("Failed to listen for SIGTERM: {}", e);
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
