//! # quartier-server
//!
//! Backend node for the Quartier local-experiences marketplace.
//!
//! This binary provides:
//! - **REST API** (axum) for stories, geo-located listings, and the
//!   cleanup entry point used by an external scheduler
//! - **Realtime channels** over WebSocket (presence tracking and typing
//!   broadcasts), served by the in-process hub
//! - **Scheduled story cleanup** that sweeps expired, non-highlighted
//!   stories out of the database
//! - **Per-IP request throttling** to protect against abuse

mod api;
mod config;
mod error;
mod jobs;
mod throttle;
mod ws;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use quartier_realtime::spawn_hub;
use quartier_store::Database;

use crate::api::AppState;
use crate::config::ServerConfig;
use crate::throttle::Throttle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,quartier_server=debug")),
        )
        .init();

    info!("Starting Quartier server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    let database = match config.db_path {
        Some(ref path) => Database::open_at(path)?,
        None => Database::new()?,
    };
    let db = Arc::new(Mutex::new(database));

    // Realtime hub for presence and typing channels
    let hub = spawn_hub();

    // Per-IP request throttle
    let throttle = Throttle::new(config.requests_per_minute);

    let state = AppState {
        db: db.clone(),
        hub,
        throttle: throttle.clone(),
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic story cleanup (the external scheduler can also trigger it
    // through POST /internal/cleanup)
    jobs::spawn_cleanup_task(db, config.cleanup_interval_secs);

    // Periodic throttle-window purge (every 5 minutes)
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            throttle.purge_idle().await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
