//! Dispatch server binary.
//!
//! Wires together the state store, the location ticker, and the command
//! gateway, then serves until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `dispatch-config.yaml` (defaults if absent)
//! 3. Create the state store from the configured or built-in fleet
//! 4. Start the location ticker, if enabled
//! 5. Serve the REST API and fleet stream until shutdown

mod error;

use std::path::Path;
use std::sync::Arc;

use dispatch_api::{AppState, start_server};
use dispatch_core::{DispatchConfig, LocationTicker, StateStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Configuration file looked up in the working directory.
const CONFIG_PATH: &str = "dispatch-config.yaml";

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("dispatch-server starting");

    // 2. Load configuration.
    let config = load_config()?;
    info!(
        host = %config.server.host,
        port = config.server.port,
        category_policy = ?config.assignment.category_policy,
        broadcast_mode = ?config.broadcast.mode,
        "Configuration loaded"
    );

    // 3. Create the store.
    let store = Arc::new(StateStore::from_config(&config));

    // 4. Location ticker.
    let ticker = config
        .tracker
        .enabled
        .then(|| LocationTicker::new(Arc::clone(&store), config.tracker.clone()).spawn());

    // 5. Serve.
    let state = Arc::new(AppState::new(store, config.assignment.clone()));
    let result = start_server(&config.server, state, shutdown_signal()).await;

    if let Some(ticker) = ticker {
        ticker.abort();
    }
    result?;

    info!("dispatch-server stopped");
    Ok(())
}

/// Load `dispatch-config.yaml`, or defaults (with env overrides) when the
/// file is absent.
fn load_config() -> Result<DispatchConfig, AppError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok(DispatchConfig::from_file(config_path)?)
    } else {
        info!("Config file not found, using defaults");
        Ok(DispatchConfig::parse("")?)
    }
}

/// Resolve on `Ctrl-C`.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C, serving until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
