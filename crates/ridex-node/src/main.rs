//! RideX node binary.
//!
//! Serves the REST API, the dispatch WebSocket and `/metrics` on a single
//! port until Ctrl+C.

use anyhow::{Context, Result};
use clap::Parser;
use ridex_node::{build_gateway, load_config, open_store, Args};
use ridex_telemetry::{init_telemetry, TelemetryConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut telemetry = TelemetryConfig::from_env();
    telemetry.json_logs |= args.json_logs;
    let _telemetry_guard = init_telemetry(telemetry).context("Failed to initialize telemetry")?;

    let config = load_config(&args, |key| std::env::var(key).ok())?;

    info!("===========================================");
    info!("  RideX Node v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");
    info!(
        addr = %config.http_addr(),
        storage = ?config.storage.backend,
        "Configuration loaded"
    );
    if config.auth.uses_dev_secret() {
        warn!("Using the development token secret; set RIDEX_TOKEN_SECRET in production");
    }

    let store = open_store(&config.storage)?;
    let gateway = build_gateway(config, &store)?;

    gateway
        .run(shutdown_signal())
        .await
        .context("Gateway exited with an error")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl+C; shutting down");
        return;
    }
    info!("Received shutdown signal");
}
