//! # RideX Telemetry
//!
//! Log initialisation and the process-wide Prometheus registry.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ridex_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RIDEX_LOG_LEVEL` | `info` | Log filter (falls back to `RUST_LOG`) |
//! | `RIDEX_JSON_LOGS` | `false` | JSON log lines instead of pretty output |
//! | `RIDEX_CONSOLE_OUTPUT` | `true` | Write logs to stdout at all |

mod config;
pub mod metrics;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use metrics::{
    encode_metrics, register_metrics, HTTP_REQUESTS, HTTP_REQUEST_DURATION, RIDES_ACCEPTED,
    RIDES_REQUESTED, RIDE_ACCEPT_CONFLICTS, WS_CONNECTIONS, WS_FRAMES_DROPPED, WS_FRAMES_RELAYED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracerInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Initialize logging and register metrics.
///
/// Hold the returned guard for the lifetime of the process.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    register_metrics()?;
    tracing_setup::init_tracing(&config)?;

    Ok(TelemetryGuard {
        service_name: config.service_name,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    service_name: String,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!(service = %self.service_name, "Shutting down telemetry");
    }
}
