//! Telemetry configuration from environment variables.

use std::env;

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to startup logs.
    pub service_name: String,

    /// Log filter directive (trace, debug, info, warn, error or a full
    /// `EnvFilter` string).
    pub log_level: String,

    pub console_output: bool,

    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "ridex".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

fn truthy(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

impl TelemetryConfig {
    /// Read `RIDEX_LOG_LEVEL` (or `RUST_LOG`), `RIDEX_JSON_LOGS` and
    /// `RIDEX_CONSOLE_OUTPUT`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            service_name: lookup("RIDEX_SERVICE_NAME").unwrap_or(defaults.service_name),
            log_level: lookup("RIDEX_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            console_output: lookup("RIDEX_CONSOLE_OUTPUT")
                .map(|v| truthy(&v))
                .unwrap_or(defaults.console_output),
            json_logs: lookup("RIDEX_JSON_LOGS")
                .map(|v| truthy(&v))
                .unwrap_or(defaults.json_logs),
        }
    }
}
