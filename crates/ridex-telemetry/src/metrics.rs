//! Prometheus metrics for RideX.
//!
//! All metrics follow the naming convention: `ridex_<area>_<metric>[_unit]`
//!
//! Metric names are compile-time constants, so construction inside
//! `lazy_static!` cannot fail at runtime.

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec,
    IntGauge, Opts, Registry, TextEncoder,
};

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // HTTP
    // =========================================================================

    /// Requests served, by method and status code
    pub static ref HTTP_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("ridex_http_requests_total", "Total HTTP requests served"),
        &["method", "status"]
    ).expect("metric creation failed");

    /// Request latency, by method
    pub static ref HTTP_REQUEST_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "ridex_http_request_duration_seconds",
            "Time spent serving HTTP requests"
        ).buckets(exponential_buckets(0.0005, 2.0, 14).expect("valid buckets")),
        &["method"]
    ).expect("metric creation failed");

    // =========================================================================
    // DISPATCH
    // =========================================================================

    pub static ref RIDES_REQUESTED: IntCounter = IntCounter::new(
        "ridex_rides_requested_total",
        "Total rides requested"
    ).expect("metric creation failed");

    pub static ref RIDES_ACCEPTED: IntCounter = IntCounter::new(
        "ridex_rides_accepted_total",
        "Total rides accepted by a driver"
    ).expect("metric creation failed");

    /// Accept attempts that lost the race or hit an active-ride conflict
    pub static ref RIDE_ACCEPT_CONFLICTS: IntCounter = IntCounter::new(
        "ridex_ride_accept_conflicts_total",
        "Total ride acceptances rejected with a conflict"
    ).expect("metric creation failed");

    // =========================================================================
    // REAL-TIME RELAY
    // =========================================================================

    pub static ref WS_CONNECTIONS: IntGauge = IntGauge::new(
        "ridex_ws_connections",
        "Open WebSocket connections"
    ).expect("metric creation failed");

    pub static ref WS_FRAMES_RELAYED: IntCounter = IntCounter::new(
        "ridex_ws_frames_relayed_total",
        "Frames queued to sockets by room broadcasts"
    ).expect("metric creation failed");

    /// Frames dropped because a socket's outbound queue was full
    pub static ref WS_FRAMES_DROPPED: IntCounter = IntCounter::new(
        "ridex_ws_frames_dropped_total",
        "Frames dropped on full socket queues"
    ).expect("metric creation failed");
}

/// Register every metric with `REGISTRY`. Calling it again is a no-op.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(HTTP_REQUESTS.clone()),
        Box::new(HTTP_REQUEST_DURATION.clone()),
        Box::new(RIDES_REQUESTED.clone()),
        Box::new(RIDES_ACCEPTED.clone()),
        Box::new(RIDE_ACCEPT_CONFLICTS.clone()),
        Box::new(WS_CONNECTIONS.clone()),
        Box::new(WS_FRAMES_RELAYED.clone()),
        Box::new(WS_FRAMES_DROPPED.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    register_metrics()?;
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}
