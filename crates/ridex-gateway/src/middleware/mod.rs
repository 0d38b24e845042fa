//! Middleware stack for the gateway.
//!
//! Layer order (outermost first):
//! 1. CORS - answers preflights before anything else runs
//! 2. Tracing - span plus request metrics
//! 3. Timeout - 408 after `limits.request_timeout_secs`
//! 4. Rate limiting - per-IP token buckets, 429
//!
//! The body limit is axum's `DefaultBodyLimit`, enforced by the JSON
//! extractor (413 above `limits.max_body_bytes`).

pub mod cors;
pub mod rate_limit;
pub mod timeout;
pub mod tracing;

pub use cors::create_cors_layer;
pub use rate_limit::{cleanup_task, RateLimitLayer, RateLimitState};
pub use timeout::TimeoutLayer;
pub use tracing::TracingLayer;
