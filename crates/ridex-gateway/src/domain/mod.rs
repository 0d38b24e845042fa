//! Gateway domain: configuration and error types.

pub mod config;
pub mod error;

pub use config::{
    AuthConfig, ConfigError, CorsConfig, GatewayConfig, HttpConfig, LimitsConfig,
    RateLimitConfig, StorageBackend, StorageConfig, WebSocketConfig,
};
pub use error::{ApiError, ApiResult, GatewayError};
