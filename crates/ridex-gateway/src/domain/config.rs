//! Gateway configuration with validation.
//!
//! Every section carries `#[serde(default)]`, so a TOML file only needs the
//! keys it overrides.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP server configuration (REST, WebSocket and metrics share the port)
    pub http: HttpConfig,
    /// WebSocket relay configuration
    pub websocket: WebSocketConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
    /// Request limits
    pub limits: LimitsConfig,
    /// Token and password settings
    pub auth: AuthConfig,
    /// Document store backend
    pub storage: StorageConfig,
}

impl GatewayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        if self.rate_limit.requests_per_second == 0 || self.rate_limit.writes_per_second == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "requests_per_second and writes_per_second cannot be 0".into(),
            ));
        }

        if self.websocket.frames_per_second == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "websocket frames_per_second cannot be 0".into(),
            ));
        }

        if self.websocket.queue_size == 0 {
            return Err(ConfigError::InvalidLimit("websocket queue_size cannot be 0".into()));
        }

        if self.websocket.max_frame_bytes == 0 || self.limits.max_body_bytes == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_frame_bytes and max_body_bytes cannot be 0".into(),
            ));
        }

        if self.limits.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidLimit(
                "request_timeout_secs cannot be 0".into(),
            ));
        }

        if self.auth.token_secret.trim().is_empty() {
            return Err(ConfigError::MissingSecret);
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }

    /// Overlay environment variables on top of the current values.
    ///
    /// `lookup` is `std::env::var` in the binary and a map in tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.http.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv("PORT".into(), port.clone()))?;
        }
        if let Some(secret) = lookup("RIDEX_TOKEN_SECRET") {
            self.auth.token_secret = secret;
        }
        if let Some(dir) = lookup("RIDEX_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(origins) = lookup("RIDEX_CORS_ORIGIN") {
            self.cors.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(backend) = lookup("RIDEX_STORAGE") {
            self.storage.backend = backend.parse()?;
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 5000)
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 5000,
        }
    }
}

/// WebSocket relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSocketConfig {
    /// Outbound frames buffered per socket before new frames are dropped
    pub queue_size: usize,
    /// Largest inbound frame accepted, in bytes
    pub max_frame_bytes: usize,
    /// Inbound frames per second per connection
    pub frames_per_second: u32,
    /// Close connections idle for this long
    pub idle_timeout_secs: u64,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            queue_size: 256,
            max_frame_bytes: 64 * 1024,
            frames_per_second: 50,
            idle_timeout_secs: 300,
        }
    }
}

impl WebSocketConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Enable CORS
    pub enabled: bool,
    /// Allowed origins ("*" for all)
    pub allowed_origins: Vec<String>,
    /// Allowed methods
    pub allowed_methods: Vec<String>,
    /// Allowed headers
    pub allowed_headers: Vec<String>,
    /// Max age for preflight cache
    pub max_age: u64,
    /// Allow credentials
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: vec!["http://localhost:5173".to_string()],
            allowed_methods: ["GET", "POST", "PUT", "PATCH", "OPTIONS"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allowed_headers: vec!["Content-Type".to_string(), "Authorization".to_string()],
            max_age: 86400, // 24 hours
            allow_credentials: true,
        }
    }
}

/// Per-IP rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    pub enabled: bool,
    /// Read (GET/HEAD) requests per second per IP
    pub requests_per_second: u32,
    /// Write requests per second per IP
    pub writes_per_second: u32,
    /// Burst allowance for reads; writes get a tenth of it
    pub burst_size: u32,
    /// IPs exempt from rate limiting
    pub whitelist: Vec<IpAddr>,
    /// Key buckets on `X-Forwarded-For` / `X-Real-IP`. Only enable behind a
    /// reverse proxy that overwrites these headers.
    pub trust_proxy_headers: bool,
    /// Buckets idle for this long are evicted
    pub bucket_idle_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 50,
            writes_per_second: 10,
            burst_size: 100,
            whitelist: Vec::new(),
            trust_proxy_headers: false,
            bucket_idle_secs: 600,
        }
    }
}

/// Request limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Max request body size in bytes (default: 1MB)
    pub max_body_bytes: usize,
    /// Requests running longer than this get 408
    pub request_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024,
            request_timeout_secs: 30,
        }
    }
}

impl LimitsConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Development secret. Deployments set `RIDEX_TOKEN_SECRET`.
pub const DEV_TOKEN_SECRET: &str = "ridex-development-secret";

/// Token and password settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC key for bearer tokens
    pub token_secret: String,
    /// Token lifetime in seconds (default: 7 days)
    pub token_ttl_secs: u64,
    /// Password hashing work factor
    pub password_iterations: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: DEV_TOKEN_SECRET.to_string(),
            token_ttl_secs: 7 * 24 * 3600,
            password_iterations: ridex_core::auth::DEFAULT_ITERATIONS,
        }
    }
}

impl AuthConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.token_secret == DEV_TOKEN_SECRET
    }
}

/// Which key-value engine backs the document store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Rocksdb,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "rocksdb" => Ok(StorageBackend::Rocksdb),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Data directory for persistent backends
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            data_dir: PathBuf::from("./data"),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Port 0 would bind an ephemeral port
    #[error("http port cannot be 0")]
    InvalidPort,

    /// Invalid rate limiting configuration
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),

    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),

    #[error("token secret cannot be empty")]
    MissingSecret,

    #[error("unknown storage backend: {0}")]
    UnknownBackend(String),

    /// Environment variable with an unparsable value
    #[error("invalid value for {0}: {1}")]
    InvalidEnv(String, String),
}
