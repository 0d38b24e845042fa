//! Command line and layered configuration.
//!
//! Precedence, lowest to highest: built-in defaults, the TOML file given by
//! `--config`, environment variables, command line flags.

use anyhow::{Context, Result};
use clap::Parser;
use ridex_gateway::{GatewayConfig, StorageBackend};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "ridex-node")]
#[command(version, about = "RideX ride-hailing backend: REST API and real-time dispatch relay")]
pub struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Bind address
    #[arg(long)]
    pub host: Option<IpAddr>,

    /// HTTP port (REST, WebSocket and metrics)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Storage backend: memory or rocksdb
    #[arg(long)]
    pub storage: Option<StorageBackend>,

    /// Data directory for the rocksdb backend
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Allowed CORS origin (repeatable)
    #[arg(long = "cors-origin")]
    pub cors_origins: Vec<String>,

    /// Emit JSON log lines
    #[arg(long)]
    pub json_logs: bool,
}

/// Read a TOML config file. Missing keys keep their defaults.
pub fn read_config_file(path: &Path) -> Result<GatewayConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("Invalid config file {}", path.display()))
}

/// Resolve the final configuration from every source.
pub fn load_config<F>(args: &Args, env: F) -> Result<GatewayConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match &args.config {
        Some(path) => read_config_file(path)?,
        None => GatewayConfig::default(),
    };

    config
        .apply_env(env)
        .context("Invalid environment configuration")?;

    if let Some(host) = args.host {
        config.http.host = host;
    }
    if let Some(port) = args.port {
        config.http.port = port;
    }
    if let Some(backend) = args.storage {
        config.storage.backend = backend;
    }
    if let Some(dir) = &args.data_dir {
        config.storage.data_dir = dir.clone();
    }
    if !args.cors_origins.is_empty() {
        config.cors.allowed_origins = args.cors_origins.clone();
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}
