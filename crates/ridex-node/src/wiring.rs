//! Assemble the store, event bus and services into a gateway.

use anyhow::{Context, Result};
use ridex_bus::{EventPublisher, InMemoryEventBus};
use ridex_core::{AccountService, RideService, TokenSigner};
use ridex_gateway::domain::config::StorageConfig;
use ridex_gateway::{GatewayConfig, GatewayService, StorageBackend};
use ridex_store::DocumentStore;
use std::sync::Arc;
use tracing::info;

/// Open the configured document store.
pub fn open_store(config: &StorageConfig) -> Result<DocumentStore> {
    match config.backend {
        StorageBackend::Memory => {
            info!("Using in-memory document store");
            Ok(DocumentStore::in_memory())
        }
        StorageBackend::Rocksdb => open_rocksdb(config),
    }
}

#[cfg(feature = "rocksdb")]
fn open_rocksdb(config: &StorageConfig) -> Result<DocumentStore> {
    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!("Failed to create data directory {}", config.data_dir.display())
    })?;
    let kv = ridex_store::RocksDbStore::open_default(&config.data_dir)
        .with_context(|| format!("Failed to open RocksDB at {}", config.data_dir.display()))?;
    info!(path = %config.data_dir.display(), "Using RocksDB document store");
    Ok(DocumentStore::new(kv))
}

#[cfg(not(feature = "rocksdb"))]
fn open_rocksdb(_config: &StorageConfig) -> Result<DocumentStore> {
    anyhow::bail!("rocksdb storage requested but ridex-node was built without the `rocksdb` feature")
}

/// Build the gateway and every service behind it.
pub fn build_gateway(config: GatewayConfig, store: &DocumentStore) -> Result<GatewayService> {
    let bus = Arc::new(InMemoryEventBus::new());
    let publisher: Arc<dyn EventPublisher> = bus.clone();

    let signer = TokenSigner::new(config.auth.token_secret.as_bytes(), config.auth.token_ttl());
    let accounts = AccountService::new(store, signer, Arc::clone(&publisher))
        .with_password_iterations(config.auth.password_iterations);
    let rides = RideService::new(store, publisher);

    GatewayService::new(config, accounts, rides, &bus).context("Failed to build gateway")
}
