//! # Document Store
//!
//! Shared handle over a `KeyValueStore` plus the JSON codec the
//! collections use.

use crate::adapters::InMemoryKVStore;
use crate::errors::StoreError;
use crate::ports::outbound::KeyValueStore;
use crate::rides::RideCollection;
use crate::users::UserCollection;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Cloneable handle to the storage engine.
///
/// Collections take the write lock for the whole read-validate-write cycle
/// of a mutation; readers share the read lock.
#[derive(Clone)]
pub struct DocumentStore {
    kv: Arc<RwLock<Box<dyn KeyValueStore>>>,
}

impl DocumentStore {
    pub fn new(kv: impl KeyValueStore + 'static) -> Self {
        Self {
            kv: Arc::new(RwLock::new(Box::new(kv))),
        }
    }

    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(InMemoryKVStore::new())
    }

    pub fn users(&self) -> UserCollection {
        UserCollection::new(self.clone())
    }

    pub fn rides(&self) -> RideCollection {
        RideCollection::new(self.clone())
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Box<dyn KeyValueStore>> {
        self.kv.read()
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Box<dyn KeyValueStore>> {
        self.kv.write()
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore").finish_non_exhaustive()
    }
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    Ok(serde_json::to_vec(value)?)
}

pub(crate) fn decode<T: DeserializeOwned>(key: &[u8], bytes: &[u8]) -> Result<T, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::Corruption {
        message: format!("{}: {e}", String::from_utf8_lossy(key)),
    })
}

/// Load the document stored under `key`.
pub(crate) fn load<T: DeserializeOwned>(
    kv: &dyn KeyValueStore,
    key: &[u8],
) -> Result<Option<T>, StoreError> {
    kv.get(key)?
        .map(|bytes| decode(key, &bytes))
        .transpose()
}
