//! # RideX Store - Document Store
//!
//! Persists users and rides as JSON documents on top of a byte-oriented
//! key-value port, with secondary indexes maintained in the same atomic
//! batch as each document write.
//!
//! ## Key Layout
//!
//! | Key | Value |
//! |-----|-------|
//! | `users/<id>` | `UserRecord` JSON |
//! | `idx/users/email/<email>` | user id |
//! | `rides/<id>` | `Ride` JSON |
//! | `idx/rides/rider/<rider>/<ride>` | empty |
//! | `idx/rides/driver/<driver>/<ride>` | empty |
//! | `idx/rides/open/<ride>` | empty |
//!
//! ## Concurrency
//!
//! Every mutation reads, validates and writes while holding the store's
//! write lock, so two drivers accepting the same ride cannot both win.

#![deny(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod errors;
pub mod ports;
pub mod rides;
pub mod store;
pub mod users;

pub use adapters::InMemoryKVStore;
#[cfg(feature = "rocksdb")]
pub use adapters::{RocksDbConfig, RocksDbStore};
pub use errors::StoreError;
pub use ports::outbound::{BatchOperation, KeyValueStore};
pub use rides::RideCollection;
pub use store::DocumentStore;
pub use users::{UserCollection, UserRecord};
