//! # RideX Types Crate
//!
//! Domain entities shared by the store, the services and the gateway.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: the wire shape of a user or a ride is defined
//!   once, here. The gateway serializes these types directly.
//! - **Mongo-compatible documents**: identifiers serialize as `_id` and fields
//!   use camelCase so existing clients keep working.
//! - **Credentials stay out**: `User` never carries a password hash; the store
//!   keeps it next to the user record.

#![deny(unsafe_code)]

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
