//! # RideX Core - Business Rules
//!
//! The account and ride services that sit between the HTTP surface and the
//! document store.
//!
//! ## Layout
//!
//! - `auth`: password hashing and signed bearer tokens
//! - `domain`: request/response shapes and fare estimation
//! - `service`: `AccountService` and `RideService`
//!
//! Services publish dispatch events on the bus after each successful write;
//! they never talk to sockets directly.

#![deny(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod auth;
pub mod domain;
pub mod errors;
pub mod service;

pub use auth::{hash_password, verify_password, Claims, TokenError, TokenSigner};
pub use domain::fare::{estimate_fare, haversine_km, FareEstimate, FareSchedule};
pub use domain::requests::{
    AuthSession, EstimateRequest, LocationUpdate, LoginRequest, OnlineStatus, ProfileUpdate,
    RegisterRequest, RideRequest,
};
pub use errors::CoreError;
pub use service::{AccountService, RideService};
