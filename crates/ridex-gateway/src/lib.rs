//! RideX Gateway - the HTTP and WebSocket surface of a node.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      GATEWAY (port 5000)                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │   REST /api/*      WebSocket /socket     /health  /metrics   │
//! │        │                  │                                   │
//! │  ┌─────┴──────────────────┴──────────────────┐               │
//! │  │  CORS → Tracing → Timeout → RateLimit      │               │
//! │  └─────┬──────────────────┬──────────────────┘               │
//! │        │                  │                                   │
//! │  AccountService     RoomRegistry ◄──── relay ◄──┐            │
//! │  RideService ──────────────────── publish ──► Event Bus      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Handlers never touch sockets. The services publish dispatch events and
//! the relay task fans them out into rooms (`driver:<id>`,
//! `driver-type:<vehicleType>`, `rider:<id>`). Clients can also relay
//! `ride:request` and `ride:accepted` frames directly between sockets.
//!
//! # Usage
//!
//! ```ignore
//! use ridex_gateway::{GatewayConfig, GatewayService};
//!
//! let gateway = GatewayService::new(config, accounts, rides, &bus)?;
//! gateway.run(shutdown_signal()).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod middleware;
pub mod rest;
pub mod service;
pub mod ws;

pub use domain::config::{GatewayConfig, StorageBackend};
pub use domain::error::{ApiError, ApiResult, GatewayError};
pub use service::{build_router, AppState, GatewayService};
pub use ws::RoomRegistry;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
