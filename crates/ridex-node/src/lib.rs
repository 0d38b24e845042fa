//! RideX node: configuration loading and service wiring for the
//! `ridex-node` binary.

#![deny(unsafe_code)]

pub mod config;
pub mod wiring;

pub use config::{load_config, Args};
pub use wiring::{build_gateway, open_store};
