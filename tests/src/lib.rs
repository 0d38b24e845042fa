//! # RideX Test Suite
//!
//! Cross-crate flows run against a real gateway bound to an ephemeral port.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs        # TestNode: in-process gateway plus HTTP/WS clients
//! └── integration/
//!     ├── ride_lifecycle.rs   # register -> request -> accept -> start -> complete
//!     ├── concurrent_accept.rs# many drivers, one winner
//!     └── dispatch_relay.rs   # bus events fanned out to socket rooms
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p ridex-tests
//! cargo test -p ridex-tests integration::dispatch_relay
//! ```

pub mod harness;
pub mod integration;
