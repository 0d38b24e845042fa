//! Integration flows across store, core, bus and gateway.

pub mod concurrent_accept;
pub mod dispatch_relay;
pub mod ride_lifecycle;
