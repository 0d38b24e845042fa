//! Ports required from the host application.

pub mod outbound;
