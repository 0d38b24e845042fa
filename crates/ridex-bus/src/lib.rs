//! # RideX Bus - Dispatch Event Bus
//!
//! Carries dispatch events from the ride and account services to the
//! real-time relay. It replaces the socket handle the HTTP routes used to
//! emit on directly: services publish, the relay subscribes and fans events
//! out into rooms.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────┐
//! │ RideService  │                    │  Room Relay  │
//! │              │    publish()       │              │
//! │              │ ──────┐            │              │
//! └──────────────┘       │            └──────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐          │
//!                  │  Event Bus   │          │
//!                  │              │ ─────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! ## Delivery
//!
//! - Fire-and-forget: an event published with no subscribers is dropped.
//! - No persistence, no retry. A subscriber that falls more than the channel
//!   capacity behind skips the lost events and keeps going.
//! - Each subscriber sees events from one publisher in publish order; nothing
//!   is promised across publishers.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{DispatchEvent, EventFilter, EventTopic};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventStream, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before it starts lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
