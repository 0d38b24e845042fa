//! # Dispatch Events
//!
//! Every event that flows through the bus, plus topic-based filtering.

use ridex_types::{Ride, UserId, VehicleType};
use serde::{Deserialize, Serialize};

/// All events that can be published to the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DispatchEvent {
    // =========================================================================
    // PRESENCE (AccountService)
    // =========================================================================
    /// A driver toggled themselves online.
    DriverOnline {
        driver_id: UserId,
        vehicle_type: VehicleType,
    },

    /// A driver toggled themselves offline.
    DriverOffline {
        driver_id: UserId,
        vehicle_type: VehicleType,
    },

    // =========================================================================
    // DISPATCH (RideService)
    // =========================================================================
    /// A rider requested a ride. Relayed as `ride:available` to every driver
    /// of the ride's vehicle type.
    RideRequested(Ride),

    /// A driver won the ride. Relayed as `ride:accepted` to the rider.
    RideAccepted {
        ride: Ride,
        driver_id: UserId,
        rider_id: UserId,
    },

    /// Start, completion or cancellation of an assigned ride.
    RideStatusChanged(Ride),
}

impl DispatchEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::DriverOnline { .. } | Self::DriverOffline { .. } => EventTopic::Presence,
            Self::RideRequested(_) => EventTopic::Requests,
            Self::RideAccepted { .. } => EventTopic::Assignments,
            Self::RideStatusChanged(_) => EventTopic::Lifecycle,
        }
    }

    /// Name of the service that emits this event.
    #[must_use]
    pub fn source(&self) -> &'static str {
        match self {
            Self::DriverOnline { .. } | Self::DriverOffline { .. } => "accounts",
            _ => "rides",
        }
    }

    /// The ride this event concerns, if any.
    #[must_use]
    pub fn ride(&self) -> Option<&Ride> {
        match self {
            Self::RideRequested(ride) | Self::RideStatusChanged(ride) => Some(ride),
            Self::RideAccepted { ride, .. } => Some(ride),
            _ => None,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Driver online/offline toggles.
    Presence,
    /// New ride requests.
    Requests,
    /// Ride acceptances.
    Assignments,
    /// Post-acceptance status changes.
    Lifecycle,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &DispatchEvent) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic())
    }
}
