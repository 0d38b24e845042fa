//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Identity**: `UserId`, `RideId`, `Role`
//! - **Accounts**: `User`, `Vehicle`, `VehicleType`
//! - **Geography**: `GeoPoint`
//! - **Dispatch**: `Ride`, `RideStatus`

use crate::errors::EntityError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Parse from the hyphenated string form.
            pub fn parse(s: &str) -> Result<Self, EntityError> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|_| EntityError::InvalidId(s.to_string()))
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = EntityError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier of a rider or driver account.
    UserId
);

uuid_id!(
    /// Unique identifier of a ride.
    RideId
);

/// Account role. A user is either a rider or a driver, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Rider,
    Driver,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Rider => "rider",
            Role::Driver => "driver",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = EntityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rider" => Ok(Role::Rider),
            "driver" => Ok(Role::Driver),
            other => Err(EntityError::UnknownRole(other.to_string())),
        }
    }
}

// =============================================================================
// CLUSTER B: ACCOUNTS
// =============================================================================

/// Vehicle class. Drivers advertise one; riders request one.
///
/// Presence rooms are keyed by this value (`driver-type:<type>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VehicleType {
    #[default]
    Economy,
    Comfort,
    Premium,
    Suv,
    Bike,
}

impl VehicleType {
    pub const ALL: [VehicleType; 5] = [
        VehicleType::Economy,
        VehicleType::Comfort,
        VehicleType::Premium,
        VehicleType::Suv,
        VehicleType::Bike,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleType::Economy => "economy",
            VehicleType::Comfort => "comfort",
            VehicleType::Premium => "premium",
            VehicleType::Suv => "suv",
            VehicleType::Bike => "bike",
        }
    }
}

impl fmt::Display for VehicleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleType {
    type Err = EntityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        VehicleType::ALL
            .into_iter()
            .find(|v| v.as_str() == wanted)
            .ok_or(EntityError::UnknownVehicleType(wanted))
    }
}

/// A driver's registered vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    #[serde(rename = "type", default)]
    pub vehicle_type: VehicleType,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub plate_number: String,
}

/// A rider or driver account as exposed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    /// Always stored lowercase.
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub role: Role,
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub location: Option<GeoPoint>,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle: Option<Vehicle>,
    #[serde(default = "default_rating")]
    pub rating: f32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_rating() -> f32 {
    5.0
}

impl User {
    /// Build a fresh account with default rating and no location.
    pub fn new(name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            name: name.into(),
            email: email.into().trim().to_ascii_lowercase(),
            phone: String::new(),
            role,
            address: String::new(),
            avatar: None,
            location: None,
            is_online: false,
            vehicle: None,
            rating: default_rating(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_driver(&self) -> bool {
        self.role == Role::Driver
    }

    pub fn is_rider(&self) -> bool {
        self.role == Role::Rider
    }

    /// Vehicle class this driver serves, if any.
    pub fn vehicle_type(&self) -> Option<VehicleType> {
        self.vehicle.as_ref().map(|v| v.vehicle_type)
    }
}

// =============================================================================
// CLUSTER C: GEOGRAPHY
// =============================================================================

/// GeoJSON geometry kind. Only points are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeoKind {
    #[default]
    Point,
}

/// A GeoJSON point with a human readable address.
///
/// Coordinates follow GeoJSON order: `[longitude, latitude]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "type", default)]
    pub kind: GeoKind,
    pub coordinates: [f64; 2],
    #[serde(default)]
    pub address: String,
}

impl GeoPoint {
    pub fn new(lng: f64, lat: f64, address: impl Into<String>) -> Result<Self, EntityError> {
        let point = Self {
            kind: GeoKind::Point,
            coordinates: [lng, lat],
            address: address.into(),
        };
        point.validate()?;
        Ok(point)
    }

    pub fn lng(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn lat(&self) -> f64 {
        self.coordinates[1]
    }

    /// Reject NaN and out-of-range coordinates.
    pub fn validate(&self) -> Result<(), EntityError> {
        let (lng, lat) = (self.lng(), self.lat());
        let lng_ok = lng.is_finite() && (-180.0..=180.0).contains(&lng);
        let lat_ok = lat.is_finite() && (-90.0..=90.0).contains(&lat);
        if lng_ok && lat_ok {
            Ok(())
        } else {
            Err(EntityError::InvalidCoordinates { lng, lat })
        }
    }
}

// =============================================================================
// CLUSTER D: DISPATCH
// =============================================================================

/// Ride lifecycle state.
///
/// ```text
/// requested ──accept──→ accepted ──start──→ in-progress ──complete──→ completed
///     │                    │  └───────────complete──────────────────────↑
///     └──────cancel────────┴──→ cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RideStatus {
    Requested,
    Accepted,
    InProgress,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Requested => "requested",
            RideStatus::Accepted => "accepted",
            RideStatus::InProgress => "in-progress",
            RideStatus::Completed => "completed",
            RideStatus::Cancelled => "cancelled",
        }
    }

    pub fn can_transition_to(&self, next: RideStatus) -> bool {
        use RideStatus::*;
        matches!(
            (self, next),
            (Requested, Accepted)
                | (Accepted, InProgress)
                | (Accepted, Completed)
                | (InProgress, Completed)
                | (Requested, Cancelled)
                | (Accepted, Cancelled)
        )
    }

    /// Requested, accepted or in progress.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RideStatus::Requested | RideStatus::Accepted | RideStatus::InProgress
        )
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ride document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    #[serde(rename = "_id")]
    pub id: RideId,
    pub rider: UserId,
    #[serde(default)]
    pub driver: Option<UserId>,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    /// Fare in the local currency unit.
    pub fare: f64,
    /// Distance in kilometres.
    pub distance: f64,
    /// Estimated duration in minutes.
    pub duration: u32,
    #[serde(default)]
    pub vehicle_type: VehicleType,
    pub status: RideStatus,
    #[serde(default)]
    pub scheduled_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub accepted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cancelled_by: Option<Role>,
}

impl Ride {
    /// A freshly requested ride with no driver.
    pub fn requested(
        rider: UserId,
        pickup: GeoPoint,
        dropoff: GeoPoint,
        vehicle_type: VehicleType,
    ) -> Self {
        Self {
            id: RideId::new(),
            rider,
            driver: None,
            pickup,
            dropoff,
            fare: 0.0,
            distance: 0.0,
            duration: 0,
            vehicle_type,
            status: RideStatus::Requested,
            scheduled_time: None,
            created_at: Utc::now(),
            accepted_at: None,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            cancelled_by: None,
        }
    }

    pub fn is_participant(&self, user: UserId) -> bool {
        self.rider == user || self.driver == Some(user)
    }

    /// Open rides can be accepted by any matching driver.
    pub fn is_open(&self) -> bool {
        self.status == RideStatus::Requested
    }

    /// A scheduled ride whose pickup time has not arrived yet.
    pub fn is_scheduled_after(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_time.is_some_and(|t| t > now)
    }

    /// Move to `next`, stamping the matching timestamp.
    pub fn advance(&mut self, next: RideStatus, at: DateTime<Utc>) -> Result<(), EntityError> {
        if !self.status.can_transition_to(next) {
            return Err(EntityError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        match next {
            RideStatus::Accepted => self.accepted_at = Some(at),
            RideStatus::InProgress => self.started_at = Some(at),
            RideStatus::Completed => self.completed_at = Some(at),
            RideStatus::Cancelled => self.cancelled_at = Some(at),
            RideStatus::Requested => {}
        }
        self.status = next;
        Ok(())
    }
}
