//! # Error Types
//!
//! Validation errors raised while building or mutating entities.

use crate::entities::RideStatus;
use thiserror::Error;

/// Errors raised by entity constructors and lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EntityError {
    /// Longitude or latitude outside the WGS84 range.
    #[error("Invalid coordinates: lng={lng}, lat={lat}")]
    InvalidCoordinates { lng: f64, lat: f64 },

    /// The ride lifecycle does not allow this move.
    #[error("Cannot move ride from {from} to {to}")]
    InvalidTransition { from: RideStatus, to: RideStatus },

    /// Vehicle type string not recognised.
    #[error("Unknown vehicle type: {0}")]
    UnknownVehicleType(String),

    /// Role string not recognised.
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// Identifier is not a valid UUID.
    #[error("Invalid id: {0}")]
    InvalidId(String),
}
