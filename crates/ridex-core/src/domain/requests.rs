//! # Request and Response Shapes
//!
//! JSON bodies accepted and returned by the services, camelCase on the wire.

use chrono::{DateTime, Utc};
use ridex_types::{GeoPoint, Role, User, Vehicle, VehicleType};
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

fn default_role() -> Role {
    Role::Rider
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub vehicle: Option<Vehicle>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::validation("Name is required"));
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(CoreError::validation("A valid email is required"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(CoreError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if self.role == Role::Driver && self.vehicle.is_none() {
            return Err(CoreError::validation("Drivers must register a vehicle"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token plus the account it was issued for.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

/// Partial profile edit. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub avatar: Option<String>,
    pub vehicle: Option<Vehicle>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationUpdate {
    /// `[lng, lat]`
    pub coordinates: [f64; 2],
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineStatus {
    pub is_online: bool,
}

/// Body of `POST /api/rides/request`. Pricing fields fall back to the
/// server-side estimate.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideRequest {
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    #[serde(default)]
    pub vehicle_type: VehicleType,
    #[serde(default)]
    pub fare: Option<f64>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub scheduled_time: Option<DateTime<Utc>>,
}

/// Body of `POST /api/rides/estimate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateRequest {
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    #[serde(default)]
    pub vehicle_type: VehicleType,
}
