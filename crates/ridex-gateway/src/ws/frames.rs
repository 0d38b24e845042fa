//! Wire format of the relay: JSON text frames `{ "event": ..., "data": ... }`.

use ridex_types::VehicleType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DRIVER_ONLINE: &str = "driver:online";
pub const DRIVER_OFFLINE: &str = "driver:offline";
pub const RIDER_ONLINE: &str = "rider:online";
pub const RIDER_OFFLINE: &str = "rider:offline";
pub const RIDE_REQUEST: &str = "ride:request";
pub const RIDE_AVAILABLE: &str = "ride:available";
pub const RIDE_ACCEPTED: &str = "ride:accepted";
pub const RIDE_STATUS: &str = "ride:status";
pub const ERROR: &str = "error";

/// Raw frame as it travels in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ERROR, serde_json::json!({ "message": message.into() }))
    }

    pub fn to_text(&self) -> String {
        // A Frame holds only a string and a JSON value; both always serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverPresence {
    pub driver_id: String,
    pub vehicle_type: VehicleType,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderPresence {
    pub rider_id: String,
}

/// A parsed client frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    DriverOnline(DriverPresence),
    DriverOffline(DriverPresence),
    RiderOnline(RiderPresence),
    RiderOffline(RiderPresence),
    /// Forwarded verbatim as `ride:available` to the vehicle type's room.
    RideRequest {
        vehicle_type: VehicleType,
        payload: Value,
    },
    /// Forwarded verbatim as `ride:accepted` to the rider's room.
    RideAccepted { rider_id: String, payload: Value },
}

impl ClientEvent {
    /// Parse a text frame. The error string is sent back in an `error`
    /// frame.
    pub fn parse(text: &str) -> Result<Self, String> {
        let frame: Frame =
            serde_json::from_str(text).map_err(|e| format!("Malformed frame: {e}"))?;

        let data = frame.data;
        match frame.event.as_str() {
            DRIVER_ONLINE => presence(data).map(ClientEvent::DriverOnline),
            DRIVER_OFFLINE => presence(data).map(ClientEvent::DriverOffline),
            RIDER_ONLINE => presence(data).map(ClientEvent::RiderOnline),
            RIDER_OFFLINE => presence(data).map(ClientEvent::RiderOffline),
            RIDE_REQUEST => {
                let vehicle_type = data
                    .get("vehicleType")
                    .and_then(Value::as_str)
                    .ok_or_else(|| "ride:request needs a vehicleType".to_string())?
                    .parse::<VehicleType>()
                    .map_err(|e| e.to_string())?;
                Ok(ClientEvent::RideRequest {
                    vehicle_type,
                    payload: data,
                })
            }
            RIDE_ACCEPTED => {
                let rider_id = non_empty_str(&data, "riderId")
                    .ok_or_else(|| "ride:accepted needs a riderId".to_string())?;
                Ok(ClientEvent::RideAccepted {
                    rider_id,
                    payload: data,
                })
            }
            other => Err(format!("Unknown event: {other}")),
        }
    }
}

fn presence<T: serde::de::DeserializeOwned>(data: Value) -> Result<T, String> {
    serde_json::from_value(data).map_err(|e| format!("Invalid payload: {e}"))
}

fn non_empty_str(data: &Value, key: &str) -> Option<String> {
    data.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from)
}
