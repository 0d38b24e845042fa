//! # Fare Estimation
//!
//! Great-circle distance between pickup and dropoff, priced per vehicle
//! class.

use ridex_types::{GeoPoint, VehicleType};
use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Result returned by `POST /api/rides/estimate`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FareEstimate {
    pub fare: f64,
    /// Kilometres, one decimal.
    pub distance: f64,
    /// Minutes.
    pub estimated_time: u32,
}

impl FareEstimate {
    pub const ZERO: FareEstimate = FareEstimate {
        fare: 0.0,
        distance: 0.0,
        estimated_time: 0,
    };
}

/// Pricing constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FareSchedule {
    pub base: f64,
    pub per_km: f64,
    pub minimum: f64,
    /// Average city speed used for the time estimate.
    pub average_speed_kmh: f64,
}

impl Default for FareSchedule {
    fn default() -> Self {
        Self {
            base: 3.0,
            per_km: 1.5,
            minimum: 5.0,
            average_speed_kmh: 30.0,
        }
    }
}

impl FareSchedule {
    pub fn multiplier(&self, vehicle: VehicleType) -> f64 {
        match vehicle {
            VehicleType::Economy => 1.0,
            VehicleType::Comfort => 1.3,
            VehicleType::Premium => 1.8,
            VehicleType::Suv => 1.6,
            VehicleType::Bike => 0.6,
        }
    }

    pub fn estimate(
        &self,
        pickup: &GeoPoint,
        dropoff: &GeoPoint,
        vehicle: VehicleType,
    ) -> FareEstimate {
        let distance = haversine_km(pickup, dropoff);
        if distance <= f64::EPSILON {
            return FareEstimate::ZERO;
        }

        let fare = ((self.base + self.per_km * distance).round() * self.multiplier(vehicle))
            .max(self.minimum);
        let minutes = (distance / self.average_speed_kmh * 60.0).ceil();

        FareEstimate {
            fare: round_to(fare, 2),
            distance: round_to(distance, 1),
            estimated_time: minutes as u32,
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Haversine distance in kilometres.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat().to_radians(), b.lat().to_radians());
    let d_lat = lat2 - lat1;
    let d_lng = (b.lng() - a.lng()).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Estimate with the default schedule.
pub fn estimate_fare(pickup: &GeoPoint, dropoff: &GeoPoint, vehicle: VehicleType) -> FareEstimate {
    FareSchedule::default().estimate(pickup, dropoff, vehicle)
}
