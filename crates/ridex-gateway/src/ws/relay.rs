//! Bus-to-room relay.
//!
//! Turns dispatch events published by the services into frames for the
//! rooms that care about them:
//!
//! | Event | Frame | Room(s) |
//! |---|---|---|
//! | `RideRequested` | `ride:available` | `driver-type:<vehicleType>` |
//! | `RideAccepted` | `ride:accepted` | `rider:<riderId>` |
//! | `RideStatusChanged` | `ride:status` | `rider:<riderId>`, `driver:<driverId>` |

use crate::ws::frames::{Frame, RIDE_ACCEPTED, RIDE_AVAILABLE, RIDE_STATUS};
use crate::ws::rooms::{driver_room, driver_type_room, rider_room, RoomRegistry};
use ridex_bus::{DispatchEvent, EventFilter, EventTopic, Subscription};
use ridex_types::Ride;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Topics the relay forwards. Presence toggles stay server-side.
pub fn relay_filter() -> EventFilter {
    EventFilter::topics(vec![
        EventTopic::Requests,
        EventTopic::Assignments,
        EventTopic::Lifecycle,
    ])
}

fn ride_json(ride: &Ride) -> Value {
    match serde_json::to_value(ride) {
        Ok(value) => value,
        Err(e) => {
            warn!(ride_id = %ride.id, error = %e, "Failed to encode ride for relay");
            Value::Null
        }
    }
}

/// Fan one event out to its rooms. Returns the number of sockets reached.
pub fn relay_event(rooms: &RoomRegistry, event: &DispatchEvent) -> usize {
    match event {
        DispatchEvent::RideRequested(ride) => rooms.emit(
            &driver_type_room(ride.vehicle_type.as_str()),
            &Frame::new(RIDE_AVAILABLE, ride_json(ride)),
        ),
        DispatchEvent::RideAccepted {
            ride,
            driver_id,
            rider_id,
        } => {
            let mut data = ride_json(ride);
            if let Value::Object(map) = &mut data {
                map.insert("rideId".into(), Value::String(ride.id.to_string()));
                map.insert("riderId".into(), Value::String(rider_id.to_string()));
                map.insert("driverId".into(), Value::String(driver_id.to_string()));
            }
            rooms.emit(
                &rider_room(&rider_id.to_string()),
                &Frame::new(RIDE_ACCEPTED, data),
            )
        }
        DispatchEvent::RideStatusChanged(ride) => {
            let frame = Frame::new(RIDE_STATUS, ride_json(ride));
            let mut reached = rooms.emit(&rider_room(&ride.rider.to_string()), &frame);
            if let Some(driver) = ride.driver {
                reached += rooms.emit(&driver_room(&driver.to_string()), &frame);
            }
            reached
        }
        DispatchEvent::DriverOnline { .. } | DispatchEvent::DriverOffline { .. } => 0,
    }
}

/// Forward events until the bus goes away.
pub async fn run_relay(mut subscription: Subscription, rooms: Arc<RoomRegistry>) {
    info!("Dispatch relay started");
    while let Some(event) = subscription.recv().await {
        let reached = relay_event(&rooms, &event);
        debug!(topic = ?event.topic(), reached, "Relayed dispatch event");
    }
    info!("Dispatch relay stopped (bus closed)");
}

/// Spawn the relay on the current runtime.
pub fn spawn_relay(subscription: Subscription, rooms: Arc<RoomRegistry>) -> JoinHandle<()> {
    tokio::spawn(run_relay(subscription, rooms))
}
