//! # Dispatch Relay
//!
//! REST calls publish dispatch events on the bus; the gateway relay turns
//! them into socket frames for the right rooms:
//!
//! 1. `POST /rides/request` -> `ride:available` to `driver-type:<type>`
//! 2. `PATCH /rides/:id/accept` -> `ride:accepted` to `rider:<id>`
//! 3. start / complete / cancel -> `ride:status` to rider and driver
//!
//! Client-originated `ride:request` and `ride:accepted` frames are relayed
//! socket to socket without touching the store.

#[cfg(test)]
mod tests {
    use crate::harness::TestNode;
    use serde_json::json;
    use std::time::Duration;

    const QUIET: Duration = Duration::from_millis(300);

    #[tokio::test]
    async fn test_bus_events_reach_rooms() {
        let node = TestNode::start().await;
        let rider = node.register_rider("ws-rider@example.com").await;
        let driver = node.register_driver("ws-driver@example.com", "economy").await;

        let mut driver_socket = node.socket().await;
        driver_socket.driver_online(&driver.id, "economy").await;
        let mut rider_socket = node.socket().await;
        rider_socket.rider_online(&rider.id).await;

        node.wait_for_room("driver-type:economy", 1).await;
        node.wait_for_room(&format!("driver:{}", driver.id), 1).await;
        node.wait_for_room(&format!("rider:{}", rider.id), 1).await;

        // 1. New ride is announced to economy drivers
        let ride = node.request_ride(&rider, "economy").await;
        let ride_id = ride["_id"].as_str().unwrap().to_string();
        let available = driver_socket.expect_event("ride:available").await;
        assert_eq!(available["_id"], ride_id.as_str());
        assert_eq!(available["status"], "requested");

        // 2. Acceptance reaches the rider with both party ids
        node.ride_action(&driver, &ride_id, "accept").await;
        let accepted = rider_socket.expect_event("ride:accepted").await;
        assert_eq!(accepted["rideId"], ride_id.as_str());
        assert_eq!(accepted["driverId"], driver.id.as_str());
        assert_eq!(accepted["riderId"], rider.id.as_str());
        assert_eq!(accepted["status"], "accepted");

        // 3. Status changes reach both sides
        node.ride_action(&driver, &ride_id, "start").await;
        let to_rider = rider_socket.expect_event("ride:status").await;
        let to_driver = driver_socket.expect_event("ride:status").await;
        assert_eq!(to_rider["status"], "in-progress");
        assert_eq!(to_driver["status"], "in-progress");

        node.ride_action(&rider, &ride_id, "complete").await;
        assert_eq!(
            rider_socket.expect_event("ride:status").await["status"],
            "completed"
        );
        assert_eq!(
            driver_socket.expect_event("ride:status").await["status"],
            "completed"
        );

        driver_socket.close().await;
        rider_socket.close().await;
        node.stop().await;
    }

    #[tokio::test]
    async fn test_requests_only_reach_matching_vehicle_type() {
        let node = TestNode::start().await;
        let rider = node.register_rider("picky@example.com").await;
        let economy = node.register_driver("eco@example.com", "economy").await;
        let premium = node.register_driver("lux@example.com", "premium").await;

        let mut economy_socket = node.socket().await;
        economy_socket.driver_online(&economy.id, "economy").await;
        let mut premium_socket = node.socket().await;
        premium_socket.driver_online(&premium.id, "premium").await;
        node.wait_for_room("driver-type:economy", 1).await;
        node.wait_for_room("driver-type:premium", 1).await;

        let ride = node.request_ride(&rider, "premium").await;
        let available = premium_socket.expect_event("ride:available").await;
        assert_eq!(available["_id"], ride["_id"]);
        assert_eq!(available["vehicleType"], "premium");

        assert!(economy_socket.next_frame_within(QUIET).await.is_none());

        // A rider holds one active ride at a time
        let ride_id = ride["_id"].as_str().unwrap();
        let (status, _) = node.ride_action(&rider, ride_id, "cancel").await;
        assert_eq!(status, reqwest::StatusCode::OK);

        // Going offline leaves the type room
        premium_socket
            .emit(
                "driver:offline",
                json!({ "driverId": premium.id, "vehicleType": "premium" }),
            )
            .await;
        node.wait_for_room("driver-type:premium", 0).await;
        let second = node.request_ride(&rider, "premium").await;
        assert_eq!(second["status"], "requested");
        assert!(premium_socket.next_frame_within(QUIET).await.is_none());

        node.stop().await;
    }

    #[tokio::test]
    async fn test_client_frames_relay_between_sockets() {
        let node = TestNode::start().await;

        let mut driver_socket = node.socket().await;
        driver_socket.driver_online("driver-1", "bike").await;
        let mut rider_socket = node.socket().await;
        rider_socket.rider_online("rider-1").await;
        node.wait_for_room("driver-type:bike", 1).await;
        node.wait_for_room("rider:rider-1", 1).await;

        rider_socket
            .emit(
                "ride:request",
                json!({ "vehicleType": "bike", "pickup": "MG Road", "fare": 42 }),
            )
            .await;
        let available = driver_socket.expect_event("ride:available").await;
        assert_eq!(available["pickup"], "MG Road");
        assert_eq!(available["fare"], 42);

        driver_socket
            .emit(
                "ride:accepted",
                json!({ "riderId": "rider-1", "driverName": "Asha" }),
            )
            .await;
        let accepted = rider_socket.expect_event("ride:accepted").await;
        assert_eq!(accepted["driverName"], "Asha");

        node.stop().await;
    }

    #[tokio::test]
    async fn test_bad_frames_get_error_replies() {
        let node = TestNode::start().await;
        let mut socket = node.socket().await;

        socket.emit("ride:teleport", json!({})).await;
        let frame = socket.next_frame().await;
        assert_eq!(frame["event"], "error");
        assert!(frame["data"]["message"].is_string());

        socket
            .emit(
                "driver:online",
                json!({ "driverId": "d", "vehicleType": "hovercraft" }),
            )
            .await;
        let frame = socket.next_frame().await;
        assert_eq!(frame["event"], "error");

        // The connection survives bad input
        socket.driver_online("d", "suv").await;
        node.wait_for_room("driver-type:suv", 1).await;

        socket.close().await;
        node.wait_for_room("driver-type:suv", 0).await;

        node.stop().await;
    }
}
