//! # Ride Lifecycle Over HTTP
//!
//! A rider and a driver take one ride from request to completion through
//! the public API, then a second ride is cancelled before pickup.

#[cfg(test)]
mod tests {
    use crate::harness::TestNode;
    use reqwest::{Method, StatusCode};
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_full_ride_lifecycle() {
        let node = TestNode::start().await;
        let rider = node.register_rider("rider@example.com").await;
        let driver = node.register_driver("driver@example.com", "economy").await;

        // Estimate first, as the client does before confirming
        let (status, estimate) = node
            .call(
                Method::POST,
                "/api/rides/estimate",
                Some(&rider.token),
                Some(crate::harness::ride_body("economy")),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{estimate}");
        assert!(estimate["fare"].as_f64().unwrap() >= 5.0);
        assert!(estimate["distance"].as_f64().unwrap() > 0.0);

        let ride = node.request_ride(&rider, "economy").await;
        let ride_id = ride["_id"].as_str().unwrap().to_string();
        assert_eq!(ride["status"], "requested");
        assert_eq!(ride["rider"], rider.id.as_str());
        assert!(ride["driver"].is_null());

        // The driver sees it in the open pool
        let (status, open) = node
            .call(
                Method::GET,
                "/api/rides/available?vehicleType=economy",
                Some(&driver.token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        let open = open.as_array().unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0]["_id"], ride_id.as_str());

        let (status, accepted) = node.ride_action(&driver, &ride_id, "accept").await;
        assert_eq!(status, StatusCode::OK, "{accepted}");
        assert_eq!(accepted["status"], "accepted");
        assert_eq!(accepted["driver"], driver.id.as_str());

        // Accepted rides leave the pool
        let (_, open) = node
            .call(Method::GET, "/api/rides/available", Some(&driver.token), None)
            .await;
        assert!(open.as_array().unwrap().is_empty());

        let (status, started) = node.ride_action(&driver, &ride_id, "start").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(started["status"], "in-progress");

        let (status, done) = node.ride_action(&driver, &ride_id, "complete").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(done["status"], "completed");

        // Completed rides are terminal
        let (status, body) = node.ride_action(&rider, &ride_id, "cancel").await;
        assert_eq!(status, StatusCode::CONFLICT, "{body}");

        for account in [&rider, &driver] {
            let (status, history) = node
                .call(Method::GET, "/api/rides/history", Some(&account.token), None)
                .await;
            assert_eq!(status, StatusCode::OK);
            let history = history.as_array().unwrap();
            assert_eq!(history.len(), 1);
            assert_eq!(history[0]["status"], "completed");
        }

        let (status, fetched) = node
            .call(
                Method::GET,
                &format!("/api/rides/{ride_id}"),
                Some(&rider.token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["status"], "completed");

        node.stop().await;
    }

    #[tokio::test]
    async fn test_rider_cancels_before_acceptance() {
        let node = TestNode::start().await;
        let rider = node.register_rider("cancel@example.com").await;
        let driver = node.register_driver("late@example.com", "economy").await;

        let ride = node.request_ride(&rider, "economy").await;
        let ride_id = ride["_id"].as_str().unwrap();

        let (status, cancelled) = node.ride_action(&rider, ride_id, "cancel").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cancelled["status"], "cancelled");
        assert_eq!(cancelled["cancelledBy"], "rider");

        let (status, body) = node.ride_action(&driver, ride_id, "accept").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["message"].is_string());

        node.stop().await;
    }

    #[tokio::test]
    async fn test_strangers_cannot_touch_a_ride() {
        let node = TestNode::start().await;
        let rider = node.register_rider("owner@example.com").await;
        let other = node.register_rider("nosy@example.com").await;
        let driver = node.register_driver("d1@example.com", "economy").await;
        let other_driver = node.register_driver("d2@example.com", "economy").await;

        let ride = node.request_ride(&rider, "economy").await;
        let ride_id = ride["_id"].as_str().unwrap();

        let (status, _) = node.ride_action(&other, ride_id, "cancel").await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = node.ride_action(&driver, ride_id, "accept").await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = node.ride_action(&other_driver, ride_id, "start").await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        // Only the assigned driver starts the trip
        let (status, _) = node.ride_action(&rider, ride_id, "start").await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        node.stop().await;
    }

    #[tokio::test]
    async fn test_driver_profile_and_presence() {
        let node = TestNode::start().await;
        let driver = node.register_driver("online@example.com", "premium").await;

        let (status, user) = node
            .call(
                Method::PATCH,
                "/api/users/status",
                Some(&driver.token),
                Some(json!({ "isOnline": true })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["isOnline"], true);

        let (status, user) = node
            .call(
                Method::PATCH,
                "/api/users/location",
                Some(&driver.token),
                Some(json!({ "coordinates": [77.6, 12.9], "address": "Indiranagar" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{user}");

        let (status, me) = node
            .call(Method::GET, "/api/users/me", Some(&driver.token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["_id"], driver.id.as_str());
        assert_eq!(me["isOnline"], true);
        assert_eq!(me["vehicle"]["type"], "premium");
        assert_eq!(me.get("password"), None::<&Value>);

        node.stop().await;
    }

    #[tokio::test]
    async fn test_token_outliving_its_account_is_rejected() {
        // Both nodes sign with the same secret; the second starts with an empty store
        let first = TestNode::start().await;
        let rider = first.register_rider("ephemeral@example.com").await;
        first.stop().await;

        let second = TestNode::start().await;
        for path in ["/api/users/me", "/api/rides/history"] {
            let (status, body) = second
                .call(Method::GET, path, Some(&rider.token), None)
                .await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{path}: {body}");
            assert_eq!(body["message"], "Token is not valid");
        }

        second.stop().await;
    }

    #[tokio::test]
    async fn test_health_and_metrics_share_the_port() {
        let node = TestNode::start().await;

        let (status, body) = node.call(Method::GET, "/", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("RideX API is running".into()));

        let (status, health) = node.call(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(health["status"], "healthy");

        let (status, metrics) = node.call(Method::GET, "/metrics", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(metrics.as_str().unwrap().contains("ridex_http_requests_total"));

        node.stop().await;
    }
}
