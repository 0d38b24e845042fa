//! # Concurrent Acceptance
//!
//! Many drivers race to accept one open ride. Exactly one request wins,
//! every other gets 409, and the stored ride names the winner.

#[cfg(test)]
mod tests {
    use crate::harness::TestNode;
    use futures::future::join_all;
    use reqwest::{Method, StatusCode};

    const DRIVERS: usize = 8;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_exactly_one_driver_wins() {
        let node = TestNode::start().await;
        let rider = node.register_rider("race-rider@example.com").await;

        let mut drivers = Vec::with_capacity(DRIVERS);
        for i in 0..DRIVERS {
            drivers.push(
                node.register_driver(&format!("racer{i}@example.com"), "economy")
                    .await,
            );
        }

        let ride = node.request_ride(&rider, "economy").await;
        let ride_id = ride["_id"].as_str().unwrap().to_string();

        let attempts = drivers
            .iter()
            .map(|driver| node.ride_action(driver, &ride_id, "accept"));
        let results = join_all(attempts).await;

        let winners: Vec<_> = results
            .iter()
            .zip(&drivers)
            .filter(|((status, _), _)| *status == StatusCode::OK)
            .map(|(_, driver)| driver.id.clone())
            .collect();
        let conflicts = results
            .iter()
            .filter(|(status, _)| *status == StatusCode::CONFLICT)
            .count();

        assert_eq!(winners.len(), 1, "results: {results:?}");
        assert_eq!(conflicts, DRIVERS - 1);

        let (status, stored) = node
            .call(
                Method::GET,
                &format!("/api/rides/{ride_id}"),
                Some(&rider.token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stored["status"], "accepted");
        assert_eq!(stored["driver"], winners[0].as_str());

        node.stop().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_driver_holds_one_active_ride() {
        let node = TestNode::start().await;
        let first_rider = node.register_rider("first@example.com").await;
        let second_rider = node.register_rider("second@example.com").await;
        let driver = node.register_driver("busy@example.com", "economy").await;

        let first = node.request_ride(&first_rider, "economy").await;
        let second = node.request_ride(&second_rider, "economy").await;
        let first_id = first["_id"].as_str().unwrap();
        let second_id = second["_id"].as_str().unwrap();

        // Race the two accepts from the same driver
        let (a, b) = tokio::join!(
            node.ride_action(&driver, first_id, "accept"),
            node.ride_action(&driver, second_id, "accept"),
        );
        let mut statuses = [a.0, b.0];
        statuses.sort();
        assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);

        // Once the active ride completes the driver is free again
        let active_id = if a.0 == StatusCode::OK { first_id } else { second_id };
        let other_id = if a.0 == StatusCode::OK { second_id } else { first_id };
        let (status, _) = node.ride_action(&driver, active_id, "complete").await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = node.ride_action(&driver, other_id, "accept").await;
        assert_eq!(status, StatusCode::OK, "{body}");

        node.stop().await;
    }
}
