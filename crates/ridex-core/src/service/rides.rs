//! # Ride Service
//!
//! Ride requests, the open-ride board, and the lifecycle after acceptance.
//!
//! Every lifecycle change runs inside a store mutation, so the status check
//! and the write happen under one lock. Events are published only after the
//! write succeeded.

use std::sync::Arc;

use chrono::Utc;
use ridex_bus::{DispatchEvent, EventPublisher};
use ridex_store::{DocumentStore, RideCollection, UserCollection};
use ridex_types::{Ride, RideId, RideStatus, User, UserId, VehicleType};
use tracing::info;

use crate::domain::fare::{FareEstimate, FareSchedule};
use crate::domain::requests::{EstimateRequest, RideRequest};
use crate::errors::CoreError;

#[derive(Clone)]
pub struct RideService {
    users: UserCollection,
    rides: RideCollection,
    bus: Arc<dyn EventPublisher>,
    fares: FareSchedule,
}

impl RideService {
    pub fn new(store: &DocumentStore, bus: Arc<dyn EventPublisher>) -> Self {
        Self {
            users: store.users(),
            rides: store.rides(),
            bus,
            fares: FareSchedule::default(),
        }
    }

    pub fn with_fare_schedule(mut self, fares: FareSchedule) -> Self {
        self.fares = fares;
        self
    }

    pub fn estimate(&self, req: &EstimateRequest) -> Result<FareEstimate, CoreError> {
        req.pickup.validate()?;
        req.dropoff.validate()?;
        Ok(self.fares.estimate(&req.pickup, &req.dropoff, req.vehicle_type))
    }

    /// Riders only. A rider holds at most one active ride.
    pub async fn request(&self, rider: UserId, req: RideRequest) -> Result<Ride, CoreError> {
        let user = self.load_user(rider)?;
        if !user.is_rider() {
            return Err(CoreError::forbidden("Only riders can request rides"));
        }
        req.pickup.validate()?;
        req.dropoff.validate()?;

        let estimate = self.fares.estimate(&req.pickup, &req.dropoff, req.vehicle_type);
        let mut ride = Ride::requested(rider, req.pickup, req.dropoff, req.vehicle_type);
        ride.fare = non_negative(req.fare, "fare")?.unwrap_or(estimate.fare);
        ride.distance = non_negative(req.distance, "distance")?.unwrap_or(estimate.distance);
        ride.duration = req.duration.unwrap_or(estimate.estimated_time);
        ride.scheduled_time = req.scheduled_time;

        let ride = self.rides.insert_guarded(ride, |existing| {
            if existing.iter().any(|r| r.status.is_active()) {
                Err(CoreError::conflict("You already have an active ride"))
            } else {
                Ok(())
            }
        })?;

        info!(
            ride_id = %ride.id,
            rider_id = %rider,
            vehicle_type = %ride.vehicle_type,
            fare = ride.fare,
            "Ride requested"
        );
        self.bus
            .publish(DispatchEvent::RideRequested(ride.clone()))
            .await;
        Ok(ride)
    }

    /// Open rides for a driver, oldest first. Scheduled rides appear once
    /// their pickup time has arrived.
    pub fn available(
        &self,
        driver: UserId,
        vehicle_type: Option<VehicleType>,
    ) -> Result<Vec<Ride>, CoreError> {
        let user = self.load_user(driver)?;
        if !user.is_driver() {
            return Err(CoreError::forbidden("Only drivers can view available rides"));
        }
        let now = Utc::now();
        let mut rides = self.rides.list_open(vehicle_type)?;
        rides.retain(|r| !r.is_scheduled_after(now));
        Ok(rides)
    }

    /// Active rides whose scheduled time is still ahead, soonest first.
    pub fn scheduled(&self, user: UserId) -> Result<Vec<Ride>, CoreError> {
        let user = self.load_user(user)?;
        let now = Utc::now();
        let mut rides = self.rides_of(&user)?;
        rides.retain(|r| r.status.is_active() && r.is_scheduled_after(now));
        rides.sort_by_key(|r| r.scheduled_time);
        Ok(rides)
    }

    /// Every ride the user took part in, newest first.
    pub fn history(&self, user: UserId) -> Result<Vec<Ride>, CoreError> {
        let user = self.load_user(user)?;
        let mut rides = self.rides_of(&user)?;
        rides.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rides)
    }

    /// Participants may always read a ride; other drivers only while it is
    /// open.
    pub fn get(&self, user: UserId, ride_id: RideId) -> Result<Ride, CoreError> {
        let viewer = self.load_user(user)?;
        let ride = self
            .rides
            .get(ride_id)?
            .ok_or_else(|| CoreError::NotFound("Ride not found".into()))?;

        if ride.is_participant(user) || (viewer.is_driver() && ride.is_open()) {
            Ok(ride)
        } else {
            Err(CoreError::forbidden("Not authorized to view this ride"))
        }
    }

    /// Exactly one driver wins a ride. A driver holds at most one active
    /// ride.
    pub async fn accept(&self, driver: UserId, ride_id: RideId) -> Result<Ride, CoreError> {
        let user = self.load_user(driver)?;
        if !user.is_driver() {
            return Err(CoreError::forbidden("Only drivers can accept rides"));
        }

        let ride = self
            .rides
            .transition_for_driver(ride_id, driver, |ride, assigned| {
                if !ride.is_open() {
                    return Err(CoreError::conflict("Ride is no longer available"));
                }
                if assigned.iter().any(|r| r.id != ride.id && r.status.is_active()) {
                    return Err(CoreError::conflict("You already have an active ride"));
                }
                ride.advance(RideStatus::Accepted, Utc::now())?;
                ride.driver = Some(driver);
                Ok(())
            })
            .map_err(ride_not_found)?;

        info!(ride_id = %ride.id, driver_id = %driver, "Ride accepted");
        self.bus
            .publish(DispatchEvent::RideAccepted {
                driver_id: driver,
                rider_id: ride.rider,
                ride: ride.clone(),
            })
            .await;
        Ok(ride)
    }

    /// Assigned driver only: `accepted -> in-progress`.
    pub async fn start(&self, driver: UserId, ride_id: RideId) -> Result<Ride, CoreError> {
        let ride = self
            .rides
            .transition(ride_id, |ride| {
                if ride.driver != Some(driver) {
                    return Err(CoreError::forbidden(
                        "Only the assigned driver can start this ride",
                    ));
                }
                ride.advance(RideStatus::InProgress, Utc::now())?;
                Ok(())
            })
            .map_err(ride_not_found)?;

        self.announce(&ride).await;
        Ok(ride)
    }

    /// Rider or assigned driver: `accepted | in-progress -> completed`.
    pub async fn complete(&self, user: UserId, ride_id: RideId) -> Result<Ride, CoreError> {
        let ride = self
            .rides
            .transition(ride_id, |ride| {
                if !ride.is_participant(user) {
                    return Err(CoreError::forbidden("Not authorized to complete this ride"));
                }
                ride.advance(RideStatus::Completed, Utc::now())?;
                Ok(())
            })
            .map_err(ride_not_found)?;

        self.announce(&ride).await;
        Ok(ride)
    }

    /// Rider or assigned driver: `requested | accepted -> cancelled`.
    pub async fn cancel(&self, user: UserId, ride_id: RideId) -> Result<Ride, CoreError> {
        let actor = self.load_user(user)?;
        let ride = self
            .rides
            .transition(ride_id, |ride| {
                if !ride.is_participant(user) {
                    return Err(CoreError::forbidden("Not authorized to cancel this ride"));
                }
                ride.advance(RideStatus::Cancelled, Utc::now())?;
                ride.cancelled_by = Some(actor.role);
                Ok(())
            })
            .map_err(ride_not_found)?;

        self.announce(&ride).await;
        Ok(ride)
    }

    async fn announce(&self, ride: &Ride) {
        info!(ride_id = %ride.id, status = %ride.status, "Ride status changed");
        self.bus
            .publish(DispatchEvent::RideStatusChanged(ride.clone()))
            .await;
    }

    fn load_user(&self, id: UserId) -> Result<User, CoreError> {
        self.users
            .get(id)?
            .map(|r| r.user)
            .ok_or_else(|| CoreError::NotFound("User not found".into()))
    }

    fn rides_of(&self, user: &User) -> Result<Vec<Ride>, CoreError> {
        Ok(if user.is_driver() {
            self.rides.list_for_driver(user.id)?
        } else {
            self.rides.list_for_rider(user.id)?
        })
    }
}

fn non_negative(value: Option<f64>, field: &str) -> Result<Option<f64>, CoreError> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(CoreError::validation(format!(
            "{field} must be a non-negative number"
        ))),
        other => Ok(other),
    }
}

fn ride_not_found(err: CoreError) -> CoreError {
    match err {
        CoreError::NotFound(_) => CoreError::NotFound("Ride not found".into()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{TokenSigner, DEFAULT_TOKEN_TTL};
    use crate::domain::requests::RegisterRequest;
    use crate::service::AccountService;
    use chrono::Duration;
    use ridex_bus::{EventFilter, EventTopic, InMemoryEventBus};
    use ridex_types::{GeoPoint, Role, Vehicle};

    struct Fixture {
        accounts: AccountService,
        rides: RideService,
        bus: Arc<InMemoryEventBus>,
    }

    fn fixture() -> Fixture {
        let store = DocumentStore::in_memory();
        let bus = Arc::new(InMemoryEventBus::new());
        let accounts = AccountService::new(
            &store,
            TokenSigner::new("secret", DEFAULT_TOKEN_TTL),
            bus.clone(),
        )
        .with_password_iterations(10);
        let rides = RideService::new(&store, bus.clone());
        Fixture {
            accounts,
            rides,
            bus,
        }
    }

    impl Fixture {
        fn user(&self, email: &str, role: Role) -> UserId {
            let vehicle = (role == Role::Driver).then(|| Vehicle {
                vehicle_type: VehicleType::Economy,
                model: "Swift".into(),
                color: "blue".into(),
                plate_number: email.into(),
            });
            self.accounts
                .register(RegisterRequest {
                    name: email.into(),
                    email: email.into(),
                    password: "secret1".into(),
                    phone: String::new(),
                    role,
                    address: String::new(),
                    vehicle,
                })
                .unwrap()
                .user
                .id
        }
    }

    fn request() -> RideRequest {
        RideRequest {
            pickup: GeoPoint::new(0.0, 0.0, "A").unwrap(),
            dropoff: GeoPoint::new(0.0, 0.1, "B").unwrap(),
            vehicle_type: VehicleType::Economy,
            fare: None,
            distance: None,
            duration: None,
            scheduled_time: None,
        }
    }

    #[tokio::test]
    async fn test_request_uses_estimate_and_publishes() {
        let f = fixture();
        let mut sub = f.bus.subscribe(EventFilter::topics(vec![EventTopic::Requests]));
        let rider = f.user("r@x.io", Role::Rider);

        let ride = f.rides.request(rider, request()).await.unwrap();
        assert_eq!(ride.status, RideStatus::Requested);
        assert_eq!(ride.fare, 20.0);
        assert_eq!(ride.distance, 11.1);
        assert_eq!(ride.duration, 23);

        let event = sub.try_recv().unwrap().unwrap();
        assert_eq!(event.ride().map(|r| r.id), Some(ride.id));
    }

    #[tokio::test]
    async fn test_client_pricing_kept() {
        let f = fixture();
        let rider = f.user("r@x.io", Role::Rider);
        let mut req = request();
        req.fare = Some(42.5);
        req.duration = Some(7);

        let ride = f.rides.request(rider, req).await.unwrap();
        assert_eq!(ride.fare, 42.5);
        assert_eq!(ride.duration, 7);

        let mut bad = request();
        bad.fare = Some(-1.0);
        let other = f.user("r2@x.io", Role::Rider);
        assert!(matches!(
            f.rides.request(other, bad).await,
            Err(CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_second_active_request_conflicts() {
        let f = fixture();
        let rider = f.user("r@x.io", Role::Rider);
        f.rides.request(rider, request()).await.unwrap();

        let err = f.rides.request(rider, request()).await.unwrap_err();
        assert_eq!(err, CoreError::Conflict("You already have an active ride".into()));
    }

    #[tokio::test]
    async fn test_driver_cannot_request() {
        let f = fixture();
        let driver = f.user("d@x.io", Role::Driver);
        assert!(matches!(
            f.rides.request(driver, request()).await,
            Err(CoreError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let f = fixture();
        let mut sub = f.bus.subscribe(EventFilter::topics(vec![
            EventTopic::Assignments,
            EventTopic::Lifecycle,
        ]));
        let rider = f.user("r@x.io", Role::Rider);
        let driver = f.user("d@x.io", Role::Driver);

        let ride = f.rides.request(rider, request()).await.unwrap();
        assert_eq!(f.rides.available(driver, None).unwrap().len(), 1);

        let accepted = f.rides.accept(driver, ride.id).await.unwrap();
        assert_eq!(accepted.driver, Some(driver));
        assert!(f.rides.available(driver, None).unwrap().is_empty());
        assert!(matches!(
            sub.try_recv().unwrap(),
            Some(DispatchEvent::RideAccepted { rider_id, .. }) if rider_id == rider
        ));

        let started = f.rides.start(driver, ride.id).await.unwrap();
        assert_eq!(started.status, RideStatus::InProgress);

        let done = f.rides.complete(rider, ride.id).await.unwrap();
        assert_eq!(done.status, RideStatus::Completed);
        assert!(done.completed_at.is_some());

        let statuses: Vec<_> = std::iter::from_fn(|| sub.try_recv().unwrap())
            .filter_map(|e| e.ride().map(|r| r.status))
            .collect();
        assert_eq!(statuses, vec![RideStatus::InProgress, RideStatus::Completed]);

        // A finished ride frees the rider for a new request.
        f.rides.request(rider, request()).await.unwrap();
    }

    #[tokio::test]
    async fn test_accept_conflicts() {
        let f = fixture();
        let rider = f.user("r@x.io", Role::Rider);
        let rider2 = f.user("r2@x.io", Role::Rider);
        let d1 = f.user("d1@x.io", Role::Driver);
        let d2 = f.user("d2@x.io", Role::Driver);

        let ride = f.rides.request(rider, request()).await.unwrap();
        f.rides.accept(d1, ride.id).await.unwrap();
        assert_eq!(
            f.rides.accept(d2, ride.id).await.unwrap_err(),
            CoreError::Conflict("Ride is no longer available".into())
        );

        let second = f.rides.request(rider2, request()).await.unwrap();
        assert_eq!(
            f.rides.accept(d1, second.id).await.unwrap_err(),
            CoreError::Conflict("You already have an active ride".into())
        );
        assert!(matches!(
            f.rides.accept(rider2, second.id).await,
            Err(CoreError::Forbidden(_))
        ));
        assert_eq!(
            f.rides.accept(d2, RideId::new()).await.unwrap_err(),
            CoreError::NotFound("Ride not found".into())
        );
    }

    #[tokio::test]
    async fn test_concurrent_accept_single_winner() {
        let f = fixture();
        let rider = f.user("r@x.io", Role::Rider);
        let drivers: Vec<_> = (0..6)
            .map(|i| f.user(&format!("d{i}@x.io"), Role::Driver))
            .collect();
        let ride = f.rides.request(rider, request()).await.unwrap();

        let tasks: Vec<_> = drivers
            .into_iter()
            .map(|d| {
                let rides = f.rides.clone();
                tokio::spawn(async move { rides.accept(d, ride.id).await })
            })
            .collect();

        let mut winners = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => winners += 1,
                Err(e) => assert_eq!(e, CoreError::Conflict("Ride is no longer available".into())),
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_start_and_complete_permissions() {
        let f = fixture();
        let rider = f.user("r@x.io", Role::Rider);
        let driver = f.user("d@x.io", Role::Driver);
        let stranger = f.user("s@x.io", Role::Driver);
        let ride = f.rides.request(rider, request()).await.unwrap();

        // Not accepted yet.
        assert!(matches!(
            f.rides.start(driver, ride.id).await,
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(
            f.rides.complete(rider, ride.id).await,
            Err(CoreError::Conflict(_))
        ));

        f.rides.accept(driver, ride.id).await.unwrap();
        assert!(matches!(
            f.rides.start(stranger, ride.id).await,
            Err(CoreError::Forbidden(_))
        ));
        assert!(matches!(
            f.rides.complete(stranger, ride.id).await,
            Err(CoreError::Forbidden(_))
        ));

        // Accepted rides may be completed without being started.
        let done = f.rides.complete(driver, ride.id).await.unwrap();
        assert_eq!(done.status, RideStatus::Completed);
        assert!(done.started_at.is_none());
    }

    #[tokio::test]
    async fn test_cancel_records_actor() {
        let f = fixture();
        let rider = f.user("r@x.io", Role::Rider);
        let driver = f.user("d@x.io", Role::Driver);
        let ride = f.rides.request(rider, request()).await.unwrap();
        f.rides.accept(driver, ride.id).await.unwrap();

        let cancelled = f.rides.cancel(driver, ride.id).await.unwrap();
        assert_eq!(cancelled.status, RideStatus::Cancelled);
        assert_eq!(cancelled.cancelled_by, Some(Role::Driver));

        assert!(matches!(
            f.rides.cancel(rider, ride.id).await,
            Err(CoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_in_progress_cannot_be_cancelled() {
        let f = fixture();
        let rider = f.user("r@x.io", Role::Rider);
        let driver = f.user("d@x.io", Role::Driver);
        let ride = f.rides.request(rider, request()).await.unwrap();
        f.rides.accept(driver, ride.id).await.unwrap();
        f.rides.start(driver, ride.id).await.unwrap();

        assert!(matches!(
            f.rides.cancel(rider, ride.id).await,
            Err(CoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_visibility() {
        let f = fixture();
        let rider = f.user("r@x.io", Role::Rider);
        let other_rider = f.user("o@x.io", Role::Rider);
        let driver = f.user("d@x.io", Role::Driver);
        let late_driver = f.user("l@x.io", Role::Driver);
        let ride = f.rides.request(rider, request()).await.unwrap();

        assert!(f.rides.get(rider, ride.id).is_ok());
        assert!(f.rides.get(late_driver, ride.id).is_ok());
        assert!(matches!(
            f.rides.get(other_rider, ride.id),
            Err(CoreError::Forbidden(_))
        ));

        f.rides.accept(driver, ride.id).await.unwrap();
        assert!(f.rides.get(driver, ride.id).is_ok());
        assert!(matches!(
            f.rides.get(late_driver, ride.id),
            Err(CoreError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_scheduled_rides_hidden_until_due() {
        let f = fixture();
        let rider = f.user("r@x.io", Role::Rider);
        let driver = f.user("d@x.io", Role::Driver);
        let mut req = request();
        req.scheduled_time = Some(Utc::now() + Duration::hours(2));
        let ride = f.rides.request(rider, req).await.unwrap();

        assert!(f.rides.available(driver, None).unwrap().is_empty());
        let scheduled = f.rides.scheduled(rider).unwrap();
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].id, ride.id);
        assert!(f.rides.scheduled(driver).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_available_filters_vehicle_type() {
        let f = fixture();
        let driver = f.user("d@x.io", Role::Driver);
        let r1 = f.user("r1@x.io", Role::Rider);
        let r2 = f.user("r2@x.io", Role::Rider);
        f.rides.request(r1, request()).await.unwrap();
        let mut bike = request();
        bike.vehicle_type = VehicleType::Bike;
        f.rides.request(r2, bike).await.unwrap();

        assert_eq!(f.rides.available(driver, None).unwrap().len(), 2);
        let bikes = f.rides.available(driver, Some(VehicleType::Bike)).unwrap();
        assert_eq!(bikes.len(), 1);
        assert_eq!(bikes[0].vehicle_type, VehicleType::Bike);
        assert!(matches!(
            f.rides.available(r1, None),
            Err(CoreError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_history_newest_first() {
        let f = fixture();
        let rider = f.user("r@x.io", Role::Rider);
        let first = f.rides.request(rider, request()).await.unwrap();
        f.rides.cancel(rider, first.id).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = f.rides.request(rider, request()).await.unwrap();

        let ids: Vec<_> = f.rides.history(rider).unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }
}
