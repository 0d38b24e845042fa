//! # Account Service
//!
//! Registration, login, profile edits, location updates and the driver
//! online toggle.

use std::sync::Arc;

use ridex_bus::{DispatchEvent, EventPublisher};
use ridex_store::{DocumentStore, UserCollection, UserRecord};
use ridex_types::{GeoPoint, User, UserId};
use tracing::{info, warn};

use crate::auth::{hash_password_with, verify_password, Claims, TokenSigner, DEFAULT_ITERATIONS};
use crate::domain::requests::{AuthSession, LocationUpdate, ProfileUpdate, RegisterRequest};
use crate::errors::CoreError;

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Clone)]
pub struct AccountService {
    users: UserCollection,
    tokens: TokenSigner,
    bus: Arc<dyn EventPublisher>,
    password_iterations: u32,
}

impl AccountService {
    pub fn new(store: &DocumentStore, tokens: TokenSigner, bus: Arc<dyn EventPublisher>) -> Self {
        Self {
            users: store.users(),
            tokens,
            bus,
            password_iterations: DEFAULT_ITERATIONS,
        }
    }

    /// Override the hashing cost for new passwords.
    pub fn with_password_iterations(mut self, iterations: u32) -> Self {
        self.password_iterations = iterations.max(1);
        self
    }

    pub fn register(&self, req: RegisterRequest) -> Result<AuthSession, CoreError> {
        req.validate()?;

        let mut user = User::new(req.name.trim(), &req.email, req.role);
        user.phone = req.phone;
        user.address = req.address;
        if user.is_driver() {
            user.vehicle = req.vehicle;
        }

        let hash = hash_password_with(&req.password, self.password_iterations)?;
        let user = self.users.insert(UserRecord::new(user, hash))?;
        info!(user_id = %user.id, role = %user.role, "Account registered");

        self.session(user)
    }

    /// Unknown e-mail and wrong password fail identically.
    pub fn login(&self, email: &str, password: &str) -> Result<AuthSession, CoreError> {
        let Some(record) = self.users.find_by_email(email)? else {
            warn!("Login failed: unknown email");
            return Err(CoreError::Unauthorized(INVALID_CREDENTIALS.into()));
        };
        if !verify_password(password, &record.password) {
            warn!(user_id = %record.user.id, "Login failed: wrong password");
            return Err(CoreError::Unauthorized(INVALID_CREDENTIALS.into()));
        }

        info!(user_id = %record.user.id, "Login succeeded");
        self.session(record.user)
    }

    /// Verify a bearer token and return its claims.
    pub fn authenticate(&self, token: &str) -> Result<Claims, CoreError> {
        Ok(self.tokens.verify(token)?)
    }

    pub fn current_user(&self, id: UserId) -> Result<User, CoreError> {
        self.users
            .get(id)?
            .map(|r| r.user)
            .ok_or_else(|| CoreError::NotFound("User not found".into()))
    }

    pub fn update_profile(&self, id: UserId, update: ProfileUpdate) -> Result<User, CoreError> {
        let user = self.users.update(id, |record| {
            let user = &mut record.user;
            if let Some(vehicle) = update.vehicle {
                if !user.is_driver() {
                    return Err(CoreError::forbidden("Only drivers can register a vehicle"));
                }
                user.vehicle = Some(vehicle);
            }
            if let Some(name) = update.name {
                let name = name.trim();
                if name.is_empty() {
                    return Err(CoreError::validation("Name cannot be empty"));
                }
                user.name = name.to_string();
            }
            if let Some(phone) = update.phone {
                user.phone = phone;
            }
            if let Some(address) = update.address {
                user.address = address;
            }
            if let Some(avatar) = update.avatar {
                user.avatar = Some(avatar);
            }
            Ok(())
        });
        let user = user.map_err(user_not_found)?;
        info!(user_id = %id, "Profile updated");
        Ok(user)
    }

    pub fn update_location(&self, id: UserId, update: LocationUpdate) -> Result<User, CoreError> {
        let [lng, lat] = update.coordinates;
        let point = GeoPoint::new(lng, lat, update.address.unwrap_or_default())?;

        self.users
            .update(id, |record| {
                record.user.location = Some(point);
                Ok::<_, CoreError>(())
            })
            .map_err(user_not_found)
    }

    /// Drivers only. Publishes the presence change on the bus.
    pub async fn set_online(&self, id: UserId, is_online: bool) -> Result<User, CoreError> {
        let user = self
            .users
            .update(id, |record| {
                if !record.user.is_driver() {
                    return Err(CoreError::forbidden("Only drivers can change online status"));
                }
                record.user.is_online = is_online;
                Ok(())
            })
            .map_err(user_not_found)?;

        let vehicle_type = user.vehicle_type().unwrap_or_default();
        let event = if is_online {
            DispatchEvent::DriverOnline {
                driver_id: id,
                vehicle_type,
            }
        } else {
            DispatchEvent::DriverOffline {
                driver_id: id,
                vehicle_type,
            }
        };
        self.bus.publish(event).await;

        info!(driver_id = %id, online = is_online, "Driver status changed");
        Ok(user)
    }

    fn session(&self, user: User) -> Result<AuthSession, CoreError> {
        let token = self.tokens.issue(user.id, user.role)?;
        Ok(AuthSession { token, user })
    }
}

fn user_not_found(err: CoreError) -> CoreError {
    match err {
        CoreError::NotFound(_) => CoreError::NotFound("User not found".into()),
        other => other,
    }
}
