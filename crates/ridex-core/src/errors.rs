//! # Core Errors
//!
//! Every failure a service can report. The gateway maps each variant to an
//! HTTP status.

use ridex_store::StoreError;
use ridex_types::EntityError;
use thiserror::Error;

use crate::auth::TokenError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// Malformed or out-of-range input.
    #[error("{0}")]
    Validation(String),

    /// Missing, bad or expired credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but the role or ownership does not allow it.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// The resource is in a state that forbids the change.
    #[error("{0}")]
    Conflict(String),

    /// Storage engine failure.
    #[error("Storage failure: {0}")]
    Storage(StoreError),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        CoreError::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        CoreError::Conflict(msg.into())
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail(_) => CoreError::Conflict("User already exists".into()),
            StoreError::NotFound(what) => CoreError::NotFound(format!("Not found: {what}")),
            other => CoreError::Storage(other),
        }
    }
}

impl From<EntityError> for CoreError {
    fn from(err: EntityError) -> Self {
        match err {
            EntityError::InvalidTransition { .. } => CoreError::Conflict(err.to_string()),
            other => CoreError::Validation(other.to_string()),
        }
    }
}

impl From<TokenError> for CoreError {
    fn from(err: TokenError) -> Self {
        CoreError::Unauthorized(err.to_string())
    }
}
