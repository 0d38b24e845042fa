//! # Store Errors

use thiserror::Error;

/// Errors raised by the key-value adapters and the collections above them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// I/O error in the underlying engine.
    #[error("Store I/O error: {message}")]
    Io { message: String },

    /// A stored document could not be decoded.
    #[error("Store corruption: {message}")]
    Corruption { message: String },

    /// A document could not be encoded.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Another account already uses this e-mail.
    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    /// A document with this id already exists.
    #[error("Document already exists: {0}")]
    AlreadyExists(String),

    /// No document under the requested id.
    #[error("Document not found: {0}")]
    NotFound(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
