//! Credentials: password hashing and bearer tokens.

mod password;
mod token;

pub use password::{hash_password, hash_password_with, verify_password, DEFAULT_ITERATIONS};
pub use token::{Claims, TokenError, TokenSigner, DEFAULT_TOKEN_TTL};
