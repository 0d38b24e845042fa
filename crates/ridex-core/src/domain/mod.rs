//! Request shapes and pure pricing logic.

pub mod fare;
pub mod requests;
