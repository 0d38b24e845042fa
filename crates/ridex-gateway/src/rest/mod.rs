//! REST surface.
//!
//! | Path prefix | Handlers |
//! |---|---|
//! | `/api/auth`, `/api/users` | [`accounts`] |
//! | `/api/rides` | [`rides`] |
//! | `/`, `/health`, `/metrics`, `/socket` | [`system`] |

pub mod accounts;
pub mod extract;
pub mod rides;
pub mod system;

pub use extract::{ApiJson, AuthUser};
