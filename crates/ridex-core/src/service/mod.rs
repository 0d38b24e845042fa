//! Application services.

mod accounts;
mod rides;

pub use accounts::AccountService;
pub use rides::RideService;
