//! Database models split into domain-specific modules.

pub mod booking;
pub mod feedback;
pub mod flight;
pub mod form;
pub mod passenger;
pub mod user;

pub use booking::*;
pub use feedback::*;
pub use flight::*;
pub use form::*;
pub use passenger::*;
pub use user::*;
