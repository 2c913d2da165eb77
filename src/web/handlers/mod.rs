//! API handlers.

pub mod auth;
pub mod feedback;
pub mod posts;

pub use auth::*;
pub use feedback::*;
pub use posts::*;
