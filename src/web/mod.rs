//! Web API module for journeylog.
//!
//! Public endpoints serve the journal and accept feedback; admin endpoints
//! require a bearer token obtained from `POST /api/auth/login`.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
