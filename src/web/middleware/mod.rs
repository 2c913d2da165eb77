//! Middleware for the web API.

pub mod auth;
pub mod cors;
pub mod rate_limit;
pub mod security;

pub use auth::{session_auth, AdminSession, MaybeAdmin};
pub use cors::create_cors_layer;
pub use rate_limit::{api_rate_limit, client_ip, ClientIp};
pub use security::security_headers;
