//! Admin authentication.
//!
//! This module provides the credential check, stateless session tokens and
//! the login flow that ties them to rate limiting and challenges.

mod login;
mod password;
mod token;

pub use login::{
    Authenticator, LoginAttempt, LoginError, LoginPolicy, LoginSuccess, DEFAULT_FAILURE_DELAY_MS,
};
pub use password::{hash_password, CredentialVerifier};
pub use token::{
    IssuedToken, SessionCodec, TokenError, ADMIN_IDENTITY, DEFAULT_MAX_CLOCK_SKEW_SECS,
    DEFAULT_TOKEN_VALIDITY_SECS, MAX_TOKEN_LENGTH,
};
