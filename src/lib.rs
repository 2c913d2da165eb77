//! journeylog - a personal learning-journey log.
//!
//! One admin publishes short journal entries; visitors read them and leave
//! feedback. The security core is stateless: signed session tokens, sealed
//! challenge tokens and a sliding-window rate limiter over a pluggable store.

pub mod auth;
pub mod captcha;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod journal;
pub mod logging;
pub mod rate_limit;
pub mod web;

pub use auth::{
    hash_password, Authenticator, CredentialVerifier, IssuedToken, LoginAttempt, LoginError,
    LoginPolicy, LoginSuccess, SessionCodec, TokenError,
};
pub use captcha::{CaptchaEngine, Challenge, ChallengeError, ChallengeKind, ChallengeTicket};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{JourneyError, Result};
pub use journal::{extract_tags, Journal};
pub use rate_limit::{
    MemoryStore, OperationClass, RateLimitConfig, RateLimitDecision, RateLimitStore, RateLimiter,
    StoreError,
};
pub use web::WebServer;
