//! Stateless admin session tokens.
//!
//! A token is `base64("<issued_at_ms>:<hex hmac>")` where the HMAC covers
//! `"admin:<issued_at_ms>"` under the signing secret. Nothing is stored
//! server-side, so any process holding the same secret can validate it and
//! tokens survive restarts. The flip side is that a token cannot be revoked
//! before it expires: logging out only discards it on the client.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

use crate::clock::{Clock, SystemClock};
use crate::crypto::{constant_time_eq, sign_hex};

/// The single identity tokens are issued for.
pub const ADMIN_IDENTITY: &str = "admin";

/// Default token lifetime (24 hours).
pub const DEFAULT_TOKEN_VALIDITY_SECS: u64 = 24 * 60 * 60;

/// Default tolerance for tokens stamped slightly in the future (5 minutes).
pub const DEFAULT_MAX_CLOCK_SKEW_SECS: u64 = 5 * 60;

/// Longest token accepted before any decoding is attempted.
pub const MAX_TOKEN_LENGTH: usize = 256;

/// Token validation errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// Token could not be decoded or parsed.
    #[error("malformed token")]
    Malformed,

    /// Token is older than the validity period.
    #[error("token expired")]
    Expired,

    /// Signature does not match the token contents.
    #[error("token signature mismatch")]
    SignatureMismatch,
}

/// A freshly issued session token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Opaque bearer token.
    pub token: String,
    /// When the token was issued.
    pub issued_at: DateTime<Utc>,
    /// When the token stops validating.
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates session tokens.
pub struct SessionCodec {
    secret: Vec<u8>,
    validity: Duration,
    max_clock_skew: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionCodec {
    /// Create a codec with default validity and skew.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            secret: secret.to_vec(),
            validity: Duration::from_secs(DEFAULT_TOKEN_VALIDITY_SECS),
            max_clock_skew: Duration::from_secs(DEFAULT_MAX_CLOCK_SKEW_SECS),
            clock: Arc::new(SystemClock),
        }
    }

    /// Set the token lifetime.
    pub fn with_validity(mut self, validity: Duration) -> Self {
        self.validity = validity;
        self
    }

    /// Set the tolerated clock skew between issuing and validating hosts.
    pub fn with_max_clock_skew(mut self, skew: Duration) -> Self {
        self.max_clock_skew = skew;
        self
    }

    /// Use a custom clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Token lifetime.
    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Issue a new admin token stamped with the current time.
    pub fn issue(&self) -> IssuedToken {
        let issued_at = self.clock.now();
        let millis = issued_at.timestamp_millis();
        let signature = self.signature(millis);
        let token = STANDARD.encode(format!("{millis}:{signature}"));

        IssuedToken {
            token,
            issued_at,
            expires_at: issued_at
                .checked_add_signed(chrono::Duration::milliseconds(duration_millis(self.validity)))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Validate a token, returning its issue time.
    pub fn validate(&self, token: &str) -> Result<DateTime<Utc>, TokenError> {
        if token.is_empty() || token.len() > MAX_TOKEN_LENGTH {
            return Err(TokenError::Malformed);
        }

        let decoded = STANDARD.decode(token).map_err(|_| TokenError::Malformed)?;
        let decoded = String::from_utf8(decoded).map_err(|_| TokenError::Malformed)?;
        let (millis, signature) = decoded.split_once(':').ok_or(TokenError::Malformed)?;

        if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TokenError::Malformed);
        }
        let millis: i64 = millis.parse().map_err(|_| TokenError::Malformed)?;

        let expected = self.signature(millis);
        if !constant_time_eq(signature.as_bytes(), expected.as_bytes()) {
            return Err(TokenError::SignatureMismatch);
        }

        let now = self.clock.now_millis();
        let age = now.saturating_sub(millis);
        if age < -duration_millis(self.max_clock_skew) {
            return Err(TokenError::Malformed);
        }
        if age > duration_millis(self.validity) {
            return Err(TokenError::Expired);
        }

        Utc.timestamp_millis_opt(millis)
            .single()
            .ok_or(TokenError::Malformed)
    }

    /// Whether `token` is a currently valid admin token.
    pub fn is_valid(&self, token: &str) -> bool {
        self.validate(token).is_ok()
    }

    fn signature(&self, millis: i64) -> String {
        sign_hex(format!("{ADMIN_IDENTITY}:{millis}").as_bytes(), &self.secret)
    }
}

impl fmt::Debug for SessionCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCodec")
            .field("validity", &self.validity)
            .field("max_clock_skew", &self.max_clock_skew)
            .finish_non_exhaustive()
    }
}

fn duration_millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}
