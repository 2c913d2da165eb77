//! Sliding-window rate limiting for sensitive operations.
//!
//! Each `(operation class, client identity)` pair keeps the timestamps of its
//! recent attempts in a [`RateLimitStore`]. An attempt is allowed while fewer
//! than `max_attempts` fall inside the trailing window; blocked attempts are
//! not recorded, so hammering the endpoint does not extend the lockout.

mod store;

pub use store::{MemoryStore, RateLimitStore, StoreError, WindowState};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};

/// Configuration for one operation class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum attempts allowed in the time window.
    pub max_attempts: u32,
    /// Length of the trailing window.
    pub window: Duration,
}

impl RateLimitConfig {
    /// Create a new rate limit configuration.
    pub fn new(max_attempts: u32, window_secs: u64) -> Self {
        Self {
            max_attempts,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Login default: 5 attempts per 15 minutes.
    pub fn login() -> Self {
        Self::new(5, 15 * 60)
    }

    /// Generic API default: 100 requests per minute.
    pub fn api() -> Self {
        Self::new(100, 60)
    }

    fn window_ms(&self) -> i64 {
        i64::try_from(self.window.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Class of operation being gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationClass {
    /// Admin login attempts.
    Login,
    /// Any API request.
    Api,
}

impl OperationClass {
    /// Key prefix used in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationClass::Login => "login",
            OperationClass::Api => "api",
        }
    }
}

impl fmt::Display for OperationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the operation may proceed.
    pub allowed: bool,
    /// Attempts left in the current window.
    pub remaining: u32,
    /// Seconds until a slot frees up, when blocked.
    pub retry_after_secs: Option<u64>,
}

impl RateLimitDecision {
    fn allow(remaining: u32) -> Self {
        Self {
            allowed: true,
            remaining,
            retry_after_secs: None,
        }
    }

    fn deny(retry_after_secs: u64) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            retry_after_secs: Some(retry_after_secs),
        }
    }
}

/// Rate limiter over an injected store.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use journeylog::rate_limit::{MemoryStore, OperationClass, RateLimitConfig, RateLimiter};
///
/// let limiter = RateLimiter::new(
///     Arc::new(MemoryStore::new()),
///     RateLimitConfig::new(2, 60),
///     RateLimitConfig::api(),
/// );
///
/// assert!(limiter.check("10.0.0.1", OperationClass::Login).allowed);
/// assert!(limiter.check("10.0.0.1", OperationClass::Login).allowed);
/// assert!(!limiter.check("10.0.0.1", OperationClass::Login).allowed);
/// ```
#[derive(Debug)]
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    login: RateLimitConfig,
    api: RateLimitConfig,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter using the system clock.
    pub fn new(store: Arc<dyn RateLimitStore>, login: RateLimitConfig, api: RateLimitConfig) -> Self {
        Self::with_clock(store, login, api, Arc::new(SystemClock))
    }

    /// Create a limiter with a custom clock.
    pub fn with_clock(
        store: Arc<dyn RateLimitStore>,
        login: RateLimitConfig,
        api: RateLimitConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            login,
            api,
            clock,
        }
    }

    /// Configuration for an operation class.
    pub fn config(&self, class: OperationClass) -> RateLimitConfig {
        match class {
            OperationClass::Login => self.login,
            OperationClass::Api => self.api,
        }
    }

    /// Check and record an attempt for `identity`.
    ///
    /// A store failure allows the attempt rather than locking everyone out.
    pub fn check(&self, identity: &str, class: OperationClass) -> RateLimitDecision {
        let config = self.config(class);
        let key = store_key(class, identity);
        let now = self.clock.now_millis();
        let window_ms = config.window_ms();

        let state = match self.store.hit(&key, now, window_ms, config.max_attempts) {
            Ok(state) => state,
            Err(e) => {
                warn!(
                    error = %e,
                    class = %class,
                    "Rate limit store failed, allowing request"
                );
                return RateLimitDecision::allow(config.max_attempts);
            }
        };

        if state.recorded {
            let remaining = config.max_attempts.saturating_sub(state.count);
            debug!(key = %key, remaining, "Rate limit attempt recorded");
            return RateLimitDecision::allow(remaining);
        }

        let retry_after_ms = match state.oldest_ms {
            Some(oldest) => oldest.saturating_add(window_ms).saturating_sub(now).max(0),
            None => window_ms,
        };
        let retry_after_secs = (retry_after_ms as u64).div_ceil(1000);

        warn!(key = %key, retry_after_secs, "Rate limit exceeded");
        RateLimitDecision::deny(retry_after_secs)
    }

    /// Forget keys with no attempts inside the longest window.
    pub fn cleanup(&self) -> usize {
        let horizon = self.login.window_ms().max(self.api.window_ms());
        let cutoff = self.clock.now_millis().saturating_sub(horizon);

        match self.store.purge(cutoff) {
            Ok(removed) => removed,
            Err(e) => {
                warn!(error = %e, "Failed to clean up rate limit store");
                0
            }
        }
    }

    /// Start a background task to periodically clean up old entries.
    pub fn start_cleanup_task(self: Arc<Self>, interval: Duration) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);

            // Skip the first immediate tick
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let removed = self.cleanup();
                if removed > 0 {
                    tracing::info!(removed, "Cleaned up stale rate limit entries");
                } else {
                    tracing::debug!("No stale rate limit entries to clean up");
                }
            }
        });
    }
}

fn store_key(class: OperationClass, identity: &str) -> String {
    format!("{}:{}", class.as_str(), identity)
}
