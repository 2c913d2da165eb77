//! Configuration module for journeylog.

use serde::Deserialize;
use std::fmt;
use std::path::Path;

use crate::{JourneyError, Result};

/// Fallback admin password used in development when none is configured.
pub const DEV_ADMIN_PASSWORD: &str = "changeme123";

/// Fallback signing secret used in development when none is configured.
pub const DEV_SESSION_SECRET: &str = "default-secret-change-me";

/// Longest accepted rate-limit window (30 days).
pub const MAX_RATE_LIMIT_WINDOW_SECS: u64 = 30 * 24 * 60 * 60;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development; insecure defaults are allowed.
    #[default]
    Development,
    /// Production; every secret must be configured.
    Production,
}

impl Environment {
    /// Parse an environment name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Some(Environment::Development),
            "production" | "prod" => Some(Environment::Production),
            _ => None,
        }
    }

    /// Whether this is a production deployment.
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

/// Admin authentication configuration.
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    /// Admin password. Prefer `JOURNEYLOG_ADMIN_PASSWORD`.
    #[serde(default)]
    pub admin_password: Option<String>,
    /// Secret used to sign tokens and derive the challenge key.
    /// Prefer `JOURNEYLOG_SESSION_SECRET`.
    #[serde(default)]
    pub session_secret: Option<String>,
    /// Session token lifetime in seconds.
    #[serde(default = "default_token_validity")]
    pub token_validity_secs: u64,
    /// Tolerated clock skew for tokens issued in the future, in seconds.
    #[serde(default = "default_max_clock_skew")]
    pub max_clock_skew_secs: u64,
    /// Delay before answering a wrong password, in milliseconds.
    #[serde(default = "default_failed_login_delay")]
    pub failed_login_delay_ms: u64,
}

fn default_token_validity() -> u64 {
    24 * 60 * 60
}

fn default_max_clock_skew() -> u64 {
    5 * 60
}

fn default_failed_login_delay() -> u64 {
    1000
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_password: None,
            session_secret: None,
            token_validity_secs: default_token_validity(),
            max_clock_skew_secs: default_max_clock_skew(),
            failed_login_delay_ms: default_failed_login_delay(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[redacted]");
        f.debug_struct("AuthConfig")
            .field("admin_password", &redact(&self.admin_password))
            .field("session_secret", &redact(&self.session_secret))
            .field("token_validity_secs", &self.token_validity_secs)
            .field("max_clock_skew_secs", &self.max_clock_skew_secs)
            .field("failed_login_delay_ms", &self.failed_login_delay_ms)
            .finish()
    }
}

/// Human-verification challenge configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptchaConfig {
    /// Reject logins that do not carry a solved challenge.
    #[serde(default)]
    pub required: bool,
    /// Challenge lifetime in seconds.
    #[serde(default = "default_captcha_ttl")]
    pub ttl_secs: u64,
}

fn default_captcha_ttl() -> u64 {
    5 * 60
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            required: false,
            ttl_secs: default_captcha_ttl(),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    /// Login attempts allowed per window.
    #[serde(default = "default_login_max_attempts")]
    pub login_max_attempts: u32,
    /// Login window in seconds.
    #[serde(default = "default_login_window")]
    pub login_window_secs: u64,
    /// API requests allowed per window.
    #[serde(default = "default_api_max_attempts")]
    pub api_max_attempts: u32,
    /// API window in seconds.
    #[serde(default = "default_api_window")]
    pub api_window_secs: u64,
    /// Interval between stale-entry sweeps, in seconds.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

fn default_login_max_attempts() -> u32 {
    5
}

fn default_login_window() -> u64 {
    15 * 60
}

fn default_api_max_attempts() -> u32 {
    100
}

fn default_api_window() -> u64 {
    60
}

fn default_cleanup_interval() -> u64 {
    60 * 60
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            login_max_attempts: default_login_max_attempts(),
            login_window_secs: default_login_window(),
            api_max_attempts: default_api_max_attempts(),
            api_window_secs: default_api_window(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/journeylog.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Deployment environment.
    #[serde(default)]
    pub environment: Environment,
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Challenge configuration.
    #[serde(default)]
    pub captcha: CaptchaConfig,
    /// Rate limiting configuration.
    #[serde(default)]
    pub rate_limit: RateLimitSettings,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(JourneyError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| JourneyError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `JOURNEYLOG_ADMIN_PASSWORD`: admin password
    /// - `JOURNEYLOG_SESSION_SECRET`: token signing secret
    /// - `JOURNEYLOG_ENV`: `development` or `production`
    ///
    /// Empty values and unknown environment names are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Some(password) = non_empty_env("JOURNEYLOG_ADMIN_PASSWORD") {
            self.auth.admin_password = Some(password);
        }

        if let Some(secret) = non_empty_env("JOURNEYLOG_SESSION_SECRET") {
            self.auth.session_secret = Some(secret);
        }

        if let Some(env) = non_empty_env("JOURNEYLOG_ENV").and_then(|v| Environment::parse(&v)) {
            self.environment = env;
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - the environment is production and a secret is missing
    /// - a rate limit allows zero attempts or has a zero-length window
    /// - a rate limit window is longer than [`MAX_RATE_LIMIT_WINDOW_SECS`]
    /// - the token or challenge lifetime is zero
    pub fn validate(&self) -> Result<()> {
        if self.environment.is_production() {
            if is_unset(&self.auth.admin_password) {
                return Err(JourneyError::Config(
                    "admin_password is not set. \
                     Set it in config.toml or via JOURNEYLOG_ADMIN_PASSWORD."
                        .to_string(),
                ));
            }
            if is_unset(&self.auth.session_secret) {
                return Err(JourneyError::Config(
                    "session_secret is not set. \
                     Set it in config.toml or via JOURNEYLOG_SESSION_SECRET."
                        .to_string(),
                ));
            }
        }

        let limits = &self.rate_limit;
        if limits.login_max_attempts == 0 || limits.api_max_attempts == 0 {
            return Err(JourneyError::Config(
                "rate limit max attempts must be at least 1".to_string(),
            ));
        }
        if limits.login_window_secs == 0 || limits.api_window_secs == 0 {
            return Err(JourneyError::Config(
                "rate limit windows must be at least 1 second".to_string(),
            ));
        }
        if limits.login_window_secs.max(limits.api_window_secs) > MAX_RATE_LIMIT_WINDOW_SECS {
            return Err(JourneyError::Config(format!(
                "rate limit windows must not exceed {MAX_RATE_LIMIT_WINDOW_SECS} seconds"
            )));
        }

        if self.auth.token_validity_secs == 0 {
            return Err(JourneyError::Config(
                "token_validity_secs must be at least 1".to_string(),
            ));
        }
        if self.captcha.ttl_secs == 0 {
            return Err(JourneyError::Config(
                "captcha ttl_secs must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Admin password, falling back to the development default.
    pub fn admin_password(&self) -> &str {
        match self.auth.admin_password.as_deref() {
            Some(p) if !p.is_empty() => p,
            _ => {
                tracing::warn!(
                    "No admin password configured, using the insecure development default. \
                     Set JOURNEYLOG_ADMIN_PASSWORD before deploying."
                );
                DEV_ADMIN_PASSWORD
            }
        }
    }

    /// Signing secret, falling back to the development default.
    pub fn session_secret(&self) -> &str {
        match self.auth.session_secret.as_deref() {
            Some(s) if !s.is_empty() => s,
            _ => {
                tracing::warn!(
                    "No session secret configured, using the insecure development default. \
                     Set JOURNEYLOG_SESSION_SECRET before deploying."
                );
                DEV_SESSION_SECRET
            }
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn is_unset(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, str::is_empty)
}
