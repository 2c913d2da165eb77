//! Authentication handlers.

use axum::{extract::State, Json};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{Authenticator, CredentialVerifier, LoginAttempt, LoginPolicy, SessionCodec};
use crate::captcha::CaptchaEngine;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::journal::Journal;
use crate::rate_limit::{MemoryStore, RateLimitConfig, RateLimiter};
use crate::web::dto::{
    CaptchaResponse, LoginRequest, LoginResponse, SuccessResponse, ValidatedJson, VerifyResponse,
};
use crate::web::error::ApiError;
use crate::web::middleware::{ClientIp, MaybeAdmin};

/// Application state shared across handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Login flow and token checks.
    pub authenticator: Authenticator,
    /// Challenge generator.
    pub captcha: Arc<CaptchaEngine>,
    /// Shared rate limiter.
    pub limiter: Arc<RateLimiter>,
    /// Posts and feedback.
    pub journal: Arc<Journal>,
}

impl AppState {
    /// Build the state from configuration using the system clock.
    pub fn from_config(config: &Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build the state from configuration with a custom clock.
    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Self {
        let secret = config.session_secret().as_bytes();
        let limits = &config.rate_limit;

        let limiter = Arc::new(RateLimiter::with_clock(
            Arc::new(MemoryStore::new()),
            RateLimitConfig::new(limits.login_max_attempts, limits.login_window_secs),
            RateLimitConfig::new(limits.api_max_attempts, limits.api_window_secs),
            clock.clone(),
        ));

        let captcha = Arc::new(
            CaptchaEngine::new(secret)
                .with_ttl(Duration::from_secs(config.captcha.ttl_secs))
                .with_clock(clock.clone()),
        );

        let codec = Arc::new(
            SessionCodec::new(secret)
                .with_validity(Duration::from_secs(config.auth.token_validity_secs))
                .with_max_clock_skew(Duration::from_secs(config.auth.max_clock_skew_secs))
                .with_clock(clock.clone()),
        );

        let policy = LoginPolicy {
            require_captcha: config.captcha.required,
            failure_delay: Duration::from_millis(config.auth.failed_login_delay_ms),
        };

        let authenticator = Authenticator::new(
            limiter.clone(),
            captcha.clone(),
            CredentialVerifier::new(config.admin_password(), secret),
            codec,
            policy,
        );

        Self {
            authenticator,
            captcha,
            limiter,
            journal: Arc::new(Journal::with_clock(clock)),
        }
    }
}

/// POST /api/auth/login - Admin login.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ClientIp(ip): ClientIp,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let attempt = LoginAttempt {
        client_ip: ip,
        password: req.password,
        captcha_token: req.captcha_token,
        captcha_answer: req.captcha_answer,
    };

    let success = state.authenticator.login(attempt).await?;
    Ok(Json(success.into()))
}

/// POST /api/auth/logout - Acknowledge logout.
///
/// Tokens are stateless, so the client discarding its token is the logout.
/// The token itself stays valid until it expires.
pub async fn logout(admin: MaybeAdmin) -> Json<SuccessResponse> {
    tracing::info!(authenticated = admin.is_admin(), "Admin logout");
    Json(SuccessResponse::ok())
}

/// GET /api/auth/verify - Check the presented token.
pub async fn verify(admin: MaybeAdmin) -> Json<VerifyResponse> {
    Json(VerifyResponse {
        authenticated: admin.is_admin(),
    })
}

/// GET /api/captcha - Issue a new challenge.
pub async fn captcha(State(state): State<Arc<AppState>>) -> Result<Json<CaptchaResponse>, ApiError> {
    let ticket = state.captcha.generate().map_err(|e| {
        tracing::error!(error = %e, "Failed to seal challenge");
        ApiError::internal("Failed to generate CAPTCHA")
    })?;

    Ok(Json(ticket.into()))
}
