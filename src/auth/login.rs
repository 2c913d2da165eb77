//! Admin login flow.
//!
//! A login attempt passes through, in order: the per-IP rate limit, the
//! optional challenge, the password check and finally token issuance. A wrong
//! password costs the caller a fixed delay before the response goes out.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::password::CredentialVerifier;
use super::token::{IssuedToken, SessionCodec, TokenError};
use crate::captcha::{CaptchaEngine, ChallengeError};
use crate::rate_limit::{OperationClass, RateLimiter};

/// Default pause before answering a wrong password (1 second).
pub const DEFAULT_FAILURE_DELAY_MS: u64 = 1000;

/// Login errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    /// Too many recent attempts from this client.
    #[error("Too many attempts. Please try again in {} minutes.", .retry_after_secs.div_ceil(60).max(1))]
    RateLimited { retry_after_secs: u64 },

    /// The challenge was missing or not solved.
    #[error("{0}")]
    ChallengeFailed(#[from] ChallengeError),

    /// No password was supplied.
    #[error("Password is required")]
    MissingPassword,

    /// The password did not match.
    #[error("Invalid password")]
    InvalidCredential { remaining: u32 },
}

/// Input for a login attempt.
#[derive(Debug, Clone, Default)]
pub struct LoginAttempt {
    /// Client identity used for rate limiting.
    pub client_ip: String,
    /// Submitted password.
    pub password: Option<String>,
    /// Challenge token from a previous `generate`.
    pub captcha_token: Option<String>,
    /// Visitor's answer to the challenge.
    pub captcha_answer: Option<String>,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginSuccess {
    /// Issued session token.
    pub session: IssuedToken,
    /// Token lifetime in seconds.
    pub expires_in_secs: u64,
}

/// Tunable parts of the login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginPolicy {
    /// Reject attempts that carry no challenge.
    pub require_captcha: bool,
    /// Pause applied before reporting a wrong password.
    pub failure_delay: Duration,
}

impl Default for LoginPolicy {
    fn default() -> Self {
        Self {
            require_captcha: false,
            failure_delay: Duration::from_millis(DEFAULT_FAILURE_DELAY_MS),
        }
    }
}

/// Runs login attempts and answers "is this caller the admin?".
#[derive(Debug, Clone)]
pub struct Authenticator {
    limiter: Arc<RateLimiter>,
    captcha: Arc<CaptchaEngine>,
    verifier: CredentialVerifier,
    codec: Arc<SessionCodec>,
    policy: LoginPolicy,
}

impl Authenticator {
    /// Create an authenticator from its collaborators.
    pub fn new(
        limiter: Arc<RateLimiter>,
        captcha: Arc<CaptchaEngine>,
        verifier: CredentialVerifier,
        codec: Arc<SessionCodec>,
        policy: LoginPolicy,
    ) -> Self {
        Self {
            limiter,
            captcha,
            verifier,
            codec,
            policy,
        }
    }

    /// Login policy in effect.
    pub fn policy(&self) -> LoginPolicy {
        self.policy
    }

    /// Attempt an admin login.
    pub async fn login(&self, attempt: LoginAttempt) -> Result<LoginSuccess, LoginError> {
        let decision = self
            .limiter
            .check(&attempt.client_ip, OperationClass::Login);
        if !decision.allowed {
            let retry_after_secs = decision.retry_after_secs.unwrap_or(0);
            warn!(
                client_ip = %attempt.client_ip,
                retry_after_secs,
                "Login rate limited"
            );
            return Err(LoginError::RateLimited { retry_after_secs });
        }

        let token = non_empty(attempt.captcha_token.as_deref());
        let answer = non_empty(attempt.captcha_answer.as_deref());
        match (token, answer) {
            (Some(token), Some(answer)) => {
                if let Err(e) = self.captcha.verify(token, answer) {
                    warn!(client_ip = %attempt.client_ip, error = %e, "Login challenge failed");
                    return Err(e.into());
                }
            }
            _ if self.policy.require_captcha => {
                return Err(ChallengeError::Missing.into());
            }
            _ => {}
        }

        let password = attempt
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or(LoginError::MissingPassword)?;

        if !self.verifier.verify(password) {
            tokio::time::sleep(self.policy.failure_delay).await;
            warn!(
                client_ip = %attempt.client_ip,
                remaining = decision.remaining,
                "Failed admin login"
            );
            return Err(LoginError::InvalidCredential {
                remaining: decision.remaining,
            });
        }

        let session = self.codec.issue();
        info!(client_ip = %attempt.client_ip, "Admin logged in");

        Ok(LoginSuccess {
            session,
            expires_in_secs: self.codec.validity().as_secs(),
        })
    }

    /// Check a bearer token and return when it was issued.
    pub fn authenticate(&self, token: &str) -> Result<DateTime<Utc>, TokenError> {
        self.codec.validate(token).inspect_err(|e| {
            debug!(error = %e, "Admin token rejected");
        })
    }

    /// Whether `token` proves an authenticated admin.
    pub fn is_authenticated(&self, token: Option<&str>) -> bool {
        token.is_some_and(|t| self.codec.is_valid(t))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::captcha::{Challenge, ChallengeKind};
    use crate::clock::ManualClock;
    use crate::rate_limit::{MemoryStore, RateLimitConfig};

    const PASSWORD: &str = "correct horse";
    const SECRET: &[u8] = b"login-test-secret";

    struct Fixture {
        auth: Authenticator,
        captcha: Arc<CaptchaEngine>,
        clock: Arc<ManualClock>,
    }

    fn fixture(policy: LoginPolicy) -> Fixture {
        let clock = Arc::new(ManualClock::starting_now());
        let limiter = Arc::new(RateLimiter::with_clock(
            Arc::new(MemoryStore::new()),
            RateLimitConfig::login(),
            RateLimitConfig::api(),
            clock.clone(),
        ));
        let captcha = Arc::new(CaptchaEngine::new(SECRET).with_clock(clock.clone()));
        let codec = Arc::new(SessionCodec::new(SECRET).with_clock(clock.clone()));
        let auth = Authenticator::new(
            limiter,
            captcha.clone(),
            CredentialVerifier::new(PASSWORD, SECRET),
            codec,
            policy,
        );

        Fixture {
            auth,
            captcha,
            clock,
        }
    }

    fn attempt(password: &str) -> LoginAttempt {
        LoginAttempt {
            client_ip: "192.0.2.1".to_string(),
            password: Some(password.to_string()),
            ..Default::default()
        }
    }

    fn sealed(captcha: &CaptchaEngine, answer: &str) -> String {
        captcha
            .seal(&Challenge {
                kind: ChallengeKind::MathAdd,
                question: "What is 1 + 1?".to_string(),
                answer: answer.to_string(),
            })
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_success_issues_valid_token() {
        let f = fixture(LoginPolicy::default());

        let success = f.auth.login(attempt(PASSWORD)).await.unwrap();
        assert_eq!(success.expires_in_secs, 24 * 60 * 60);
        assert!(f.auth.is_authenticated(Some(&success.session.token)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_authenticate_checks_bearer_token() {
        let f = fixture(LoginPolicy::default());
        let success = f.auth.login(attempt(PASSWORD)).await.unwrap();

        let issued_at = f.auth.authenticate(&success.session.token).unwrap();
        assert_eq!(
            issued_at.timestamp_millis(),
            success.session.issued_at.timestamp_millis()
        );

        assert!(f.auth.authenticate("bm90LWEtdG9rZW4=").is_err());
        assert!(!f.auth.is_authenticated(None));
        assert!(!f.auth.is_authenticated(Some("")));

        f.clock.advance(Duration::from_secs(24 * 60 * 60 + 1));
        assert_eq!(
            f.auth.authenticate(&success.session.token),
            Err(TokenError::Expired)
        );
        assert!(!f.auth.is_authenticated(Some(&success.session.token)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_password_is_delayed() {
        let f = fixture(LoginPolicy::default());

        let started = tokio::time::Instant::now();
        let err = f.auth.login(attempt("wrong")).await.unwrap_err();

        assert_eq!(err, LoginError::InvalidCredential { remaining: 4 });
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sixth_attempt_rate_limited_even_with_correct_password() {
        let f = fixture(LoginPolicy::default());

        for expected_remaining in (0..5).rev() {
            let err = f.auth.login(attempt("wrong")).await.unwrap_err();
            assert_eq!(
                err,
                LoginError::InvalidCredential {
                    remaining: expected_remaining
                }
            );
        }

        let err = f.auth.login(attempt(PASSWORD)).await.unwrap_err();
        assert_eq!(
            err,
            LoginError::RateLimited {
                retry_after_secs: 15 * 60
            }
        );
        assert_eq!(
            err.to_string(),
            "Too many attempts. Please try again in 15 minutes."
        );

        f.clock.advance(Duration::from_secs(15 * 60));
        assert!(f.auth.login(attempt(PASSWORD)).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_is_per_client() {
        let f = fixture(LoginPolicy::default());

        for _ in 0..5 {
            let _ = f.auth.login(attempt("wrong")).await;
        }

        let other = LoginAttempt {
            client_ip: "198.51.100.7".to_string(),
            ..attempt(PASSWORD)
        };
        assert!(f.auth.login(other).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_password() {
        let f = fixture(LoginPolicy::default());

        let err = f.auth.login(attempt("")).await.unwrap_err();
        assert_eq!(err, LoginError::MissingPassword);

        let none = LoginAttempt {
            password: None,
            ..attempt("")
        };
        assert_eq!(
            f.auth.login(none).await.unwrap_err(),
            LoginError::MissingPassword
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_challenge_checked_when_present() {
        let f = fixture(LoginPolicy::default());
        let token = sealed(&f.captcha, "2");

        let wrong = LoginAttempt {
            captcha_token: Some(token.clone()),
            captcha_answer: Some("3".to_string()),
            ..attempt(PASSWORD)
        };
        assert_eq!(
            f.auth.login(wrong).await.unwrap_err(),
            LoginError::ChallengeFailed(ChallengeError::IncorrectAnswer)
        );

        let right = LoginAttempt {
            captcha_token: Some(token),
            captcha_answer: Some(" 2 ".to_string()),
            ..attempt(PASSWORD)
        };
        assert!(f.auth.login(right).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_challenge_checked_before_password() {
        let f = fixture(LoginPolicy::default());
        let token = sealed(&f.captcha, "2");

        let started = tokio::time::Instant::now();
        let err = f
            .auth
            .login(LoginAttempt {
                captcha_token: Some(token),
                captcha_answer: Some("9".to_string()),
                ..attempt("wrong")
            })
            .await
            .unwrap_err();

        assert_eq!(
            err,
            LoginError::ChallengeFailed(ChallengeError::IncorrectAnswer)
        );
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_required_challenge_missing() {
        let f = fixture(LoginPolicy {
            require_captcha: true,
            ..LoginPolicy::default()
        });

        assert_eq!(
            f.auth.login(attempt(PASSWORD)).await.unwrap_err(),
            LoginError::ChallengeFailed(ChallengeError::Missing)
        );

        let token = sealed(&f.captcha, "2");
        let solved = LoginAttempt {
            captcha_token: Some(token),
            captcha_answer: Some("2".to_string()),
            ..attempt(PASSWORD)
        };
        assert!(f.auth.login(solved).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_is_authenticated() {
        let f = fixture(LoginPolicy::default());

        assert!(!f.auth.is_authenticated(None));
        assert!(!f.auth.is_authenticated(Some("")));
        assert!(!f.auth.is_authenticated(Some("garbage")));

        let token = f.auth.login(attempt(PASSWORD)).await.unwrap().session.token;
        f.clock.advance(Duration::from_secs(24 * 60 * 60 + 1));
        assert!(!f.auth.is_authenticated(Some(&token)));
    }

    #[test]
    fn test_rate_limited_message_rounds_up() {
        let err = LoginError::RateLimited {
            retry_after_secs: 61,
        };
        assert_eq!(
            err.to_string(),
            "Too many attempts. Please try again in 2 minutes."
        );

        let err = LoginError::RateLimited {
            retry_after_secs: 5,
        };
        assert_eq!(
            err.to_string(),
            "Too many attempts. Please try again in 1 minutes."
        );
    }
}
