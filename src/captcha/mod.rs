//! Self-contained human-verification challenges.
//!
//! The engine keeps no state between issuing and checking a challenge: the
//! normalized answer and its expiry are sealed into the token handed to the
//! client, so any instance holding the same secret can verify it. A token may
//! be verified more than once until it expires.

mod challenge;

pub use challenge::{Challenge, ChallengeKind};

use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::crypto::{decrypt, derive_key, encrypt, CryptoError, SealedBox, KEY_LEN};

/// Default lifetime of a challenge (5 minutes).
pub const DEFAULT_CHALLENGE_TTL_SECS: u64 = 5 * 60;

const KEY_LABEL: &str = "challenge-encryption";

/// Challenge verification errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeError {
    /// Token or answer was not supplied.
    #[error("Missing CAPTCHA token or answer")]
    Missing,

    /// Token could not be decoded, decrypted or parsed.
    #[error("Invalid CAPTCHA token")]
    InvalidToken,

    /// Token is past its expiry.
    #[error("CAPTCHA expired. Please refresh.")]
    Expired,

    /// Answer does not match.
    #[error("Incorrect answer. Please try again.")]
    IncorrectAnswer,
}

/// A challenge ready to be shown to a visitor.
#[derive(Debug, Clone)]
pub struct ChallengeTicket {
    /// Opaque token carrying the sealed answer.
    pub token: String,
    /// Kind of challenge.
    pub kind: ChallengeKind,
    /// Icon for the challenge kind.
    pub icon: &'static str,
    /// Question text.
    pub question: String,
    /// Answer format hint.
    pub hint: &'static str,
    /// Seconds until the token expires.
    pub expires_in_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct SealedAnswer {
    answer: String,
    exp: i64,
}

/// Generates and verifies challenges.
pub struct CaptchaEngine {
    key: [u8; KEY_LEN],
    ttl: Duration,
    kinds: Vec<ChallengeKind>,
    clock: Arc<dyn Clock>,
}

impl CaptchaEngine {
    /// Create an engine whose encryption key is derived from `secret`.
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: derive_key(secret, KEY_LABEL),
            ttl: Duration::from_secs(DEFAULT_CHALLENGE_TTL_SECS),
            kinds: ChallengeKind::ALL.to_vec(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Set how long an issued challenge stays valid.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Use a custom clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Restrict generation to the given kinds. An empty list keeps all kinds.
    pub fn with_kinds(mut self, kinds: &[ChallengeKind]) -> Self {
        if !kinds.is_empty() {
            self.kinds = kinds.to_vec();
        }
        self
    }

    /// Challenge lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Generate a fresh challenge of a uniformly chosen kind.
    pub fn generate(&self) -> Result<ChallengeTicket, CryptoError> {
        let mut rng = rand::rng();
        let kind = self.kinds[rng.random_range(0..self.kinds.len())];
        let challenge = kind.generate(&mut rng);
        let token = self.seal(&challenge)?;

        debug!(kind = kind.as_str(), "Generated challenge");

        Ok(ChallengeTicket {
            token,
            kind,
            icon: kind.icon(),
            question: challenge.question,
            hint: kind.hint(),
            expires_in_seconds: self.ttl.as_secs(),
        })
    }

    /// Seal a challenge's answer into a token expiring after the TTL.
    pub fn seal(&self, challenge: &Challenge) -> Result<String, CryptoError> {
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        let payload = SealedAnswer {
            answer: normalize(&challenge.answer),
            exp: self.clock.now_millis().saturating_add(ttl_ms),
        };
        let plaintext = serde_json::to_vec(&payload).map_err(|_| CryptoError::Encryption)?;
        let sealed = encrypt(&plaintext, &self.key)?;

        Ok(URL_SAFE_NO_PAD.encode(sealed.to_bytes()))
    }

    /// Check `answer` against the answer sealed in `token`.
    pub fn verify(&self, token: &str, answer: &str) -> Result<(), ChallengeError> {
        if token.trim().is_empty() || answer.trim().is_empty() {
            return Err(ChallengeError::Missing);
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| ChallengeError::InvalidToken)?;
        let sealed = SealedBox::from_bytes(&bytes).map_err(|_| ChallengeError::InvalidToken)?;
        let plaintext = decrypt(&sealed, &self.key).map_err(|_| ChallengeError::InvalidToken)?;
        let payload: SealedAnswer =
            serde_json::from_slice(&plaintext).map_err(|_| ChallengeError::InvalidToken)?;

        if self.clock.now_millis() > payload.exp {
            return Err(ChallengeError::Expired);
        }

        if normalize(answer) != payload.answer {
            return Err(ChallengeError::IncorrectAnswer);
        }

        Ok(())
    }
}

impl std::fmt::Debug for CaptchaEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptchaEngine")
            .field("ttl", &self.ttl)
            .field("kinds", &self.kinds)
            .finish_non_exhaustive()
    }
}

fn normalize(answer: &str) -> String {
    answer.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn engine() -> (CaptchaEngine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let engine = CaptchaEngine::new(b"captcha-test-secret").with_clock(clock.clone());
        (engine, clock)
    }

    fn challenge(answer: &str) -> Challenge {
        Challenge {
            kind: ChallengeKind::Reverse,
            question: "Reverse the word: \"olleh\"".to_string(),
            answer: answer.to_string(),
        }
    }

    #[test]
    fn test_correct_answer_verifies() {
        let (engine, _clock) = engine();
        let token = engine.seal(&challenge("hello")).unwrap();

        assert_eq!(engine.verify(&token, "hello"), Ok(()));
        assert_eq!(engine.verify(&token, "  HeLLo \n"), Ok(()));
    }

    #[test]
    fn test_token_is_reusable_until_expiry() {
        let (engine, _clock) = engine();
        let token = engine.seal(&challenge("7")).unwrap();

        assert!(engine.verify(&token, "7").is_ok());
        assert!(engine.verify(&token, "7").is_ok());
    }

    #[test]
    fn test_wrong_answer_fails() {
        let (engine, _clock) = engine();
        let token = engine.seal(&challenge("42")).unwrap();

        assert_eq!(
            engine.verify(&token, "41"),
            Err(ChallengeError::IncorrectAnswer)
        );
        assert_eq!(
            engine.verify(&token, "4 2"),
            Err(ChallengeError::IncorrectAnswer)
        );
    }

    #[test]
    fn test_expired_token() {
        let (engine, clock) = engine();
        let token = engine.seal(&challenge("blue")).unwrap();

        clock.advance(Duration::from_secs(DEFAULT_CHALLENGE_TTL_SECS));
        assert!(engine.verify(&token, "blue").is_ok());

        clock.advance(Duration::from_millis(1));
        assert_eq!(engine.verify(&token, "blue"), Err(ChallengeError::Expired));
    }

    #[test]
    fn test_missing_inputs() {
        let (engine, _clock) = engine();
        let token = engine.seal(&challenge("x")).unwrap();

        assert_eq!(engine.verify("", "x"), Err(ChallengeError::Missing));
        assert_eq!(engine.verify(&token, ""), Err(ChallengeError::Missing));
        assert_eq!(engine.verify(&token, "   "), Err(ChallengeError::Missing));
    }

    #[test]
    fn test_invalid_tokens() {
        let (engine, _clock) = engine();

        let zeros = URL_SAFE_NO_PAD.encode([0u8; 64]);

        for token in ["not base64 at all!", "AAAA", zeros.as_str()] {
            assert_eq!(
                engine.verify(token, "1"),
                Err(ChallengeError::InvalidToken),
                "{token}"
            );
        }
    }

    #[test]
    fn test_tampered_token_is_invalid() {
        let (engine, _clock) = engine();
        let token = engine.seal(&challenge("green")).unwrap();

        let mut bytes = URL_SAFE_NO_PAD.decode(&token).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x80;
        let tampered = URL_SAFE_NO_PAD.encode(bytes);

        assert_eq!(
            engine.verify(&tampered, "green"),
            Err(ChallengeError::InvalidToken)
        );
    }

    #[test]
    fn test_token_from_other_secret_is_invalid() {
        let (engine, clock) = engine();
        let other = CaptchaEngine::new(b"different-secret").with_clock(clock);
        let token = other.seal(&challenge("api")).unwrap();

        assert_eq!(
            engine.verify(&token, "api"),
            Err(ChallengeError::InvalidToken)
        );
    }

    #[test]
    fn test_token_does_not_leak_answer() {
        let (engine, _clock) = engine();
        let token = engine.seal(&challenge("supersecretanswer")).unwrap();
        let bytes = URL_SAFE_NO_PAD.decode(&token).unwrap();

        assert!(!token.contains("supersecretanswer"));
        assert!(!bytes
            .windows("supersecretanswer".len())
            .any(|w| w == b"supersecretanswer"));
    }

    #[test]
    fn test_generate_populates_ticket() {
        let (engine, _clock) = engine();
        let ticket = engine.generate().unwrap();

        assert!(!ticket.token.is_empty());
        assert!(!ticket.question.is_empty());
        assert_eq!(ticket.icon, ticket.kind.icon());
        assert_eq!(ticket.hint, ticket.kind.hint());
        assert_eq!(ticket.expires_in_seconds, DEFAULT_CHALLENGE_TTL_SECS);
        assert_eq!(
            engine.verify(&ticket.token, "definitely-not-the-answer"),
            Err(ChallengeError::IncorrectAnswer)
        );
    }

    #[test]
    fn test_with_kinds_restricts_generation() {
        let (engine, _clock) = engine();
        let engine = engine.with_kinds(&[ChallengeKind::MathAdd]);

        for _ in 0..20 {
            assert_eq!(engine.generate().unwrap().kind, ChallengeKind::MathAdd);
        }
    }

    #[test]
    fn test_generated_answer_round_trip() {
        let (engine, _clock) = engine();
        let mut rng = rand::rng();

        for kind in ChallengeKind::ALL {
            let challenge = kind.generate(&mut rng);
            let token = engine.seal(&challenge).unwrap();
            assert_eq!(engine.verify(&token, &challenge.answer), Ok(()), "{kind:?}");
        }
    }

    #[test]
    fn test_custom_ttl() {
        let (engine, clock) = engine();
        let engine = engine.with_ttl(Duration::from_secs(10));
        let token = engine.seal(&challenge("safe")).unwrap();

        clock.advance(Duration::from_secs(11));
        assert_eq!(engine.verify(&token, "safe"), Err(ChallengeError::Expired));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ChallengeError::Expired.to_string(),
            "CAPTCHA expired. Please refresh."
        );
        assert_eq!(
            ChallengeError::IncorrectAnswer.to_string(),
            "Incorrect answer. Please try again."
        );
    }
}
