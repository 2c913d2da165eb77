//! Admin credential verification.
//!
//! The admin password is never kept in plaintext: at startup it is reduced to
//! an HMAC-SHA-256 digest keyed with the signing secret, and candidates are
//! digested the same way and compared in constant time.

use std::fmt;

use crate::crypto::{constant_time_eq, sign, TAG_LEN};

/// Digest a password under the signing secret.
///
/// The password is the HMAC message, never the key, so the secret is not
/// reused as key material anywhere the password could influence.
///
/// # Examples
///
/// ```
/// use journeylog::auth::hash_password;
///
/// let a = hash_password("changeme123", b"secret");
/// let b = hash_password("changeme123", b"secret");
/// assert_eq!(a, b);
/// assert_ne!(a, hash_password("changeme123", b"other-secret"));
/// ```
pub fn hash_password(password: &str, secret: &[u8]) -> [u8; TAG_LEN] {
    sign(password.as_bytes(), secret)
}

/// Constant-time check of candidate passwords against the stored digest.
#[derive(Clone)]
pub struct CredentialVerifier {
    digest: [u8; TAG_LEN],
    secret: Vec<u8>,
}

impl CredentialVerifier {
    /// Build a verifier for `password`, keeping only its digest.
    pub fn new(password: &str, secret: &[u8]) -> Self {
        Self {
            digest: hash_password(password, secret),
            secret: secret.to_vec(),
        }
    }

    /// Check a candidate password.
    pub fn verify(&self, candidate: &str) -> bool {
        let candidate = hash_password(candidate, &self.secret);
        constant_time_eq(&candidate, &self.digest)
    }
}

impl fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("digest", &"[redacted]")
            .finish()
    }
}
