//! Cryptographic primitives shared by the security core.
//!
//! - HMAC-SHA-256 signing for session tokens and the credential digest
//! - Constant-time byte comparison
//! - ChaCha20-Poly1305 authenticated encryption for challenge tokens

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use subtle::{Choice, ConstantTimeEq};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Length of an HMAC-SHA-256 tag in bytes.
pub const TAG_LEN: usize = 32;

/// Length of a symmetric key in bytes.
pub const KEY_LEN: usize = 32;

/// Length of an AEAD nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Crypto-related errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Encryption failed.
    #[error("encryption failed")]
    Encryption,

    /// Ciphertext failed authentication or could not be decrypted.
    #[error("decryption failed")]
    Decryption,

    /// Sealed box is too short to contain a nonce and tag.
    #[error("sealed box is truncated")]
    Truncated,
}

/// Compute HMAC-SHA-256 of `message` under `key`.
pub fn sign(message: &[u8], key: &[u8]) -> [u8; TAG_LEN] {
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(message);

    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    tag
}

/// Compute HMAC-SHA-256 of `message` under `key` as lowercase hex.
pub fn sign_hex(message: &[u8], key: &[u8]) -> String {
    hex::encode(sign(message, key))
}

/// Derive a 32-byte subkey for a specific purpose from a shared secret.
pub fn derive_key(secret: &[u8], label: &str) -> [u8; KEY_LEN] {
    sign(label.as_bytes(), secret)
}

/// Compare two byte slices without leaking where they first differ.
///
/// A length mismatch returns `false`, but the loop still runs over the longer
/// input so the comparison cost does not depend on the shorter one.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let len = a.len().max(b.len());
    let mut equal = Choice::from(1u8);

    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        equal &= x.ct_eq(&y);
    }

    let same_len = (a.len() as u64).ct_eq(&(b.len() as u64));
    bool::from(equal & same_len)
}

/// Nonce and ciphertext produced by [`encrypt`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBox {
    /// Random per-message nonce.
    pub nonce: [u8; NONCE_LEN],
    /// Ciphertext with the Poly1305 tag appended.
    pub ciphertext: Vec<u8>,
}

impl SealedBox {
    /// Serialize as `nonce || ciphertext`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(NONCE_LEN + self.ciphertext.len());
        out.extend_from_slice(&self.nonce);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    /// Parse `nonce || ciphertext`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        // 16 bytes of Poly1305 tag at minimum
        if bytes.len() < NONCE_LEN + 16 {
            return Err(CryptoError::Truncated);
        }

        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_LEN);
        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(nonce_bytes);

        Ok(Self {
            nonce,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

/// Encrypt `plaintext` under `key` with a fresh random nonce.
pub fn encrypt(plaintext: &[u8], key: &[u8; KEY_LEN]) -> Result<SealedBox, CryptoError> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));

    let mut nonce = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CryptoError::Encryption)?;

    Ok(SealedBox { nonce, ciphertext })
}

/// Decrypt and authenticate a [`SealedBox`].
pub fn decrypt(sealed: &SealedBox, key: &[u8; KEY_LEN]) -> Result<Vec<u8>, CryptoError> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));

    cipher
        .decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_slice())
        .map_err(|_| CryptoError::Decryption)
}
