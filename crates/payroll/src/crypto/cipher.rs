//! Field-level authenticated encryption.
//!
//! Each value is sealed with AES-256-GCM under a fresh random nonce. The
//! stored token is the URL-safe base64 (unpadded) encoding of
//! `nonce || ciphertext || tag`, so a single TEXT column holds everything
//! needed to open it again.

use std::fmt;

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

use super::key::EncryptionKey;
use crate::error::{Error, Result};

/// Nonce length for AES-GCM (96 bits).
const NONCE_LEN: usize = 12;

/// Authentication tag length for AES-GCM.
const TAG_LEN: usize = 16;

/// Encrypts and decrypts individual string values.
///
/// Stateless apart from the key schedule; cloning is cheap enough to hand one
/// to each component that needs it.
#[derive(Clone)]
pub struct FieldCipher {
    cipher: Aes256Gcm,
}

impl FieldCipher {
    /// Build a cipher for the given key.
    #[must_use]
    pub fn new(key: &EncryptionKey) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes())),
        }
    }

    /// Encrypt an optional value. `None` stays `None` and never touches the cipher.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encryption`] if the AEAD rejects the input.
    pub fn encrypt(&self, plaintext: Option<&str>) -> Result<Option<String>> {
        plaintext.map(|value| self.seal(value)).transpose()
    }

    /// Decrypt an optional token. `None` stays `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decryption`] if the token is malformed, was produced
    /// under another key, or has been tampered with.
    pub fn decrypt(&self, ciphertext: Option<&str>) -> Result<Option<String>> {
        ciphertext.map(|token| self.open(token)).transpose()
    }

    fn seal(&self, plaintext: &str) -> Result<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| Error::Encryption {
                reason: e.to_string(),
            })?;

        let mut token = Vec::with_capacity(NONCE_LEN + sealed.len());
        token.extend_from_slice(nonce.as_slice());
        token.extend_from_slice(&sealed);
        Ok(URL_SAFE_NO_PAD.encode(token))
    }

    fn open(&self, token: &str) -> Result<String> {
        let raw = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| Error::decryption(format!("token is not valid base64: {e}")))?;

        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(Error::decryption(format!(
                "token too short ({} bytes)",
                raw.len()
            )));
        }

        let (nonce, sealed) = raw.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| {
                Error::decryption("authentication failed (wrong key or tampered value)")
            })?;

        String::from_utf8(plaintext)
            .map_err(|e| Error::decryption(format!("plaintext is not UTF-8: {e}")))
    }
}

impl fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldCipher").finish_non_exhaustive()
    }
}
