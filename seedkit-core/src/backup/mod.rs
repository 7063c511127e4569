//! Password-based backup codec.
//!
//! Backups are sealed with ChaCha20-Poly1305 under a [`SymmetricKey`] derived from the
//! user's password. The output can be opened on any device that knows the password.

mod key;
mod sealed;

pub use key::{SymmetricKey, KEY_LEN};
pub use sealed::{SealedPayload, MIN_SEALED_LEN, NONCE_LEN, TAG_LEN};

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroizing;

use crate::{Result, SeedKitError};

/// Seals and opens a secret under a password-derived key.
///
/// The codec holds no state; keys are derived per call and dropped (zeroized) before
/// returning.
#[derive(Debug, Default, Clone, Copy)]
pub struct PasswordBackupCodec;

impl PasswordBackupCodec {
    /// Creates a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Derives the symmetric key used for `password`.
    ///
    /// See [`SymmetricKey`] for the exact scheme.
    #[must_use]
    pub fn derive_key(password: &str) -> SymmetricKey {
        SymmetricKey::derive(password)
    }

    /// Encrypts `clear_text` with a key derived from `password`.
    ///
    /// A fresh random nonce is drawn for every call, so encrypting the same input twice
    /// produces different outputs.
    ///
    /// # Returns
    ///
    /// The combined sealed box: `nonce (12) || ciphertext || tag (16)`.
    ///
    /// # Errors
    ///
    /// Returns [`SeedKitError::InvalidInput`] if `clear_text` is empty.
    #[allow(clippy::unused_self)]
    pub fn encrypt(&self, clear_text: &str, password: &str) -> Result<Vec<u8>> {
        if clear_text.is_empty() {
            tracing::debug!("refusing to seal empty backup payload");
            return Err(SeedKitError::InvalidInput(
                "clear text must not be empty".to_string(),
            ));
        }

        let key = Self::derive_key(password);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), clear_text.as_bytes())
            .map_err(|err| SeedKitError::InvalidInput(format!("seal failed: {err}")))?;

        tracing::debug!(
            message_len = clear_text.len(),
            sealed_len = NONCE_LEN + ciphertext.len(),
            "sealed backup payload"
        );
        Ok(SealedPayload::combine(&nonce, &ciphertext))
    }

    /// Decrypts a combined sealed box produced by [`PasswordBackupCodec::encrypt`].
    ///
    /// # Errors
    ///
    /// - [`SeedKitError::MalformedCiphertext`] if the input is shorter than nonce + tag.
    /// - [`SeedKitError::AuthenticationFailed`] if the tag does not verify. This covers
    ///   both a wrong password and a corrupted or truncated box.
    /// - [`SeedKitError::DecodingError`] if the opened bytes are not UTF-8.
    #[allow(clippy::unused_self)]
    pub fn decrypt(&self, cipher_text: &[u8], password: &str) -> Result<String> {
        let payload = SealedPayload::parse(cipher_text).inspect_err(|_| {
            tracing::debug!(sealed_len = cipher_text.len(), "backup payload too short");
        })?;

        let key = Self::derive_key(password);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));

        let opened = cipher
            .decrypt(Nonce::from_slice(payload.nonce), payload.ciphertext_and_tag)
            .map(Zeroizing::new)
            .map_err(|_| {
                tracing::debug!(sealed_len = cipher_text.len(), "backup payload rejected");
                SeedKitError::AuthenticationFailed
            })?;

        let clear_text =
            std::str::from_utf8(&opened).map_err(|_| SeedKitError::DecodingError)?;
        tracing::debug!(message_len = clear_text.len(), "opened backup payload");
        Ok(clear_text.to_owned())
    }
}
