//! Combined representation of a ChaCha20-Poly1305 sealed box.
//!
//! ```text
//! [nonce (12 bytes)][ciphertext][tag (16 bytes)]
//! ```
//!
//! Field boundaries are implied by the fixed nonce and tag sizes; no length prefix is written.

use crate::{Result, SeedKitError};

/// Size of the ChaCha20-Poly1305 nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the Poly1305 authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Shortest valid combined box (empty message).
pub const MIN_SEALED_LEN: usize = NONCE_LEN + TAG_LEN;

/// Borrowed view over a combined sealed box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SealedPayload<'a> {
    /// Nonce used when sealing.
    pub nonce: &'a [u8; NONCE_LEN],
    /// Ciphertext followed by the authentication tag.
    pub ciphertext_and_tag: &'a [u8],
}

impl<'a> SealedPayload<'a> {
    /// Splits combined bytes into nonce and ciphertext-with-tag.
    ///
    /// # Errors
    ///
    /// Returns [`SeedKitError::MalformedCiphertext`] if `bytes` is shorter than
    /// [`MIN_SEALED_LEN`].
    pub fn parse(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() < MIN_SEALED_LEN {
            return Err(SeedKitError::MalformedCiphertext {
                len: bytes.len(),
                min: MIN_SEALED_LEN,
            });
        }
        let (nonce, ciphertext_and_tag) = bytes.split_at(NONCE_LEN);
        let nonce = nonce
            .try_into()
            .map_err(|_| SeedKitError::MalformedCiphertext {
                len: bytes.len(),
                min: MIN_SEALED_LEN,
            })?;
        Ok(Self {
            nonce,
            ciphertext_and_tag,
        })
    }

    /// Length of the message that was sealed.
    #[must_use]
    pub const fn message_len(&self) -> usize {
        self.ciphertext_and_tag.len().saturating_sub(TAG_LEN)
    }

    /// Produces the combined representation.
    #[must_use]
    pub fn combine(nonce: &[u8; NONCE_LEN], ciphertext_and_tag: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext_and_tag.len());
        out.extend_from_slice(nonce);
        out.extend_from_slice(ciphertext_and_tag);
        out
    }
}
