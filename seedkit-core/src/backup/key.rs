//! Password-to-key derivation for the backup codec.

use secrecy::{ExposeSecret, SecretBox};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Length of the symmetric key in bytes.
pub const KEY_LEN: usize = 32;

/// Symmetric key derived from a backup password.
///
/// The key material is zeroized when the value is dropped and is never printed.
///
/// # Derivation
///
/// `key = ascii(lowercase_hex(SHA256(utf8(password)))[..32])`
///
/// The key is the first 32 *characters* of the hex digest, so it only carries 128 bits of
/// the digest. Backups written by existing clients depend on this exact scheme.
pub struct SymmetricKey(SecretBox<[u8; KEY_LEN]>);

impl SymmetricKey {
    /// Derives the key for `password`. Deterministic.
    #[must_use]
    pub fn derive(password: &str) -> Self {
        let digest = Sha256::digest(password.as_bytes());
        let hex_digest = zeroize::Zeroizing::new(hex::encode(digest));

        let mut key = Box::new([0u8; KEY_LEN]);
        key.copy_from_slice(&hex_digest.as_bytes()[..KEY_LEN]);
        Self(SecretBox::new(key))
    }

    /// Returns the raw key bytes. Treat this as sensitive material.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        self.0.expose_secret()
    }
}

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes().ct_eq(other.as_bytes()).into()
    }
}

impl Eq for SymmetricKey {}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}
