use crate::{backup::PasswordBackupCodec, Result};

/// Password-based backup codec exported to foreign languages.
///
/// Thin wrapper over [`PasswordBackupCodec`]; see there for the format.
#[derive(Debug, Default, Clone, Copy, uniffi::Object)]
pub struct BackupCodec(PasswordBackupCodec);

#[uniffi::export]
impl BackupCodec {
    /// Creates a new codec.
    #[uniffi::constructor]
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new() -> Self {
        Self(PasswordBackupCodec::new())
    }

    /// Seals `clear_text` under a key derived from `password`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SeedKitError::InvalidInput`] if `clear_text` is empty.
    pub fn encrypt(&self, clear_text: &str, password: &str) -> Result<Vec<u8>> {
        self.0.encrypt(clear_text, password)
    }

    /// Opens a sealed backup with a key derived from `password`.
    ///
    /// # Errors
    ///
    /// See [`PasswordBackupCodec::decrypt`].
    pub fn decrypt(&self, cipher_text: &[u8], password: &str) -> Result<String> {
        self.0.decrypt(cipher_text, password)
    }
}
