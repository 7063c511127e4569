//! Secure key store capability traits.
//!
//! The device codec never touches private key material directly. It talks to a
//! [`SecureKeyStore`] that locates, generates and deletes P-256 key pairs by application
//! tag, and to the [`PrivateKeyHandle`]s the store hands out.
//!
//! Platform implementations should use hardware-backed keystores where available:
//! - iOS / macOS: Secure Enclave through Security.framework, falling back to the
//!   data-protection Keychain on devices without one
//! - Android: `StrongBox`, falling back to the TEE-backed Android Keystore
//! - Desktop: the OS credential store (see `KeyringKeyStore` behind the `keyring` feature)
//!
//! # Security Requirements
//!
//! - The private key MUST NOT be exportable from the handle.
//! - The [`AccessPolicy`] MUST be bound when the key is generated and MUST NOT be
//!   loosened afterwards.
//! - At most one key pair exists per tag at any time.

use std::fmt::Debug;
use std::sync::Arc;

use p256::PublicKey;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;
use zeroize::Zeroizing;

/// Status reported when no item matches a query (`errSecItemNotFound`).
pub const STATUS_ITEM_NOT_FOUND: i32 = -25300;

/// Status reported when an item with the same tag already exists (`errSecDuplicateItem`).
pub const STATUS_DUPLICATE_ITEM: i32 = -25299;

/// Status reported when the backing service cannot be reached (`errSecNotAvailable`).
pub const STATUS_NOT_AVAILABLE: i32 = -25291;

/// Status reported when the user dismissed an authentication prompt (`errSecUserCanceled`).
pub const STATUS_USER_CANCELED: i32 = -128;

/// Status reported when user authentication failed (`errSecAuthFailed`).
pub const STATUS_AUTH_FAILED: i32 = -25293;

/// Where the private key material lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    /// Isolated secure coprocessor; private key operations run inside it.
    Hardware,
    /// OS-protected software keystore.
    Software,
}

/// When the private key may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accessibility {
    /// Usable after the first unlock following a reboot; never migrates to another device.
    #[default]
    AfterFirstUnlockThisDeviceOnly,
    /// Usable only while the device is unlocked; never migrates to another device.
    WhenUnlockedThisDeviceOnly,
}

/// Access control bound to a private key when it is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPolicy {
    /// Every private key operation requires biometric or passcode verification.
    pub user_presence: bool,
    /// The key may be used for private key operations inside a secure coprocessor.
    pub private_key_usage: bool,
    /// Device-state condition under which the key is usable.
    pub accessibility: Accessibility,
}

impl AccessPolicy {
    /// Policy requiring user presence for every private key operation.
    #[must_use]
    pub const fn user_presence() -> Self {
        Self {
            user_presence: true,
            private_key_usage: false,
            accessibility: Accessibility::AfterFirstUnlockThisDeviceOnly,
        }
    }

    /// Policy with no user interaction. Only meant for unattended tests.
    #[must_use]
    pub const fn unattended() -> Self {
        Self {
            user_presence: false,
            private_key_usage: false,
            accessibility: Accessibility::AfterFirstUnlockThisDeviceOnly,
        }
    }

    /// Returns the policy with `private_key_usage` set, as required by hardware stores.
    #[must_use]
    pub const fn with_private_key_usage(mut self) -> Self {
        self.private_key_usage = true;
        self
    }
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::user_presence()
    }
}

/// Direction of a key operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum KeyOperation {
    /// Public key operation.
    Encrypt,
    /// Private key operation.
    Decrypt,
}

/// Asymmetric encryption algorithms understood by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
pub enum Algorithm {
    /// ECIES, cofactor ECDH, ANSI X9.63 KDF with SHA-256, AES-GCM payload.
    #[strum(serialize = "ecies-cofactor-x963-sha256-aesgcm")]
    EciesCofactorX963Sha256AesGcm,
}

/// Errors reported by key store backends.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeyStoreError {
    /// The backing service cannot be reached.
    #[error("key store unavailable: {0}")]
    Unavailable(String),
    /// The store refused the request (e.g. unsupported parameters or policy).
    #[error("key store rejected request: {0}")]
    Rejected(String),
    /// The store returned a non-success platform status code.
    #[error("key store status {0}")]
    Status(i32),
    /// The handle refers to a key that no longer exists in the store.
    #[error("key handle invalidated")]
    KeyInvalidated,
    /// Any other backend failure.
    #[error("key store backend error: {0}")]
    Backend(String),
}

impl KeyStoreError {
    /// Platform status code closest to this error, as reported to callers on deletion.
    #[must_use]
    pub const fn status_code(&self) -> i32 {
        match self {
            Self::Status(code) => *code,
            Self::KeyInvalidated => STATUS_ITEM_NOT_FOUND,
            Self::Unavailable(_) => STATUS_NOT_AVAILABLE,
            Self::Rejected(_) | Self::Backend(_) => -1,
        }
    }
}

/// Result type for key store operations.
pub type KeyStoreResult<T> = Result<T, KeyStoreError>;

/// Opaque reference to a private key held by a [`SecureKeyStore`].
///
/// The handle can report the matching public key and perform the private half of an
/// ECDH agreement. It never yields the private scalar.
pub trait PrivateKeyHandle: Send + Sync + Debug {
    /// Public key matching the private key.
    fn public_key(&self) -> PublicKey;

    /// Access policy bound when the key was generated.
    fn policy(&self) -> AccessPolicy;

    /// Where the key material lives.
    fn security_level(&self) -> SecurityLevel;

    /// Whether `algorithm` may be used for `operation` with this key pair.
    fn supports(&self, operation: KeyOperation, algorithm: Algorithm) -> bool;

    /// Computes the cofactor ECDH shared secret with `peer`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyStoreError::KeyInvalidated`] if the key was removed from the store after
    /// this handle was issued, or a backend error if the store refuses the operation.
    fn diffie_hellman(&self, peer: &PublicKey) -> KeyStoreResult<Zeroizing<[u8; 32]>>;
}

/// Store of tagged P-256 key pairs.
pub trait SecureKeyStore: Send + Sync {
    /// Where keys generated by this store live.
    fn security_level(&self) -> SecurityLevel;

    /// Whether the store can be used on this device.
    fn is_available(&self) -> bool {
        true
    }

    /// Looks up the private key stored under `tag`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried. A missing key is `Ok(None)`.
    fn find(&self, tag: &str) -> KeyStoreResult<Option<Arc<dyn PrivateKeyHandle>>>;

    /// Generates and persists a new key pair under `tag` with `policy` bound to it.
    ///
    /// # Errors
    ///
    /// Returns [`KeyStoreError::Status`] with [`STATUS_DUPLICATE_ITEM`] if a key already
    /// exists under `tag`, or [`KeyStoreError::Rejected`] if the parameters are refused.
    fn generate(&self, tag: &str, policy: &AccessPolicy)
        -> KeyStoreResult<Arc<dyn PrivateKeyHandle>>;

    /// Deletes the key pair stored under `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyStoreError::Status`] with [`STATUS_ITEM_NOT_FOUND`] if no key exists
    /// under `tag`, or another error if the deletion fails.
    fn delete(&self, tag: &str) -> KeyStoreResult<()>;
}
