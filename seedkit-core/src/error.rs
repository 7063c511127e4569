use thiserror::Error;

/// Result alias used by every codec operation.
pub type Result<T> = std::result::Result<T, SeedKitError>;

/// Error outputs from `SeedKit`.
///
/// Every variant is terminal for the call that produced it; nothing is retried internally.
/// A wrong password and a tampered ciphertext both surface as
/// [`SeedKitError::AuthenticationFailed`].
#[derive(Debug, Error, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
#[cfg_attr(feature = "ffi", uniffi(flat_error))]
pub enum SeedKitError {
    /// The presented input is not valid for the requested operation
    #[error("invalid_input: {0}")]
    InvalidInput(String),
    /// The ciphertext cannot be split into its fixed-size components
    #[error("malformed_ciphertext: {len} bytes, expected at least {min}")]
    MalformedCiphertext {
        /// Length of the rejected input.
        len: usize,
        /// Minimum length accepted by the scheme.
        min: usize,
    },
    /// The authentication tag did not verify (wrong key or corrupted data)
    #[error("authentication_failed")]
    AuthenticationFailed,
    /// The recovered plaintext is not valid UTF-8
    #[error("decoding_error")]
    DecodingError,
    /// The secure key store could not be queried
    #[error("key_provisioning_failed: {0}")]
    KeyProvisioningFailed(String),
    /// The secure key store rejected the key generation parameters
    #[error("key_generation_failed: {0}")]
    KeyGenerationFailed(String),
    /// The current key cannot be used with the ECIES scheme
    #[error("algorithm_unsupported: {0}")]
    AlgorithmUnsupported(String),
    /// No usable private key handle is held
    #[error("no_private_key")]
    NoPrivateKey,
    /// Presence verification was denied, cancelled or timed out
    #[error("user_cancelled_or_auth_failed")]
    UserCancelledOrAuthFailed,
    /// The secure key store reported a non-success status while deleting
    #[error("deletion_failed: status {0}")]
    DeletionFailed(i32),
}
