//! Protection of a mnemonic seed phrase at rest.
//!
//! Two independent codecs are provided:
//!
//! - [`backup::PasswordBackupCodec`] seals the phrase with ChaCha20-Poly1305 under a key
//!   derived from a user password. The output is portable and can be opened on any device
//!   that knows the password.
//! - [`device::HardwareBoundCodec`] encrypts the phrase to a P-256 key pair held by a
//!   [`device::SecureKeyStore`]. The private half never leaves the store and every private
//!   key operation is gated by a [`device::PresenceVerifier`].
//!
//! ```rust
//! use seedkit_core::backup::PasswordBackupCodec;
//!
//! let codec = PasswordBackupCodec::new();
//! let sealed = codec.encrypt("dove lumber quote board", "correct-password").unwrap();
//! let opened = codec.decrypt(&sealed, "correct-password").unwrap();
//! assert_eq!(opened, "dove lumber quote board");
//! ```
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

mod error;
pub use error::*;

pub mod backup;
pub mod device;
/// Forwarding of log output to a host-provided logger.
pub mod logger;

#[cfg(feature = "ffi")]
mod ffi;
#[cfg(feature = "ffi")]
pub use ffi::*;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!("seedkit_core");
