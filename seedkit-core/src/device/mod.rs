//! Device-bound encryption.
//!
//! A [`HardwareBoundCodec`] keeps one P-256 key pair per application tag in a
//! [`SecureKeyStore`] and encrypts to it with ECIES (see [`ecies`]). The private half is
//! only ever reached through a [`PrivateKeyHandle`], and every private key operation on a
//! key bound to [`AccessPolicy::user_presence`] first goes through the host's
//! [`PresenceVerifier`].
//!
//! Stores shipped with the crate:
//! - [`MemoryKeyStore`]: process memory, for tests and unattended tools
//! - [`TieredKeyStore`]: routes to a hardware store when present, else to a fallback
//! - `KeyringKeyStore` (feature `keyring`): the OS credential store

mod codec;
mod config;
pub mod ecies;
#[cfg(feature = "keyring")]
mod keyring;
pub mod memory;
mod presence;
pub mod store;
mod tiered;

pub use codec::{HardwareBoundCodec, KeyPair, KeyState};
pub use config::{HardwareCodecConfig, DEFAULT_APPLICATION_TAG, DEFAULT_OPERATION_PROMPT};
#[cfg(feature = "keyring")]
pub use keyring::{KeyringKeyStore, DEFAULT_KEYRING_SERVICE};
pub use memory::MemoryKeyStore;
pub use presence::{AlwaysApprove, PresenceOutcome, PresenceVerifier, ScriptedVerifier};
pub use store::{
    AccessPolicy, Accessibility, Algorithm, KeyOperation, KeyStoreError, KeyStoreResult,
    PrivateKeyHandle, SecureKeyStore, SecurityLevel, STATUS_AUTH_FAILED, STATUS_DUPLICATE_ITEM,
    STATUS_ITEM_NOT_FOUND, STATUS_NOT_AVAILABLE, STATUS_USER_CANCELED,
};
pub use tiered::TieredKeyStore;
