//! Key store backed by the OS credential store.
//!
//! Dispatches through the `keyring` crate to:
//! - macOS / iOS: the login Keychain
//! - Linux: the D-Bus Secret Service (GNOME Keyring, KWallet)
//! - Windows: Credential Manager
//!
//! Each key pair is one credential (service, tag) holding a JSON record with the base64
//! secret scalar and the access policy bound at generation. Keys are software keys: the
//! scalar is loaded into process memory for the agreement and zeroized afterwards.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use p256::{ecdh::diffie_hellman, PublicKey, SecretKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use super::store::{
    AccessPolicy, Algorithm, KeyOperation, KeyStoreError, KeyStoreResult, PrivateKeyHandle,
    SecureKeyStore, SecurityLevel, STATUS_DUPLICATE_ITEM, STATUS_ITEM_NOT_FOUND,
};

/// Service name credentials are filed under unless overridden.
pub const DEFAULT_KEYRING_SERVICE: &str = "seedkit";

const RECORD_VERSION: u8 = 1;

const AVAILABILITY_CHECK_TAG: &str = "availability-check";

#[derive(Serialize, Deserialize)]
struct StoredKeyRecord {
    version: u8,
    secret: String,
    policy: AccessPolicy,
}

impl Drop for StoredKeyRecord {
    fn drop(&mut self) {
        self.secret.zeroize();
    }
}

impl StoredKeyRecord {
    fn new(secret: &SecretKey, policy: AccessPolicy) -> Self {
        let mut scalar = secret.to_bytes();
        let encoded = STANDARD.encode(scalar);
        scalar.as_mut_slice().zeroize();
        Self {
            version: RECORD_VERSION,
            secret: encoded,
            policy,
        }
    }

    fn encode(&self) -> KeyStoreResult<Zeroizing<String>> {
        serde_json::to_string(self)
            .map(Zeroizing::new)
            .map_err(|err| KeyStoreError::Backend(format!("failed to encode key record: {err}")))
    }

    fn decode(raw: &str) -> KeyStoreResult<Self> {
        let record: Self = serde_json::from_str(raw)
            .map_err(|err| KeyStoreError::Backend(format!("corrupt key record: {err}")))?;
        if record.version != RECORD_VERSION {
            return Err(KeyStoreError::Backend(format!(
                "unsupported key record version {}",
                record.version
            )));
        }
        Ok(record)
    }

    fn secret_key(&self) -> KeyStoreResult<SecretKey> {
        let bytes = Zeroizing::new(
            STANDARD
                .decode(&self.secret)
                .map_err(|err| KeyStoreError::Backend(format!("corrupt key record: {err}")))?,
        );
        SecretKey::from_slice(&bytes)
            .map_err(|_| KeyStoreError::Backend("corrupt key record: invalid scalar".to_string()))
    }
}

/// [`SecureKeyStore`] persisting key pairs in the OS credential store.
#[derive(Debug, Clone)]
pub struct KeyringKeyStore {
    service: String,
}

impl KeyringKeyStore {
    /// Store filing credentials under [`DEFAULT_KEYRING_SERVICE`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_service(DEFAULT_KEYRING_SERVICE)
    }

    /// Store filing credentials under `service`.
    #[must_use]
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, tag: &str) -> KeyStoreResult<keyring::Entry> {
        keyring::Entry::new(&self.service, tag).map_err(|err| map_keyring_error(&err))
    }

    fn read(&self, tag: &str) -> KeyStoreResult<Option<StoredKeyRecord>> {
        match self.entry(tag)?.get_password() {
            Ok(raw) => {
                let raw = Zeroizing::new(raw);
                StoredKeyRecord::decode(&raw).map(Some)
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(err) => Err(map_keyring_error(&err)),
        }
    }
}

impl Default for KeyringKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecureKeyStore for KeyringKeyStore {
    fn security_level(&self) -> SecurityLevel {
        SecurityLevel::Software
    }

    /// Looks up a fixed entry in the credential store. A missing entry means the store answered;
    /// a locked, absent or unreachable backend reports the store as unavailable.
    fn is_available(&self) -> bool {
        let lookup = match keyring::Entry::new(&self.service, AVAILABILITY_CHECK_TAG) {
            Ok(entry) => entry.get_password().map(|raw| drop(Zeroizing::new(raw))),
            Err(err) => Err(err),
        };
        match lookup {
            Ok(()) | Err(keyring::Error::NoEntry) => true,
            Err(err) => {
                tracing::debug!(
                    service = %self.service,
                    error = %err,
                    "credential store unavailable"
                );
                false
            }
        }
    }

    fn find(&self, tag: &str) -> KeyStoreResult<Option<Arc<dyn PrivateKeyHandle>>> {
        let Some(record) = self.read(tag)? else {
            return Ok(None);
        };
        let handle = KeyringKeyHandle {
            store: self.clone(),
            tag: tag.to_string(),
            public_key: record.secret_key()?.public_key(),
            policy: record.policy,
        };
        Ok(Some(Arc::new(handle)))
    }

    fn generate(
        &self,
        tag: &str,
        policy: &AccessPolicy,
    ) -> KeyStoreResult<Arc<dyn PrivateKeyHandle>> {
        if self.read(tag)?.is_some() {
            return Err(KeyStoreError::Status(STATUS_DUPLICATE_ITEM));
        }

        let secret = SecretKey::random(&mut OsRng);
        let encoded = StoredKeyRecord::new(&secret, *policy).encode()?;
        self.entry(tag)?
            .set_password(&encoded)
            .map_err(|err| map_keyring_error(&err))?;
        tracing::info!(service = %self.service, %tag, "stored key pair in OS credential store");

        Ok(Arc::new(KeyringKeyHandle {
            store: self.clone(),
            tag: tag.to_string(),
            public_key: secret.public_key(),
            policy: *policy,
        }))
    }

    fn delete(&self, tag: &str) -> KeyStoreResult<()> {
        match self.entry(tag)?.delete_password() {
            Ok(()) => {
                tracing::warn!(
                    service = %self.service,
                    %tag,
                    "key pair removed from OS credential store"
                );
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Err(KeyStoreError::Status(STATUS_ITEM_NOT_FOUND)),
            Err(err) => Err(map_keyring_error(&err)),
        }
    }
}

/// Handle to a credential-store key pair. The scalar is re-read for every agreement.
struct KeyringKeyHandle {
    store: KeyringKeyStore,
    tag: String,
    public_key: PublicKey,
    policy: AccessPolicy,
}

impl std::fmt::Debug for KeyringKeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringKeyHandle")
            .field("service", &self.store.service)
            .field("tag", &self.tag)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl PrivateKeyHandle for KeyringKeyHandle {
    fn public_key(&self) -> PublicKey {
        self.public_key
    }

    fn policy(&self) -> AccessPolicy {
        self.policy
    }

    fn security_level(&self) -> SecurityLevel {
        SecurityLevel::Software
    }

    fn supports(&self, _operation: KeyOperation, algorithm: Algorithm) -> bool {
        matches!(algorithm, Algorithm::EciesCofactorX963Sha256AesGcm)
    }

    fn diffie_hellman(&self, peer: &PublicKey) -> KeyStoreResult<Zeroizing<[u8; 32]>> {
        let record = self
            .store
            .read(&self.tag)?
            .ok_or(KeyStoreError::KeyInvalidated)?;
        let secret = record.secret_key()?;
        // Deleted and regenerated under the same tag.
        if secret.public_key() != self.public_key {
            return Err(KeyStoreError::KeyInvalidated);
        }

        let shared = diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
        let mut out = Zeroizing::new([0u8; 32]);
        out.copy_from_slice(shared.raw_secret_bytes());
        Ok(out)
    }
}

fn map_keyring_error(err: &keyring::Error) -> KeyStoreError {
    match err {
        keyring::Error::NoEntry => KeyStoreError::Status(STATUS_ITEM_NOT_FOUND),
        keyring::Error::NoStorageAccess(_) | keyring::Error::PlatformFailure(_) => {
            KeyStoreError::Unavailable(err.to_string())
        }
        other => KeyStoreError::Backend(other.to_string()),
    }
}
