//! Device-bound codec state machine.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use p256::{elliptic_curve::sec1::ToEncodedPoint, PublicKey};
use super::config::HardwareCodecConfig;
use super::ecies;
use super::presence::PresenceVerifier;
use super::store::{
    AccessPolicy, Algorithm, KeyOperation, KeyStoreError, PrivateKeyHandle, SecureKeyStore,
    SecurityLevel, STATUS_AUTH_FAILED, STATUS_DUPLICATE_ITEM, STATUS_ITEM_NOT_FOUND,
    STATUS_USER_CANCELED,
};
use crate::{Result, SeedKitError};

const ALGORITHM: Algorithm = Algorithm::EciesCofactorX963Sha256AesGcm;

/// Whether the codec currently holds a key pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum KeyState {
    /// No key pair is held. The next operation provisions one.
    NoKey,
    /// A key pair is held and operations use it.
    KeyExists,
}

/// Public key plus a handle to the matching private key in the secure store.
#[derive(Debug, Clone)]
pub struct KeyPair {
    tag: String,
    public_key: PublicKey,
    private_key: Arc<dyn PrivateKeyHandle>,
}

impl KeyPair {
    fn new(tag: &str, private_key: Arc<dyn PrivateKeyHandle>) -> Self {
        Self {
            tag: tag.to_string(),
            public_key: private_key.public_key(),
            private_key,
        }
    }

    /// Application tag the pair is stored under.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Public half of the pair.
    #[must_use]
    pub const fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Public key as an uncompressed SEC1 point (65 bytes).
    #[must_use]
    pub fn public_key_sec1(&self) -> Vec<u8> {
        self.public_key.to_encoded_point(false).as_bytes().to_vec()
    }

    /// Access policy bound to the private key.
    #[must_use]
    pub fn policy(&self) -> AccessPolicy {
        self.private_key.policy()
    }

    /// Where the private key lives.
    #[must_use]
    pub fn security_level(&self) -> SecurityLevel {
        self.private_key.security_level()
    }
}

/// Encrypts strings to a key pair whose private half never leaves the secure store.
///
/// The codec provisions a P-256 key pair under the configured application tag on first use
/// and reuses it afterwards. Encryption only needs the public key. Decryption asks the
/// [`PresenceVerifier`] first whenever the key's access policy requires user presence.
///
/// Provisioning is serialized per codec. Concurrent callers on the same codec either all
/// observe the existing key or wait for the single generation in flight. Codecs sharing a
/// store that race to generate under the same tag all end up with the pair that won.
pub struct HardwareBoundCodec {
    store: Arc<dyn SecureKeyStore>,
    verifier: Arc<dyn PresenceVerifier>,
    config: HardwareCodecConfig,
    current: Mutex<Option<KeyPair>>,
}

impl std::fmt::Debug for HardwareBoundCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HardwareBoundCodec")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl HardwareBoundCodec {
    /// Creates a codec and looks up (or generates) its key pair.
    ///
    /// # Errors
    ///
    /// Returns [`SeedKitError::KeyProvisioningFailed`] if the store cannot be queried and
    /// [`SeedKitError::KeyGenerationFailed`] if a new key pair cannot be created.
    pub fn initialize(
        store: Arc<dyn SecureKeyStore>,
        verifier: Arc<dyn PresenceVerifier>,
        config: HardwareCodecConfig,
    ) -> Result<Self> {
        let codec = Self {
            store,
            verifier,
            config,
            current: Mutex::new(None),
        };
        codec.lookup_or_create_key_pair()?;
        Ok(codec)
    }

    /// Settings the codec was created with.
    #[must_use]
    pub const fn config(&self) -> &HardwareCodecConfig {
        &self.config
    }

    /// Current key state.
    #[must_use]
    pub fn state(&self) -> KeyState {
        if self.guard().is_some() {
            KeyState::KeyExists
        } else {
            KeyState::NoKey
        }
    }

    /// Queries the store for the key pair under the application tag, generating one if it
    /// is missing. Repeated calls return the same pair.
    ///
    /// # Errors
    ///
    /// Returns [`SeedKitError::KeyProvisioningFailed`] if the store cannot be queried and
    /// [`SeedKitError::KeyGenerationFailed`] if a new key pair cannot be created.
    pub fn lookup_or_create_key_pair(&self) -> Result<KeyPair> {
        let mut current = self.guard();
        self.provision(&mut current)
    }

    /// Public key of the current pair as an uncompressed SEC1 point, provisioning if needed.
    ///
    /// # Errors
    ///
    /// Same as [`Self::lookup_or_create_key_pair`].
    pub fn public_key_sec1(&self) -> Result<Vec<u8>> {
        Ok(self.current_key_pair()?.public_key_sec1())
    }

    /// Encrypts `clear_text` to the device key pair.
    ///
    /// No user interaction happens here. The output is
    /// `ephemeral public key (65) || ciphertext || tag (16)`.
    ///
    /// # Errors
    ///
    /// - Provisioning errors if no key pair is held and none can be obtained.
    /// - [`SeedKitError::AlgorithmUnsupported`] if the key pair cannot be used for ECIES.
    pub fn encrypt(&self, clear_text: &str) -> Result<Vec<u8>> {
        let pair = self.current_key_pair()?;
        if !pair.private_key.supports(KeyOperation::Encrypt, ALGORITHM) {
            return Err(SeedKitError::AlgorithmUnsupported(format!(
                "{ALGORITHM} not supported for encryption"
            )));
        }

        let blob = ecies::seal(&pair.public_key, clear_text.as_bytes())?;
        tracing::debug!(tag = %pair.tag, len = blob.len(), "encrypted with device key");
        Ok(blob)
    }

    /// Decrypts a blob produced by [`Self::encrypt`].
    ///
    /// When the key requires user presence, the verifier is consulted once the blob has
    /// been parsed and before the private key is used.
    ///
    /// # Errors
    ///
    /// - [`SeedKitError::AlgorithmUnsupported`] if the key pair cannot be used for ECIES.
    /// - [`SeedKitError::MalformedCiphertext`] if the blob is structurally invalid.
    /// - [`SeedKitError::UserCancelledOrAuthFailed`] if presence verification is not approved.
    /// - [`SeedKitError::NoPrivateKey`] if the private key was removed from the store.
    /// - [`SeedKitError::AuthenticationFailed`] if the blob was not encrypted to this key or
    ///   was tampered with.
    /// - [`SeedKitError::DecodingError`] if the clear text is not valid UTF-8.
    pub fn decrypt(&self, cipher_text: &[u8]) -> Result<String> {
        let pair = self.current_key_pair()?;
        let handle = &pair.private_key;
        if !handle.supports(KeyOperation::Decrypt, ALGORITHM) {
            return Err(SeedKitError::AlgorithmUnsupported(format!(
                "{ALGORITHM} not supported for decryption"
            )));
        }

        let clear = ecies::open(cipher_text, |ephemeral| {
            if handle.policy().user_presence {
                self.verify_presence()?;
            }
            handle
                .diffie_hellman(ephemeral)
                .map_err(|err| map_private_key_error(&err))
        })?;

        let clear_text = decode_utf8(&clear)?;
        tracing::debug!(tag = %pair.tag, "decrypted with device key");
        Ok(clear_text)
    }

    /// Removes the key pair from the store.
    ///
    /// Everything encrypted to the old pair becomes permanently undecryptable. The next
    /// operation provisions a fresh pair.
    ///
    /// # Errors
    ///
    /// Returns [`SeedKitError::DeletionFailed`] carrying the store's status code, e.g.
    /// `-25300` when no key exists under the tag. The held state is left unchanged.
    pub fn delete_key_pair(&self) -> Result<()> {
        let mut current = self.guard();
        let tag = &self.config.application_tag;
        self.store.delete(tag).map_err(|err| {
            tracing::warn!(%tag, error = %err, "key pair deletion failed");
            SeedKitError::DeletionFailed(err.status_code())
        })?;
        *current = None;
        drop(current);
        tracing::warn!(%tag, "key pair deleted, existing ciphertexts are unrecoverable");
        Ok(())
    }

    fn guard(&self) -> MutexGuard<'_, Option<KeyPair>> {
        // The slot is only ever replaced wholesale, so a poisoned guard still holds a
        // consistent value.
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn current_key_pair(&self) -> Result<KeyPair> {
        let mut current = self.guard();
        if let Some(pair) = current.as_ref() {
            return Ok(pair.clone());
        }
        self.provision(&mut current)
    }

    fn provision(&self, slot: &mut Option<KeyPair>) -> Result<KeyPair> {
        let tag = self.config.application_tag.as_str();
        let handle = if let Some(handle) = self.find(tag)? {
            tracing::debug!(%tag, "using existing key pair");
            handle
        } else {
            self.generate(tag)?
        };

        let pair = KeyPair::new(tag, handle);
        *slot = Some(pair.clone());
        Ok(pair)
    }

    fn find(&self, tag: &str) -> Result<Option<Arc<dyn PrivateKeyHandle>>> {
        self.store.find(tag).map_err(|err| {
            tracing::error!(%tag, error = %err, "key pair lookup failed");
            SeedKitError::KeyProvisioningFailed(err.to_string())
        })
    }

    fn generate(&self, tag: &str) -> Result<Arc<dyn PrivateKeyHandle>> {
        tracing::info!(
            %tag,
            security_level = %self.store.security_level(),
            "no key pair under tag, generating"
        );
        match self.store.generate(tag, &self.config.access_policy()) {
            Ok(handle) => Ok(handle),
            // Another codec on the same store provisioned the tag between our lookup and
            // generation.
            Err(KeyStoreError::Status(STATUS_DUPLICATE_ITEM)) => {
                tracing::debug!(%tag, "key pair appeared concurrently, adopting it");
                self.find(tag)?.ok_or_else(|| {
                    SeedKitError::KeyGenerationFailed(
                        KeyStoreError::Status(STATUS_DUPLICATE_ITEM).to_string(),
                    )
                })
            }
            Err(err) => {
                tracing::error!(%tag, error = %err, "key pair generation failed");
                Err(map_generation_error(err))
            }
        }
    }

    fn verify_presence(&self) -> Result<()> {
        let outcome = self.verifier.verify(&self.config.operation_prompt);
        if outcome.is_approved() {
            Ok(())
        } else {
            tracing::info!(%outcome, "presence verification not approved");
            Err(SeedKitError::UserCancelledOrAuthFailed)
        }
    }
}

fn map_generation_error(err: KeyStoreError) -> SeedKitError {
    match err {
        KeyStoreError::Unavailable(reason) => SeedKitError::KeyProvisioningFailed(reason),
        other => SeedKitError::KeyGenerationFailed(other.to_string()),
    }
}

fn map_private_key_error(err: &KeyStoreError) -> SeedKitError {
    match err {
        KeyStoreError::KeyInvalidated | KeyStoreError::Status(STATUS_ITEM_NOT_FOUND) => {
            SeedKitError::NoPrivateKey
        }
        KeyStoreError::Status(STATUS_USER_CANCELED | STATUS_AUTH_FAILED) => {
            SeedKitError::UserCancelledOrAuthFailed
        }
        KeyStoreError::Rejected(reason) => SeedKitError::AlgorithmUnsupported(reason.clone()),
        other => SeedKitError::KeyProvisioningFailed(other.to_string()),
    }
}

fn decode_utf8(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| SeedKitError::DecodingError)
}
