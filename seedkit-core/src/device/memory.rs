//! In-memory key store.
//!
//! Keys live in process memory and are lost when the store is dropped. The store is used
//! by the test suites and by tools that need a device codec without platform services. It
//! can also play the part of a secure element (via [`MemoryKeyStore::with_security_level`])
//! and exposes switches to simulate the failures a real platform store reports.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use p256::{ecdh::diffie_hellman, PublicKey, SecretKey};
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use super::store::{
    AccessPolicy, Algorithm, KeyOperation, KeyStoreError, KeyStoreResult, PrivateKeyHandle,
    SecureKeyStore, SecurityLevel, STATUS_DUPLICATE_ITEM, STATUS_ITEM_NOT_FOUND,
};

type KeyMap = HashMap<String, Arc<MemoryKeyHandle>>;

/// Private key held in memory.
///
/// The handle is invalidated when its tag is deleted from the store that issued it.
pub struct MemoryKeyHandle {
    secret: SecretKey,
    policy: AccessPolicy,
    security_level: SecurityLevel,
    algorithms: Vec<Algorithm>,
    revoked: AtomicBool,
}

impl MemoryKeyHandle {
    fn revoke(&self) {
        self.revoked.store(true, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for MemoryKeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryKeyHandle")
            .field("secret", &"[REDACTED]")
            .field("policy", &self.policy)
            .field("security_level", &self.security_level)
            .field("revoked", &self.revoked.load(Ordering::SeqCst))
            .finish()
    }
}

impl PrivateKeyHandle for MemoryKeyHandle {
    fn public_key(&self) -> PublicKey {
        self.secret.public_key()
    }

    fn policy(&self) -> AccessPolicy {
        self.policy
    }

    fn security_level(&self) -> SecurityLevel {
        self.security_level
    }

    fn supports(&self, _operation: KeyOperation, algorithm: Algorithm) -> bool {
        self.algorithms.contains(&algorithm)
    }

    fn diffie_hellman(&self, peer: &PublicKey) -> KeyStoreResult<Zeroizing<[u8; 32]>> {
        if self.revoked.load(Ordering::SeqCst) {
            return Err(KeyStoreError::KeyInvalidated);
        }
        let shared = diffie_hellman(self.secret.to_nonzero_scalar(), peer.as_affine());
        let mut out = Zeroizing::new([0u8; 32]);
        out.copy_from_slice(shared.raw_secret_bytes());
        Ok(out)
    }
}

/// In-memory [`SecureKeyStore`].
pub struct MemoryKeyStore {
    keys: Mutex<KeyMap>,
    security_level: SecurityLevel,
    algorithms: Vec<Algorithm>,
    available: AtomicBool,
    reachable: AtomicBool,
    reject_generation: AtomicBool,
}

impl MemoryKeyStore {
    /// Creates an empty software-level store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_security_level(SecurityLevel::Software)
    }

    /// Creates an empty store reporting `security_level`.
    #[must_use]
    pub fn with_security_level(security_level: SecurityLevel) -> Self {
        Self {
            keys: Mutex::new(HashMap::new()),
            security_level,
            algorithms: vec![Algorithm::EciesCofactorX963Sha256AesGcm],
            available: AtomicBool::new(true),
            reachable: AtomicBool::new(true),
            reject_generation: AtomicBool::new(false),
        }
    }

    /// Restricts the algorithms that keys generated from now on will support.
    #[must_use]
    pub fn with_algorithms(mut self, algorithms: &[Algorithm]) -> Self {
        self.algorithms = algorithms.to_vec();
        self
    }

    /// Marks the store as present or absent on this device.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Simulates the backing service going offline.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Makes every subsequent generation request fail as if the parameters were refused.
    pub fn set_reject_generation(&self, reject: bool) {
        self.reject_generation.store(reject, Ordering::SeqCst);
    }

    /// Number of stored key pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.lock().map_or(0, |keys| keys.len())
    }

    /// Returns `true` if no key pairs are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_reachable(&self) -> KeyStoreResult<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(KeyStoreError::Unavailable("memory key store offline".to_string()))
        }
    }

    fn keys(&self) -> KeyStoreResult<MutexGuard<'_, KeyMap>> {
        self.keys
            .lock()
            .map_err(|_| KeyStoreError::Backend("mutex poisoned".to_string()))
    }
}

impl Default for MemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecureKeyStore for MemoryKeyStore {
    fn security_level(&self) -> SecurityLevel {
        self.security_level
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn find(&self, tag: &str) -> KeyStoreResult<Option<Arc<dyn PrivateKeyHandle>>> {
        self.check_reachable()?;
        Ok(self
            .keys()?
            .get(tag)
            .map(|handle| Arc::clone(handle) as Arc<dyn PrivateKeyHandle>))
    }

    fn generate(
        &self,
        tag: &str,
        policy: &AccessPolicy,
    ) -> KeyStoreResult<Arc<dyn PrivateKeyHandle>> {
        self.check_reachable()?;
        if self.reject_generation.load(Ordering::SeqCst) {
            return Err(KeyStoreError::Rejected(
                "key parameters not supported".to_string(),
            ));
        }

        let mut keys = self.keys()?;
        if keys.contains_key(tag) {
            return Err(KeyStoreError::Status(STATUS_DUPLICATE_ITEM));
        }
        let handle = Arc::new(MemoryKeyHandle {
            secret: SecretKey::random(&mut OsRng),
            policy: *policy,
            security_level: self.security_level,
            algorithms: self.algorithms.clone(),
            revoked: AtomicBool::new(false),
        });
        keys.insert(tag.to_string(), Arc::clone(&handle));
        drop(keys);
        Ok(handle)
    }

    fn delete(&self, tag: &str) -> KeyStoreResult<()> {
        self.check_reachable()?;
        let removed = self.keys()?.remove(tag);
        removed.map_or(Err(KeyStoreError::Status(STATUS_ITEM_NOT_FOUND)), |handle| {
            handle.revoke();
            Ok(())
        })
    }
}
