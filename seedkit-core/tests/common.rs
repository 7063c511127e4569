#![allow(dead_code)]

//! Common test utilities shared across integration tests.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use seedkit_core::device::{
    AccessPolicy, HardwareBoundCodec, HardwareCodecConfig, KeyStoreResult, MemoryKeyStore,
    PresenceOutcome, PresenceVerifier, PrivateKeyHandle, ScriptedVerifier, SecureKeyStore,
    SecurityLevel, TieredKeyStore,
};

/// Application tag used by the integration tests.
pub const TEST_TAG: &str = "com.starlingprotocol.seedkit.tests";

/// Sample seed phrase.
pub const MNEMONIC: &str =
    "dove lumber quote board young robust kit invite plastic regular skull history";

/// Codec over a fresh software store with a verifier that always answers `outcome`.
#[must_use]
pub fn codec_with_outcome(
    outcome: PresenceOutcome,
) -> (HardwareBoundCodec, Arc<MemoryKeyStore>, Arc<ScriptedVerifier>) {
    let store = Arc::new(MemoryKeyStore::new());
    let verifier = Arc::new(ScriptedVerifier::always(outcome));
    let codec = codec_over(store.clone(), verifier.clone());
    (codec, store, verifier)
}

/// Codec over `store` with the test tag and default presence requirements.
///
/// # Panics
///
/// Panics if the codec cannot provision its key pair.
#[must_use]
pub fn codec_over(
    store: Arc<dyn SecureKeyStore>,
    verifier: Arc<dyn PresenceVerifier>,
) -> HardwareBoundCodec {
    HardwareBoundCodec::initialize(store, verifier, HardwareCodecConfig::with_tag(TEST_TAG))
        .expect("codec initializes over a healthy store")
}

/// Hardware-level and software-level memory stores combined into a tiered store.
#[must_use]
pub fn tiered_stores() -> (Arc<MemoryKeyStore>, Arc<MemoryKeyStore>, Arc<TieredKeyStore>) {
    let hardware = Arc::new(MemoryKeyStore::with_security_level(SecurityLevel::Hardware));
    let fallback = Arc::new(MemoryKeyStore::new());
    let tiered = Arc::new(TieredKeyStore::new(
        Some(hardware.clone() as Arc<dyn SecureKeyStore>),
        fallback.clone(),
    ));
    (hardware, fallback, tiered)
}

/// Installs a test subscriber so `RUST_LOG=seedkit_core=debug` shows codec events.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Memory store whose lookups take `delay`, widening the window between a codec's lookup
/// and its generation.
pub struct SlowFindStore {
    /// Store holding the keys.
    pub inner: Arc<MemoryKeyStore>,
    delay: Duration,
}

impl SlowFindStore {
    /// Wraps `inner`, delaying every lookup by `delay`.
    #[must_use]
    pub const fn new(inner: Arc<MemoryKeyStore>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

impl SecureKeyStore for SlowFindStore {
    fn security_level(&self) -> SecurityLevel {
        self.inner.security_level()
    }

    fn find(&self, tag: &str) -> KeyStoreResult<Option<Arc<dyn PrivateKeyHandle>>> {
        let found = self.inner.find(tag);
        thread::sleep(self.delay);
        found
    }

    fn generate(
        &self,
        tag: &str,
        policy: &AccessPolicy,
    ) -> KeyStoreResult<Arc<dyn PrivateKeyHandle>> {
        self.inner.generate(tag, policy)
    }

    fn delete(&self, tag: &str) -> KeyStoreResult<()> {
        self.inner.delete(tag)
    }
}
