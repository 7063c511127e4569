//! Hardware-first key store with a software fallback.

use std::sync::Arc;

use super::store::{
    AccessPolicy, KeyStoreResult, PrivateKeyHandle, SecureKeyStore, SecurityLevel,
};

/// Routes every request to the hardware store when the device has one, and to the fallback
/// store otherwise.
///
/// Keys generated on hardware additionally get `private_key_usage` in their access policy,
/// which secure coprocessors require before they will run private key operations.
pub struct TieredKeyStore {
    hardware: Option<Arc<dyn SecureKeyStore>>,
    fallback: Arc<dyn SecureKeyStore>,
}

impl TieredKeyStore {
    /// Creates a tiered store. `hardware` is `None` on platforms without a secure element.
    #[must_use]
    pub fn new(
        hardware: Option<Arc<dyn SecureKeyStore>>,
        fallback: Arc<dyn SecureKeyStore>,
    ) -> Self {
        Self { hardware, fallback }
    }

    /// Store that requests are currently routed to.
    #[must_use]
    pub fn active(&self) -> &dyn SecureKeyStore {
        match &self.hardware {
            Some(hardware) if hardware.is_available() => hardware.as_ref(),
            _ => self.fallback.as_ref(),
        }
    }
}

impl SecureKeyStore for TieredKeyStore {
    fn security_level(&self) -> SecurityLevel {
        self.active().security_level()
    }

    fn is_available(&self) -> bool {
        self.active().is_available()
    }

    fn find(&self, tag: &str) -> KeyStoreResult<Option<Arc<dyn PrivateKeyHandle>>> {
        self.active().find(tag)
    }

    fn generate(
        &self,
        tag: &str,
        policy: &AccessPolicy,
    ) -> KeyStoreResult<Arc<dyn PrivateKeyHandle>> {
        let active = self.active();
        let policy = match active.security_level() {
            SecurityLevel::Hardware => policy.with_private_key_usage(),
            SecurityLevel::Software => *policy,
        };
        tracing::debug!(
            security_level = %active.security_level(),
            user_presence = policy.user_presence,
            "generating tagged key pair"
        );
        active.generate(tag, &policy)
    }

    fn delete(&self, tag: &str) -> KeyStoreResult<()> {
        self.active().delete(tag)
    }
}
