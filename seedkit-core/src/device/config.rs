use super::store::AccessPolicy;

/// Application tag the key pair is stored under.
pub const DEFAULT_APPLICATION_TAG: &str = "com.starlingprotocol.vivopayencryptiondemo";

/// Reason shown by the presence prompt before the private key is used.
pub const DEFAULT_OPERATION_PROMPT: &str = "VivoPay needs access to private key";

/// Settings for a [`HardwareBoundCodec`](super::HardwareBoundCodec).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardwareCodecConfig {
    /// Tag identifying the key pair in the secure key store.
    pub application_tag: String,
    /// Reason passed to the presence verifier.
    pub operation_prompt: String,
    /// Whether newly generated keys require user presence for private key operations.
    pub require_user_presence: bool,
}

impl HardwareCodecConfig {
    /// Default settings with a different application tag.
    #[must_use]
    pub fn with_tag(tag: impl Into<String>) -> Self {
        Self {
            application_tag: tag.into(),
            ..Self::default()
        }
    }

    /// Access policy bound to keys generated with these settings.
    #[must_use]
    pub const fn access_policy(&self) -> AccessPolicy {
        if self.require_user_presence {
            AccessPolicy::user_presence()
        } else {
            AccessPolicy::unattended()
        }
    }
}

impl Default for HardwareCodecConfig {
    fn default() -> Self {
        Self {
            application_tag: DEFAULT_APPLICATION_TAG.to_string(),
            operation_prompt: DEFAULT_OPERATION_PROMPT.to_string(),
            require_user_presence: true,
        }
    }
}
