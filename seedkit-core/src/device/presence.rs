//! User-presence verification.
//!
//! Private key operations on a key generated with [`AccessPolicy::user_presence`] are
//! preceded by a call to [`PresenceVerifier::verify`]. On a device this is the biometric or
//! passcode prompt shown by the OS; the call may block for as long as the user takes to
//! respond and the core enforces no timeout of its own.
//!
//! [`AccessPolicy::user_presence`]: super::AccessPolicy::user_presence

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use strum::Display;

/// Result of a presence verification prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum PresenceOutcome {
    /// The user was verified.
    Approved,
    /// Verification failed (wrong biometric, wrong passcode, lockout).
    Denied,
    /// The user dismissed the prompt.
    Cancelled,
    /// The host gave up waiting for the user.
    TimedOut,
}

impl PresenceOutcome {
    /// Whether the private key operation may proceed.
    #[must_use]
    pub const fn is_approved(self) -> bool {
        matches!(self, Self::Approved)
    }
}

/// Host-provided user-presence check.
pub trait PresenceVerifier: Send + Sync {
    /// Prompts the user with `reason` and blocks until they respond.
    fn verify(&self, reason: &str) -> PresenceOutcome;
}

/// Verifier that approves every request without prompting.
///
/// **FOR TESTING AND UNATTENDED TOOLS ONLY.**
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysApprove;

impl PresenceVerifier for AlwaysApprove {
    fn verify(&self, _reason: &str) -> PresenceOutcome {
        PresenceOutcome::Approved
    }
}

/// Verifier that replays a queue of outcomes and records how often it was asked.
///
/// Once the queue is empty every further prompt yields the fallback outcome.
#[derive(Debug)]
pub struct ScriptedVerifier {
    outcomes: Mutex<VecDeque<PresenceOutcome>>,
    fallback: PresenceOutcome,
    prompts: AtomicUsize,
}

impl ScriptedVerifier {
    /// Creates a verifier replaying `outcomes`, then answering `fallback`.
    #[must_use]
    pub fn new(
        outcomes: impl IntoIterator<Item = PresenceOutcome>,
        fallback: PresenceOutcome,
    ) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            fallback,
            prompts: AtomicUsize::new(0),
        }
    }

    /// Verifier that always answers `outcome`.
    #[must_use]
    pub fn always(outcome: PresenceOutcome) -> Self {
        Self::new([], outcome)
    }

    /// Number of prompts shown so far.
    #[must_use]
    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

impl PresenceVerifier for ScriptedVerifier {
    fn verify(&self, _reason: &str) -> PresenceOutcome {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(self.fallback)
    }
}
