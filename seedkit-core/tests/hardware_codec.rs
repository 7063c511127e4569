//! Integration tests for the device-bound codec over in-memory and tiered key stores.
//!
//! Run with: `cargo test -p seedkit-core --test hardware_codec`

mod common;

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use seedkit_core::device::{
    ecies, AlwaysApprove, HardwareBoundCodec, HardwareCodecConfig, KeyState, MemoryKeyStore,
    PresenceOutcome, ScriptedVerifier, SecurityLevel, STATUS_ITEM_NOT_FOUND,
};
use seedkit_core::SeedKitError;
use test_case::test_case;

#[test]
fn test_provisioning_is_idempotent() {
    common::init_tracing();
    let (codec, store, _) = common::codec_with_outcome(PresenceOutcome::Approved);

    let first = codec.lookup_or_create_key_pair().unwrap();
    let second = codec.lookup_or_create_key_pair().unwrap();
    assert_eq!(first.public_key(), second.public_key());
    assert_eq!(first.tag(), common::TEST_TAG);
    assert_eq!(store.len(), 1);
}

#[test]
fn test_round_trip_and_layout() {
    let (codec, _, verifier) = common::codec_with_outcome(PresenceOutcome::Approved);

    let blob = codec.encrypt(common::MNEMONIC).unwrap();
    assert_eq!(
        blob.len(),
        ecies::EPHEMERAL_KEY_LEN + common::MNEMONIC.len() + ecies::TAG_LEN
    );
    assert_eq!(blob[0], 0x04);
    assert_eq!(verifier.prompts(), 0);

    assert_eq!(codec.decrypt(&blob).unwrap(), common::MNEMONIC);
    assert_eq!(verifier.prompts(), 1);
}

#[test]
fn test_codecs_sharing_a_store_share_the_key() {
    let store = Arc::new(MemoryKeyStore::new());
    let writer = common::codec_over(store.clone(), Arc::new(AlwaysApprove));
    let reader = common::codec_over(store.clone(), Arc::new(AlwaysApprove));

    let blob = writer.encrypt(common::MNEMONIC).unwrap();
    assert_eq!(reader.decrypt(&blob).unwrap(), common::MNEMONIC);
    assert_eq!(store.len(), 1);
}

#[test_case(PresenceOutcome::Denied ; "denied")]
#[test_case(PresenceOutcome::Cancelled ; "cancelled")]
#[test_case(PresenceOutcome::TimedOut ; "timed out")]
fn test_unapproved_presence_blocks_decryption(outcome: PresenceOutcome) {
    let (codec, _, verifier) = common::codec_with_outcome(outcome);
    let blob = codec.encrypt(common::MNEMONIC).unwrap();

    assert_eq!(
        codec.decrypt(&blob),
        Err(SeedKitError::UserCancelledOrAuthFailed)
    );
    assert_eq!(verifier.prompts(), 1);
    assert_eq!(codec.state(), KeyState::KeyExists);
}

#[test]
fn test_presence_is_asked_on_every_decryption() {
    let store = Arc::new(MemoryKeyStore::new());
    let verifier = Arc::new(ScriptedVerifier::new(
        [PresenceOutcome::Cancelled],
        PresenceOutcome::Approved,
    ));
    let codec = common::codec_over(store, verifier.clone());
    let blob = codec.encrypt(common::MNEMONIC).unwrap();

    assert_eq!(
        codec.decrypt(&blob),
        Err(SeedKitError::UserCancelledOrAuthFailed)
    );
    assert_eq!(codec.decrypt(&blob).unwrap(), common::MNEMONIC);
    assert_eq!(codec.decrypt(&blob).unwrap(), common::MNEMONIC);
    assert_eq!(verifier.prompts(), 3);
}

#[test]
fn test_deletion_makes_old_ciphertexts_unrecoverable() {
    let (codec, store, _) = common::codec_with_outcome(PresenceOutcome::Approved);
    let blob = codec.encrypt(common::MNEMONIC).unwrap();

    codec.delete_key_pair().unwrap();
    assert_eq!(codec.state(), KeyState::NoKey);
    assert!(store.is_empty());

    // The next operation provisions a fresh pair that cannot open the old blob.
    assert_eq!(codec.decrypt(&blob), Err(SeedKitError::AuthenticationFailed));
    assert_eq!(codec.state(), KeyState::KeyExists);
    assert_eq!(store.len(), 1);
}

#[test]
fn test_deleting_missing_key_reports_status() {
    let (codec, _, _) = common::codec_with_outcome(PresenceOutcome::Approved);

    codec.delete_key_pair().unwrap();
    assert_eq!(
        codec.delete_key_pair(),
        Err(SeedKitError::DeletionFailed(STATUS_ITEM_NOT_FOUND))
    );
    assert_eq!(STATUS_ITEM_NOT_FOUND, -25300);
}

#[test]
fn test_key_deleted_under_codec_reports_no_private_key() {
    let store = Arc::new(MemoryKeyStore::new());
    let stale = common::codec_over(store.clone(), Arc::new(AlwaysApprove));
    let other = common::codec_over(store.clone(), Arc::new(AlwaysApprove));
    let blob = stale.encrypt(common::MNEMONIC).unwrap();

    other.delete_key_pair().unwrap();
    assert_eq!(stale.state(), KeyState::KeyExists);
    assert_eq!(stale.decrypt(&blob), Err(SeedKitError::NoPrivateKey));

    // An explicit lookup picks up whatever the store now holds.
    stale.lookup_or_create_key_pair().unwrap();
    let fresh = stale.encrypt(common::MNEMONIC).unwrap();
    assert_eq!(stale.decrypt(&fresh).unwrap(), common::MNEMONIC);
}

#[test]
fn test_falls_back_to_software_store() {
    let (hardware, fallback, tiered) = common::tiered_stores();
    hardware.set_available(false);

    let codec = common::codec_over(tiered, Arc::new(AlwaysApprove));
    let pair = codec.lookup_or_create_key_pair().unwrap();
    assert_eq!(pair.security_level(), SecurityLevel::Software);
    assert!(!pair.policy().private_key_usage);
    assert!(hardware.is_empty());
    assert_eq!(fallback.len(), 1);

    let blob = codec.encrypt(common::MNEMONIC).unwrap();
    assert_eq!(codec.decrypt(&blob).unwrap(), common::MNEMONIC);
}

#[test]
fn test_prefers_hardware_store() {
    let (hardware, fallback, tiered) = common::tiered_stores();

    let codec = common::codec_over(tiered, Arc::new(AlwaysApprove));
    let pair = codec.lookup_or_create_key_pair().unwrap();
    assert_eq!(pair.security_level(), SecurityLevel::Hardware);
    assert!(pair.policy().private_key_usage);
    assert!(pair.policy().user_presence);
    assert_eq!(hardware.len(), 1);
    assert!(fallback.is_empty());
}

#[test]
fn test_provisioning_is_single_flight() {
    let (codec, store, _) = common::codec_with_outcome(PresenceOutcome::Approved);
    codec.delete_key_pair().unwrap();
    let codec = Arc::new(codec);

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let codec = Arc::clone(&codec);
            thread::spawn(move || {
                let message = format!("{} #{i}", common::MNEMONIC);
                let blob = codec.encrypt(&message).unwrap();
                assert_eq!(codec.decrypt(&blob).unwrap(), message);
                codec.public_key_sec1().unwrap()
            })
        })
        .collect();

    let keys: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    assert!(keys.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_codecs_racing_to_provision_share_one_pair() {
    let inner = Arc::new(MemoryKeyStore::new());
    let store = Arc::new(common::SlowFindStore::new(
        inner.clone(),
        Duration::from_millis(20),
    ));
    let first = common::codec_over(store.clone(), Arc::new(AlwaysApprove));
    let second = common::codec_over(store.clone(), Arc::new(AlwaysApprove));

    // Leave both codecs without a key and the store empty.
    first.delete_key_pair().unwrap();
    second.lookup_or_create_key_pair().unwrap();
    second.delete_key_pair().unwrap();
    assert_eq!(first.state(), KeyState::NoKey);
    assert_eq!(second.state(), KeyState::NoKey);
    assert!(inner.is_empty());

    let barrier = Arc::new(Barrier::new(2));
    let workers: Vec<_> = [first, second]
        .into_iter()
        .map(|codec| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let blob = codec.encrypt(common::MNEMONIC)?;
                assert_eq!(codec.decrypt(&blob)?, common::MNEMONIC);
                codec.public_key_sec1()
            })
        })
        .collect();

    let keys: Vec<_> = workers
        .into_iter()
        .map(|worker| worker.join().unwrap().unwrap())
        .collect();
    assert_eq!(keys[0], keys[1]);
    assert_eq!(inner.len(), 1);
}

#[test]
fn test_restricted_store_reports_unsupported_algorithm() {
    let store = Arc::new(MemoryKeyStore::new().with_algorithms(&[]));
    let codec = common::codec_over(store, Arc::new(AlwaysApprove));

    assert!(matches!(
        codec.encrypt(common::MNEMONIC),
        Err(SeedKitError::AlgorithmUnsupported(_))
    ));
    assert!(matches!(
        codec.decrypt(&[0u8; 100]),
        Err(SeedKitError::AlgorithmUnsupported(_))
    ));
}

#[test]
fn test_rejected_generation_reports_generation_failure() {
    let store = Arc::new(MemoryKeyStore::new());
    store.set_reject_generation(true);

    let result = HardwareBoundCodec::initialize(
        store,
        Arc::new(AlwaysApprove),
        HardwareCodecConfig::with_tag(common::TEST_TAG),
    );
    assert!(matches!(result, Err(SeedKitError::KeyGenerationFailed(_))));
}

#[test]
fn test_unreachable_store_reports_provisioning_failure() {
    let store = Arc::new(MemoryKeyStore::new());
    store.set_reachable(false);

    let result = HardwareBoundCodec::initialize(
        store,
        Arc::new(AlwaysApprove),
        HardwareCodecConfig::with_tag(common::TEST_TAG),
    );
    assert!(matches!(result, Err(SeedKitError::KeyProvisioningFailed(_))));
}

#[test]
fn test_malformed_and_non_utf8_ciphertexts() {
    let (codec, _, verifier) = common::codec_with_outcome(PresenceOutcome::Approved);

    assert_eq!(
        codec.decrypt(&[0x04; 80]),
        Err(SeedKitError::MalformedCiphertext {
            len: 80,
            min: ecies::MIN_CIPHERTEXT_LEN
        })
    );
    assert_eq!(verifier.prompts(), 0);

    let pair = codec.lookup_or_create_key_pair().unwrap();
    let blob = ecies::seal(pair.public_key(), &[0xff, 0xfe, 0xfd]).unwrap();
    assert_eq!(codec.decrypt(&blob), Err(SeedKitError::DecodingError));
}
