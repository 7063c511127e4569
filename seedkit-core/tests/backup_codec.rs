//! Integration tests for the password backup codec.
//!
//! Run with: `cargo test -p seedkit-core --test backup_codec`

mod common;

use proptest::prelude::*;
use seedkit_core::backup::{PasswordBackupCodec, MIN_SEALED_LEN, NONCE_LEN, TAG_LEN};
use seedkit_core::SeedKitError;
use test_case::test_case;

#[test]
fn test_mnemonic_round_trip_and_wrong_password() {
    common::init_tracing();
    let codec = PasswordBackupCodec::new();

    let sealed = codec.encrypt("dove lumber quote board", "correct-password").unwrap();
    assert_eq!(
        codec.decrypt(&sealed, "correct-password").unwrap(),
        "dove lumber quote board"
    );
    assert_eq!(
        codec.decrypt(&sealed, "wrong-password"),
        Err(SeedKitError::AuthenticationFailed)
    );
}

#[test]
fn test_sealed_layout() {
    let codec = PasswordBackupCodec::new();
    let sealed = codec.encrypt(common::MNEMONIC, "pw").unwrap();
    assert_eq!(sealed.len(), NONCE_LEN + common::MNEMONIC.len() + TAG_LEN);
}

#[test]
fn test_same_input_encrypts_differently() {
    let codec = PasswordBackupCodec::new();
    let first = codec.encrypt(common::MNEMONIC, "pw").unwrap();
    let second = codec.encrypt(common::MNEMONIC, "pw").unwrap();
    assert_ne!(first[..NONCE_LEN], second[..NONCE_LEN]);
    assert_ne!(first, second);
}

#[test_case(0 ; "empty")]
#[test_case(NONCE_LEN ; "nonce only")]
#[test_case(MIN_SEALED_LEN - 1 ; "one byte short")]
fn test_short_input_is_malformed(len: usize) {
    let codec = PasswordBackupCodec::new();
    assert_eq!(
        codec.decrypt(&vec![0u8; len], "pw"),
        Err(SeedKitError::MalformedCiphertext {
            len,
            min: MIN_SEALED_LEN
        })
    );
}

#[test]
fn test_empty_password_is_a_valid_key() {
    let codec = PasswordBackupCodec::new();
    let sealed = codec.encrypt("secret", "").unwrap();
    assert_eq!(codec.decrypt(&sealed, "").unwrap(), "secret");
    assert_eq!(
        codec.decrypt(&sealed, " "),
        Err(SeedKitError::AuthenticationFailed)
    );
}

proptest! {
    #[test]
    fn prop_round_trip(clear_text in "\\PC{1,128}", password in "\\PC{0,32}") {
        let codec = PasswordBackupCodec::new();
        let sealed = codec.encrypt(&clear_text, &password).unwrap();
        prop_assert_eq!(codec.decrypt(&sealed, &password).unwrap(), clear_text);
    }

    #[test]
    fn prop_any_flipped_byte_fails_authentication(
        clear_text in "\\PC{1,64}",
        index in any::<prop::sample::Index>(),
        flip in 1u8..=255,
    ) {
        let codec = PasswordBackupCodec::new();
        let mut sealed = codec.encrypt(&clear_text, "pw").unwrap();
        let at = index.index(sealed.len());
        sealed[at] ^= flip;
        prop_assert_eq!(codec.decrypt(&sealed, "pw"), Err(SeedKitError::AuthenticationFailed));
    }

    #[test]
    fn prop_other_password_fails_authentication(
        password in "[a-z0-9]{1,16}",
        other in "[a-z0-9]{1,16}",
    ) {
        prop_assume!(password != other);
        let codec = PasswordBackupCodec::new();
        let sealed = codec.encrypt(common::MNEMONIC, &password).unwrap();
        prop_assert_eq!(codec.decrypt(&sealed, &other), Err(SeedKitError::AuthenticationFailed));
    }
}
