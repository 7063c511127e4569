//! Elliptic-curve integrated encryption on P-256.
//!
//! Wire-compatible with the Security.framework algorithm
//! `eciesEncryptionCofactorX963SHA256AESGCM`:
//!
//! ```text
//! [ephemeral public key (65 bytes, uncompressed SEC1)][ciphertext][GCM tag (16 bytes)]
//! ```
//!
//! - `Z` is the cofactor ECDH shared secret between the ephemeral key and the recipient
//!   (the P-256 cofactor is 1).
//! - The AES-128 key is `X9.63-KDF-SHA256(Z, shared_info = ephemeral public key)[..16]`.
//! - AES-GCM runs with an all-zero 16-byte IV. The key is single use, so the fixed IV never
//!   repeats under the same key.

use aes_gcm::{
    aead::{consts::U16, Aead, KeyInit},
    aes::Aes128,
    AesGcm, Nonce,
};
use p256::{ecdh::EphemeralSecret, elliptic_curve::sec1::ToEncodedPoint, PublicKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::{Result, SeedKitError};

/// Length of an uncompressed SEC1 P-256 point.
pub const EPHEMERAL_KEY_LEN: usize = 65;

/// Length of the AES-GCM tag.
pub const TAG_LEN: usize = 16;

/// Shortest valid blob (empty message).
pub const MIN_CIPHERTEXT_LEN: usize = EPHEMERAL_KEY_LEN + TAG_LEN;

const AES_KEY_LEN: usize = 16;
const ZERO_IV: [u8; 16] = [0u8; 16];

type Aes128Gcm16 = AesGcm<Aes128, U16>;

/// Encrypts `plaintext` to `recipient`.
///
/// # Errors
///
/// Returns [`SeedKitError::AlgorithmUnsupported`] if the AEAD rejects the input (only
/// possible for messages beyond the GCM length limit).
pub fn seal(recipient: &PublicKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let ephemeral = EphemeralSecret::random(&mut OsRng);
    let ephemeral_public = ephemeral.public_key().to_encoded_point(false);
    let shared = ephemeral.diffie_hellman(recipient);

    let key = derive_aes_key(shared.raw_secret_bytes(), ephemeral_public.as_bytes());
    let ciphertext = cipher(key.as_slice())?
        .encrypt(Nonce::<U16>::from_slice(&ZERO_IV), plaintext)
        .map_err(|err| SeedKitError::AlgorithmUnsupported(format!("AES-GCM seal: {err}")))?;

    let mut out = Vec::with_capacity(EPHEMERAL_KEY_LEN + ciphertext.len());
    out.extend_from_slice(ephemeral_public.as_bytes());
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypts a blob produced by [`seal`].
///
/// `agree` computes the ECDH shared secret between the recipient's private key and the
/// ephemeral public key carried in the blob. It is only invoked once the blob has been
/// parsed successfully.
///
/// # Errors
///
/// - [`SeedKitError::MalformedCiphertext`] if the blob is too short or the ephemeral key is
///   not a valid point.
/// - [`SeedKitError::AuthenticationFailed`] if the GCM tag does not verify.
/// - Any error returned by `agree`.
pub fn open<F>(ciphertext: &[u8], agree: F) -> Result<Zeroizing<Vec<u8>>>
where
    F: FnOnce(&PublicKey) -> Result<Zeroizing<[u8; 32]>>,
{
    let malformed = || SeedKitError::MalformedCiphertext {
        len: ciphertext.len(),
        min: MIN_CIPHERTEXT_LEN,
    };
    if ciphertext.len() < MIN_CIPHERTEXT_LEN {
        return Err(malformed());
    }

    let (ephemeral_bytes, body) = ciphertext.split_at(EPHEMERAL_KEY_LEN);
    let ephemeral = PublicKey::from_sec1_bytes(ephemeral_bytes).map_err(|_| malformed())?;
    let shared = agree(&ephemeral)?;

    let key = derive_aes_key(shared.as_slice(), ephemeral_bytes);
    cipher(key.as_slice())?
        .decrypt(Nonce::<U16>::from_slice(&ZERO_IV), body)
        .map(Zeroizing::new)
        .map_err(|_| SeedKitError::AuthenticationFailed)
}

fn cipher(key: &[u8]) -> Result<Aes128Gcm16> {
    Aes128Gcm16::new_from_slice(key)
        .map_err(|err| SeedKitError::AlgorithmUnsupported(format!("AES-128 key: {err}")))
}

fn derive_aes_key(shared_secret: &[u8], shared_info: &[u8]) -> Zeroizing<[u8; AES_KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; AES_KEY_LEN]);
    x963_kdf(shared_secret, shared_info, key.as_mut_slice());
    key
}

/// ANSI X9.63 key derivation with SHA-256.
///
/// `out[i*32..] = SHA256(Z || counter_be32 || shared_info)` with the counter starting at 1.
fn x963_kdf(shared_secret: &[u8], shared_info: &[u8], out: &mut [u8]) {
    for (counter, chunk) in (1u32..).zip(out.chunks_mut(32)) {
        let digest = Sha256::new()
            .chain_update(shared_secret)
            .chain_update(counter.to_be_bytes())
            .chain_update(shared_info)
            .finalize();
        chunk.copy_from_slice(&digest[..chunk.len()]);
    }
}
