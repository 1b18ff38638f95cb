//! Password-based encryption: Argon2id -> AES-256-GCM.
//!
//! The derived key lives only for the duration of the call and is zeroized
//! when it goes out of scope.

use crate::cipher::{open, seal};
use crate::error::CryptoResult;
use crate::key::{KdfParams, Salt, derive_key};
use crate::payload::{EncryptedPayload, PasswordEncryptedPayload};

/// Encrypts `plaintext` under a key derived from `password` and a fresh salt.
pub fn encrypt_with_password(
    plaintext: &[u8],
    password: &str,
    params: &KdfParams,
) -> CryptoResult<PasswordEncryptedPayload> {
    let salt = Salt::random()?;
    let key = derive_key(password, &salt, params)?;
    let sealed = seal(&key, plaintext)?;

    Ok(PasswordEncryptedPayload {
        payload: EncryptedPayload::from_sealed(sealed, None),
        salt: salt.as_bytes().to_vec(),
        iterations: params.iterations,
    })
}

/// Re-derives the key from `password` and the stored salt/iterations and decrypts.
///
/// A wrong password surfaces as `CryptoError::Decryption`, exactly like
/// tampered ciphertext.
pub fn decrypt_with_password(
    payload: &PasswordEncryptedPayload,
    password: &str,
) -> CryptoResult<Vec<u8>> {
    let params = KdfParams::with_iterations(payload.iterations)?;
    let salt = Salt::from_slice(&payload.salt)?;
    let key = derive_key(password, &salt, &params)?;
    open(
        &key,
        &payload.payload.ciphertext,
        &payload.payload.iv,
        &payload.payload.tag,
    )
}
