//! AES-256-GCM authenticated encryption with detached nonce and tag.

use crate::error::{CryptoError, CryptoResult};
use crate::key::{KeyMaterial, fill_random};
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use serde::{Deserialize, Serialize};

/// Size of the AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Size of the AES-GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// Wire name of the only supported algorithm.
pub const ALGORITHM_NAME: &str = "AES-256-GCM";

/// AEAD algorithm identifier carried by every payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    #[default]
    #[serde(rename = "AES-256-GCM")]
    Aes256Gcm,
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Algorithm::Aes256Gcm => f.write_str(ALGORITHM_NAME),
        }
    }
}

/// Output of a single AEAD seal: ciphertext with detached nonce and tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub iv: [u8; NONCE_SIZE],
    pub tag: [u8; TAG_SIZE],
}

/// Encrypts `plaintext` under `key` with a freshly random nonce.
pub fn seal(key: &KeyMaterial, plaintext: &[u8]) -> CryptoResult<Sealed> {
    let mut iv = [0u8; NONCE_SIZE];
    fill_random(&mut iv)?;

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| {
        CryptoError::InvalidKeyLength {
            expected: crate::KEY_SIZE,
            actual: key.as_bytes().len(),
        }
    })?;

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(Nonce::from_slice(&iv), b"", &mut buffer)
        .map_err(|_| CryptoError::Encryption("AES-GCM seal failed".into()))?;

    let mut tag_bytes = [0u8; TAG_SIZE];
    tag_bytes.copy_from_slice(tag.as_slice());

    Ok(Sealed {
        ciphertext: buffer,
        iv,
        tag: tag_bytes,
    })
}

/// Verifies the tag and decrypts. Nothing is returned unless the tag matches.
pub fn open(key: &KeyMaterial, ciphertext: &[u8], iv: &[u8], tag: &[u8]) -> CryptoResult<Vec<u8>> {
    if iv.len() != NONCE_SIZE {
        return Err(CryptoError::Decryption(format!(
            "nonce must be {NONCE_SIZE} bytes, got {}",
            iv.len()
        )));
    }
    if tag.len() != TAG_SIZE {
        return Err(CryptoError::Decryption(format!(
            "tag must be {TAG_SIZE} bytes, got {}",
            tag.len()
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| {
        CryptoError::InvalidKeyLength {
            expected: crate::KEY_SIZE,
            actual: key.as_bytes().len(),
        }
    })?;

    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(
            Nonce::from_slice(iv),
            b"",
            &mut buffer,
            Tag::from_slice(tag),
        )
        .map_err(|_| {
            CryptoError::Decryption("authentication failed (wrong key or tampered data)".into())
        })?;

    Ok(buffer)
}
