//! Cryptographic primitives for Keyward.
//!
//! Provides:
//! - AES-256-GCM authenticated encryption with random 96-bit nonces
//! - Argon2id password-based key derivation
//! - Zeroizing key material
//! - The JSON wire format shared by every encrypted payload
//!
//! # Architecture
//!
//! Everything here is stateless. Key storage, key ids and key lifecycle live
//! in `keyward-vault`; this crate only turns bytes plus a key into an
//! authenticated payload and back.
//!
//! Decryption never hands back bytes whose tag did not verify. Callers that
//! must hide *why* decryption failed can collapse errors with
//! [`CryptoError::is_authentication_failure`].

mod cipher;
mod error;
mod key;
mod password;
pub mod payload;

pub use cipher::{ALGORITHM_NAME, Algorithm, NONCE_SIZE, Sealed, TAG_SIZE, open, seal};
pub use error::{CryptoError, CryptoResult};
pub use key::{
    DEFAULT_KDF_ITERATIONS, KDF_MEMORY_KIB, KDF_PARALLELISM, KEY_SIZE, KdfParams, KeyMaterial,
    MAX_KDF_ITERATIONS, SALT_SIZE, Salt, derive_key, fill_random, generate_random_key,
    rng_available,
};
pub use password::{decrypt_with_password, encrypt_with_password};
pub use payload::{EncryptedPayload, PasswordEncryptedPayload};

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `data`, used as a content checksum.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
