//! Key material, salts and Argon2id key derivation.

use crate::error::{CryptoError, CryptoResult};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::TryRngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of an AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;

/// Size of a password salt in bytes.
pub const SALT_SIZE: usize = 16;

/// Argon2id memory cost in KiB. Fixed so that stored payloads only need
/// to carry their iteration count.
pub const KDF_MEMORY_KIB: u32 = 19_456;

/// Argon2id lanes.
pub const KDF_PARALLELISM: u32 = 1;

/// Default Argon2id time cost (iterations).
pub const DEFAULT_KDF_ITERATIONS: u32 = 3;

/// Highest iteration count accepted when decrypting.
pub const MAX_KDF_ITERATIONS: u32 = 64;

/// 256-bit symmetric key. Zeroized on drop and redacted in `Debug`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct KeyMaterial([u8; KEY_SIZE]);

impl KeyMaterial {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Builds key material from a slice, checking its length.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_SIZE,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; KEY_SIZE];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyMaterial([REDACTED])")
    }
}

/// Random salt for password-based key derivation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    /// Generates a fresh random salt.
    pub fn random() -> CryptoResult<Self> {
        let mut bytes = [0u8; SALT_SIZE];
        fill_random(&mut bytes)?;
        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let arr: [u8; SALT_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::Encoding(format!(
                "salt must be {SALT_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

/// Argon2id parameters. Only the iteration count varies between payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_KDF_ITERATIONS,
        }
    }
}

impl KdfParams {
    pub fn with_iterations(iterations: u32) -> CryptoResult<Self> {
        if iterations == 0 || iterations > MAX_KDF_ITERATIONS {
            return Err(CryptoError::Precondition(format!(
                "iterations must be within 1..={MAX_KDF_ITERATIONS}, got {iterations}"
            )));
        }
        Ok(Self { iterations })
    }
}

/// Derives a 256-bit key from a password with Argon2id.
pub fn derive_key(password: &str, salt: &Salt, params: &KdfParams) -> CryptoResult<KeyMaterial> {
    let params = KdfParams::with_iterations(params.iterations)?;
    let argon_params = Params::new(
        KDF_MEMORY_KIB,
        params.iterations,
        KDF_PARALLELISM,
        Some(KEY_SIZE),
    )
    .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut out = [0u8; KEY_SIZE];
    argon
        .hash_password_into(password.as_bytes(), salt.as_bytes(), &mut out)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;

    let key = KeyMaterial::from_bytes(out);
    out.zeroize();
    Ok(key)
}

/// Generates a fresh random 256-bit key from the OS CSPRNG.
pub fn generate_random_key() -> CryptoResult<KeyMaterial> {
    let mut bytes = [0u8; KEY_SIZE];
    fill_random(&mut bytes)?;
    let key = KeyMaterial::from_bytes(bytes);
    bytes.zeroize();
    Ok(key)
}

/// Fills `buf` from the OS CSPRNG. Safe to call from any thread.
pub fn fill_random(buf: &mut [u8]) -> CryptoResult<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| CryptoError::Rng(e.to_string()))
}

/// Whether the OS random source is usable in this environment.
pub fn rng_available() -> bool {
    let mut probe = [0u8; 8];
    fill_random(&mut probe).is_ok()
}
