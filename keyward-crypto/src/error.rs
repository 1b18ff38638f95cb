//! Error types for the crypto layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur in cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The OS random number generator could not produce bytes.
    #[error("secure random source unavailable: {0}")]
    Rng(String),

    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed (wrong key, tampered data, or corrupted nonce/tag).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Password-based key derivation failed.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// Key material has the wrong length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// A payload field could not be decoded.
    #[error("invalid encoding: {0}")]
    Encoding(String),

    /// The caller supplied a structurally invalid input.
    #[error("precondition violated: {0}")]
    Precondition(String),
}

impl CryptoError {
    /// Whether this error means "the data cannot be authenticated".
    ///
    /// Callers that must not reveal why decryption failed collapse these
    /// into a single "inaccessible" outcome.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            CryptoError::Decryption(_) | CryptoError::Encoding(_)
        )
    }
}
