//! Vault error types.
//!
//! Recoverable conditions (missing key, failed authentication) are not errors
//! here: keyed operations return `Ok(None)` for both. `VaultError` is reserved
//! for caller contract violations and infrastructure failures.

use keyward_crypto::CryptoError;
use keyward_keystore::KeyStoreError;
use thiserror::Error;

pub type VaultResult<T> = Result<T, VaultError>;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("encryption service not initialized")]
    NotInitialized,

    #[error("encryption unavailable in this environment")]
    Unavailable,

    #[error("precondition violated: {0}")]
    Precondition(String),

    #[error("password too short (min {min} characters)")]
    PasswordTooShort { min: usize },

    #[error("key store error: {0}")]
    KeyStore(#[from] KeyStoreError),

    #[error("stored record is corrupt: {0}")]
    Corrupt(String),

    #[error("crypto error: {0}")]
    Crypto(CryptoError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<CryptoError> for VaultError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Precondition(msg) => VaultError::Precondition(msg),
            other => VaultError::Crypto(other),
        }
    }
}

impl VaultError {
    /// Whether the caller broke the API contract (as opposed to an
    /// environment or storage failure).
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            VaultError::Precondition(_) | VaultError::PasswordTooShort { .. }
        )
    }
}
