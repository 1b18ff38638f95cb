//! Storage error types.

use keyward_crypto::CryptoError;
use keyward_vault::VaultError;
use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("precondition violated: {0}")]
    Precondition(String),

    /// A key id resolved a moment ago is no longer in the key store.
    #[error("encryption key disappeared: {0}")]
    MissingKey(String),

    #[error("encryption service error: {0}")]
    Vault(VaultError),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<VaultError> for StorageError {
    fn from(err: VaultError) -> Self {
        match err {
            VaultError::Precondition(msg) => StorageError::Precondition(msg),
            other => StorageError::Vault(other),
        }
    }
}

impl From<CryptoError> for StorageError {
    fn from(err: CryptoError) -> Self {
        VaultError::from(err).into()
    }
}

impl From<duckdb::Error> for StorageError {
    fn from(err: duckdb::Error) -> Self {
        StorageError::Storage(err.to_string())
    }
}

impl StorageError {
    pub fn is_contract_violation(&self) -> bool {
        match self {
            StorageError::Precondition(_) => true,
            StorageError::Vault(e) => e.is_contract_violation(),
            _ => false,
        }
    }
}
