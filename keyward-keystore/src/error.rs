use thiserror::Error;

pub type KeyStoreResult<T> = Result<T, KeyStoreError>;

/// Failures of the key store backend itself (I/O, corruption, poisoning).
#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("key store backend error: {0}")]
    Backend(String),

    #[error("key store lock poisoned")]
    Poisoned,
}

impl From<duckdb::Error> for KeyStoreError {
    fn from(err: duckdb::Error) -> Self {
        KeyStoreError::Backend(err.to_string())
    }
}
