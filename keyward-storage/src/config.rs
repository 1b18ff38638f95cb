//! Storage configuration.

use crate::error::{StorageError, StorageResult};
use serde::{Deserialize, Serialize};

/// Default plaintext size of one file chunk (5 MiB).
pub const DEFAULT_CHUNK_SIZE: usize = 5 * 1024 * 1024;

/// Configuration for the record store and the chunked file path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Plaintext bytes per chunk produced by `split_into_chunks`.
    pub chunk_size: usize,

    /// DuckDB `memory_limit` pragma for on-disk stores.
    pub duckdb_memory_limit: String,

    /// DuckDB `threads` pragma for on-disk stores.
    pub duckdb_threads: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            duckdb_memory_limit: "128MB".to_string(),
            duckdb_threads: 1,
        }
    }
}

impl StorageConfig {
    /// Parses a JSON config; missing fields fall back to defaults.
    pub fn from_json_str(json: &str) -> StorageResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| StorageError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> StorageResult<()> {
        if self.chunk_size == 0 {
            return Err(StorageError::Config("chunk_size must be positive".into()));
        }
        if self.duckdb_threads == 0 {
            return Err(StorageError::Config("duckdb_threads must be positive".into()));
        }
        // Interpolated into a PRAGMA statement.
        if self.duckdb_memory_limit.is_empty()
            || !self
                .duckdb_memory_limit
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.')
        {
            return Err(StorageError::Config(format!(
                "invalid duckdb_memory_limit {:?}",
                self.duckdb_memory_limit
            )));
        }
        Ok(())
    }
}
