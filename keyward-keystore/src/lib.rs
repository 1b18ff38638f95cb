//! Persistent key/value store for raw key material and wrapped key backups.
//!
//! The platform secure vault (OS keychain, credential manager, TPM-backed
//! store) is abstracted behind [`KeyStore`]. Two backends ship here:
//!
//! - [`MemoryKeyStore`]: process-local, for tests and ephemeral sessions.
//! - [`DuckDbKeyStore`]: a single-table DuckDB file, for desktop targets
//!   without a native keychain.
//!
//! Values are opaque strings; callers decide the encoding.

mod duck;
mod error;
mod memory;

pub use duck::DuckDbKeyStore;
pub use error::{KeyStoreError, KeyStoreResult};
pub use memory::MemoryKeyStore;

use std::collections::HashMap;

/// Opaque string-keyed store. Implementations must be safe for concurrent
/// readers and must not hold a lock beyond a single operation.
pub trait KeyStore: Send + Sync {
    /// Reads a value, `None` when absent.
    fn read(&self, key: &str) -> KeyStoreResult<Option<String>>;

    /// Inserts or replaces a value.
    fn write(&self, key: &str, value: &str) -> KeyStoreResult<()>;

    /// Removes a value. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> KeyStoreResult<()>;

    /// Returns every stored entry.
    fn read_all(&self) -> KeyStoreResult<HashMap<String, String>>;

    /// Removes every stored entry.
    fn delete_all(&self) -> KeyStoreResult<()>;

    /// Returns entries whose key starts with `prefix`.
    fn read_prefix(&self, prefix: &str) -> KeyStoreResult<HashMap<String, String>> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .collect())
    }
}
