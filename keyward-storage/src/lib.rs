//! Record and file encryption layer for Keyward.
//!
//! Sits between application code and its storage backend:
//!
//! - [`EncryptedRecordStore`] encrypts policy-selected record fields at rest,
//!   decrypts them on read and migrates legacy plaintext rows.
//! - [`FileEncryptor`] encrypts whole files, independent file chunks and
//!   metadata maps for remote storage.
//!
//! # Architecture
//!
//! - [`RecordStorage`] and [`SettingsStore`] are the backend seams; the crate
//!   ships in-memory implementations and [`DuckRecordStore`], which implements
//!   both on one DuckDB database.
//! - Each record carries an optional, versioned [`EncryptionState`] naming its
//!   encrypted fields. Migration relies on it instead of guessing from field
//!   contents.
//! - All cryptography is delegated to `keyward_vault::EncryptionService`.

mod chunks;
mod config;
mod duck;
mod encrypted_store;
mod error;
mod file;
mod metadata;
mod record;
mod record_store;
mod settings;

pub use chunks::{EncryptedFileChunk, FileChunk, join_chunks, split_into_chunks};
pub use config::{DEFAULT_CHUNK_SIZE, StorageConfig};
pub use duck::{DuckRecordStore, open_duckdb_with_wal_recovery};
pub use encrypted_store::{EncryptedRecordStore, SensitiveField, SensitiveFieldPolicy};
pub use error::{StorageError, StorageResult};
pub use file::{EncryptedFileMetadata, FileEncryptor};
pub use record::{ENCRYPTION_STATE_VERSION, EncryptionState, Record};
pub use record_store::{MemoryRecordStore, RecordStorage};
pub use settings::{
    ENCRYPTION_ENABLED, FIELD_KEY_PREFIX, MemorySettingsStore, SettingsStore,
};
