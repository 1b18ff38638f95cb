//! Application settings consulted by the encryption layer.

use crate::error::{StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::RwLock;

/// Setting holding the process-wide "encryption enabled" flag.
pub const ENCRYPTION_ENABLED: &str = "encryption_enabled";

/// Settings prefix under which lazily created field keys are remembered.
pub const FIELD_KEY_PREFIX: &str = "field_key.";

pub(crate) fn field_key_setting(purpose: &str) -> String {
    format!("{FIELD_KEY_PREFIX}{purpose}")
}

/// String key/value settings.
pub trait SettingsStore: Send + Sync {
    fn get_setting(&self, key: &str) -> StorageResult<Option<String>>;
    fn set_setting(&self, key: &str, value: &str) -> StorageResult<()>;
}

/// Settings kept in memory.
#[derive(Default)]
pub struct MemorySettingsStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get_setting(&self, key: &str) -> StorageResult<Option<String>> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn set_setting(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

pub(crate) fn poisoned() -> StorageError {
    StorageError::Storage("lock poisoned".into())
}
