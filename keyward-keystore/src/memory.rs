use crate::{KeyStore, KeyStoreError, KeyStoreResult};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory key store. Read-heavy workloads share the read lock.
#[derive(Default)]
pub struct MemoryKeyStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyStore for MemoryKeyStore {
    fn read(&self, key: &str) -> KeyStoreResult<Option<String>> {
        let entries = self.entries.read().map_err(|_| KeyStoreError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> KeyStoreResult<()> {
        let mut entries = self.entries.write().map_err(|_| KeyStoreError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> KeyStoreResult<()> {
        let mut entries = self.entries.write().map_err(|_| KeyStoreError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }

    fn read_all(&self) -> KeyStoreResult<HashMap<String, String>> {
        let entries = self.entries.read().map_err(|_| KeyStoreError::Poisoned)?;
        Ok(entries.clone())
    }

    fn delete_all(&self) -> KeyStoreResult<()> {
        let mut entries = self.entries.write().map_err(|_| KeyStoreError::Poisoned)?;
        entries.clear();
        Ok(())
    }
}
