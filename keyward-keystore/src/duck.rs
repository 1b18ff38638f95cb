//! DuckDB-backed key store.

use crate::{KeyStore, KeyStoreError, KeyStoreResult};
use duckdb::{Connection, params};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Key store persisted in a single `key_store` table.
///
/// The connection mutex is held for one statement at a time.
pub struct DuckDbKeyStore {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbKeyStore {
    /// Opens (or creates) a key store at `path`.
    pub fn open(path: &Path) -> KeyStoreResult<Self> {
        let conn = Connection::open(path)?;
        // DuckDB otherwise claims most of RAM and every core.
        conn.execute_batch("PRAGMA memory_limit='64MB'; PRAGMA threads=1;")?;
        debug!("opened key store at {}", path.display());
        Self::open_with_conn(Arc::new(Mutex::new(conn)))
    }

    /// Opens an in-memory key store.
    pub fn open_in_memory() -> KeyStoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::open_with_conn(Arc::new(Mutex::new(conn)))
    }

    /// Opens with an existing shared connection.
    pub fn open_with_conn(conn: Arc<Mutex<Connection>>) -> KeyStoreResult<Self> {
        let store = Self { conn };
        store.ensure_tables()?;
        Ok(store)
    }

    fn ensure_tables(&self) -> KeyStoreResult<()> {
        let conn = self.conn.lock().map_err(|_| KeyStoreError::Poisoned)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS key_store (
                key VARCHAR PRIMARY KEY,
                value VARCHAR NOT NULL
            );",
        )?;
        Ok(())
    }
}

impl KeyStore for DuckDbKeyStore {
    fn read(&self, key: &str) -> KeyStoreResult<Option<String>> {
        let conn = self.conn.lock().map_err(|_| KeyStoreError::Poisoned)?;
        let mut stmt = conn.prepare("SELECT value FROM key_store WHERE key = ?")?;
        let mut rows = stmt.query_map(params![key], |row| row.get::<_, String>(0))?;
        match rows.next() {
            Some(value) => Ok(Some(value?)),
            None => Ok(None),
        }
    }

    fn write(&self, key: &str, value: &str) -> KeyStoreResult<()> {
        let conn = self.conn.lock().map_err(|_| KeyStoreError::Poisoned)?;
        conn.execute(
            "INSERT OR REPLACE INTO key_store (key, value) VALUES (?, ?)",
            params![key, value],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> KeyStoreResult<()> {
        let conn = self.conn.lock().map_err(|_| KeyStoreError::Poisoned)?;
        conn.execute("DELETE FROM key_store WHERE key = ?", params![key])?;
        Ok(())
    }

    fn read_all(&self) -> KeyStoreResult<HashMap<String, String>> {
        let conn = self.conn.lock().map_err(|_| KeyStoreError::Poisoned)?;
        let mut stmt = conn.prepare("SELECT key, value FROM key_store")?;
        let entries = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(entries)
    }

    fn delete_all(&self) -> KeyStoreResult<()> {
        let conn = self.conn.lock().map_err(|_| KeyStoreError::Poisoned)?;
        conn.execute_batch("DELETE FROM key_store;")?;
        Ok(())
    }

    fn read_prefix(&self, prefix: &str) -> KeyStoreResult<HashMap<String, String>> {
        let conn = self.conn.lock().map_err(|_| KeyStoreError::Poisoned)?;
        let mut stmt = conn.prepare("SELECT key, value FROM key_store WHERE starts_with(key, ?)")?;
        let entries = stmt
            .query_map(params![prefix], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(entries)
    }
}
