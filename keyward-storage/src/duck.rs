//! DuckDB-backed record and settings store.
//!
//! Record data is stored as JSON text in `data_json`. The encryption marker
//! lives in its own `encryption_json` column so a row's encrypted state is
//! visible without parsing its payload.

use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};
use crate::record::{EncryptionState, Record};
use crate::record_store::RecordStorage;
use crate::settings::SettingsStore;
use duckdb::{Connection, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Opens a DuckDB database, retrying once without a stale WAL file, and
/// applies resource limits.
///
/// An unclean shutdown can leave a `.wal` next to the database that prevents
/// reopening; it is removed and the open retried.
pub fn open_duckdb_with_wal_recovery(
    path: &Path,
    memory_limit: &str,
    threads: u32,
) -> StorageResult<Connection> {
    let conn = match Connection::open(path) {
        Ok(c) => c,
        Err(first_err) => {
            let wal_path = path.with_extension(
                path.extension()
                    .map(|ext| format!("{}.wal", ext.to_string_lossy()))
                    .unwrap_or_else(|| "wal".to_string()),
            );
            if !(wal_path.exists() && std::fs::remove_file(&wal_path).is_ok()) {
                return Err(first_err.into());
            }
            warn!("duckdb open failed, removed stale WAL {}", wal_path.display());
            Connection::open(path)?
        }
    };
    // DuckDB otherwise claims most of RAM and every core per database.
    conn.execute_batch(&format!(
        "PRAGMA memory_limit='{memory_limit}'; PRAGMA threads={threads};"
    ))?;
    Ok(conn)
}

/// Records and settings in one DuckDB database.
#[derive(Clone)]
pub struct DuckRecordStore {
    conn: Arc<Mutex<Connection>>,
}

type Row = (String, String, String, Option<String>, i64, i64);

impl DuckRecordStore {
    /// Opens (or creates) a store at `path`.
    pub fn open(path: &Path, config: &StorageConfig) -> StorageResult<Self> {
        config.validate()?;
        let conn = open_duckdb_with_wal_recovery(
            path,
            &config.duckdb_memory_limit,
            config.duckdb_threads,
        )?;
        debug!("opened record store at {}", path.display());
        Self::open_with_conn(Arc::new(Mutex::new(conn)))
    }

    pub fn open_in_memory() -> StorageResult<Self> {
        Self::open_with_conn(Arc::new(Mutex::new(Connection::open_in_memory()?)))
    }

    /// Opens with an existing shared connection.
    pub fn open_with_conn(conn: Arc<Mutex<Connection>>) -> StorageResult<Self> {
        let store = Self { conn };
        store.ensure_tables()?;
        Ok(store)
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Storage("connection lock poisoned".into()))
    }

    fn ensure_tables(&self) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS records (
                id VARCHAR PRIMARY KEY,
                record_type VARCHAR NOT NULL,
                data_json VARCHAR NOT NULL,
                encryption_json VARCHAR,
                created_at BIGINT NOT NULL,
                modified_at BIGINT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS settings (
                key VARCHAR PRIMARY KEY,
                value VARCHAR NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn row_to_record(row: Row) -> StorageResult<Record> {
        let (id, record_type, data_json, encryption_json, created_at, modified_at) = row;
        let data = serde_json::from_str(&data_json)?;
        let encryption = encryption_json
            .map(|json| serde_json::from_str::<EncryptionState>(&json))
            .transpose()?;
        Ok(Record {
            id,
            record_type,
            data,
            created_at,
            modified_at,
            encryption,
        })
    }
}

impl RecordStorage for DuckRecordStore {
    fn put(&self, record: &Record) -> StorageResult<()> {
        let data_json = serde_json::to_string(&record.data)?;
        let encryption_json = record
            .encryption
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO records (
                id, record_type, data_json, encryption_json, created_at, modified_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                record.id,
                record.record_type,
                data_json,
                encryption_json,
                record.created_at,
                record.modified_at,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> StorageResult<Option<Record>> {
        let conn = self.lock()?;
        let result = conn.query_row(
            "SELECT id, record_type, data_json, encryption_json, created_at, modified_at FROM records WHERE id = ?",
            params![id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            },
        );
        match result {
            Ok(row) => {
                drop(conn);
                Ok(Some(Self::row_to_record(row)?))
            }
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, id: &str) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM records WHERE id = ?", params![id])?;
        Ok(())
    }

    fn list(&self, record_type: Option<&str>) -> StorageResult<Vec<Record>> {
        let mut sql = String::from(
            "SELECT id, record_type, data_json, encryption_json, created_at, modified_at FROM records",
        );
        if record_type.is_some() {
            sql.push_str(" WHERE record_type = ?");
        }
        sql.push_str(" ORDER BY modified_at DESC, id ASC");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let map_row = |row: &duckdb::Row<'_>| -> duckdb::Result<Row> {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, i64>(5)?,
            ))
        };
        let rows: Vec<Row> = match record_type {
            Some(t) => stmt
                .query_map(params![t], map_row)?
                .collect::<Result<Vec<_>, duckdb::Error>>()?,
            None => stmt
                .query_map([], map_row)?
                .collect::<Result<Vec<_>, duckdb::Error>>()?,
        };
        drop(stmt);
        drop(conn);

        rows.into_iter().map(Self::row_to_record).collect()
    }
}

impl SettingsStore for DuckRecordStore {
    fn get_setting(&self, key: &str) -> StorageResult<Option<String>> {
        let conn = self.lock()?;
        let result = conn.query_row(
            "SELECT value FROM settings WHERE key = ?",
            params![key],
            |row| row.get::<_, String>(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_setting(&self, key: &str, value: &str) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)",
            params![key, value],
        )?;
        Ok(())
    }
}
