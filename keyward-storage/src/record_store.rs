//! Record storage interface and the in-memory backend.

use crate::error::StorageResult;
use crate::record::Record;
use crate::settings::poisoned;
use std::collections::HashMap;
use std::sync::RwLock;

/// Persistence for records. Implementations store exactly what they are given;
/// encryption happens above this layer.
pub trait RecordStorage: Send + Sync {
    /// Inserts or replaces a record in one atomic write.
    fn put(&self, record: &Record) -> StorageResult<()>;
    fn get(&self, id: &str) -> StorageResult<Option<Record>>;
    /// Removes a record. Missing ids are not an error.
    fn delete(&self, id: &str) -> StorageResult<()>;
    /// Records of `record_type` (or all records), most recently modified first.
    fn list(&self, record_type: Option<&str>) -> StorageResult<Vec<Record>>;
}

pub(crate) fn sort_for_listing(records: &mut [Record]) {
    records.sort_by(|a, b| b.modified_at.cmp(&a.modified_at).then(a.id.cmp(&b.id)));
}

#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<String, Record>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStorage for MemoryRecordStore {
    fn put(&self, record: &Record) -> StorageResult<()> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> StorageResult<Option<Record>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.get(id).cloned())
    }

    fn delete(&self, id: &str) -> StorageResult<()> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        records.remove(id);
        Ok(())
    }

    fn list(&self, record_type: Option<&str>) -> StorageResult<Vec<Record>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        let mut out: Vec<Record> = records
            .values()
            .filter(|r| record_type.is_none_or(|t| r.record_type == t))
            .cloned()
            .collect();
        sort_for_listing(&mut out);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_filters_by_type_and_orders_by_modified_desc() {
        let store = MemoryRecordStore::new();
        let mut a = Record::from_json("a", "event", json!({}));
        a.modified_at = 10;
        let mut b = Record::from_json("b", "event", json!({}));
        b.modified_at = 20;
        let c = Record::from_json("c", "note", json!({}));
        for r in [&a, &b, &c] {
            store.put(r).unwrap();
        }

        let ids: Vec<_> = store
            .list(Some("event"))
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(store.list(None).unwrap().len(), 3);
    }

    #[test]
    fn delete_missing_is_ok() {
        let store = MemoryRecordStore::new();
        store.delete("nope").unwrap();
        assert!(store.get("nope").unwrap().is_none());
    }
}
