//! Contract tests run against every key store backend.

use keyward_keystore::{DuckDbKeyStore, KeyStore, MemoryKeyStore};
use std::sync::Arc;

fn backends() -> Vec<(&'static str, Arc<dyn KeyStore>)> {
    vec![
        ("memory", Arc::new(MemoryKeyStore::new())),
        ("duckdb", Arc::new(DuckDbKeyStore::open_in_memory().unwrap())),
    ]
}

#[test]
fn absent_key_reads_none() {
    for (name, store) in backends() {
        assert_eq!(store.read("missing").unwrap(), None, "{name}");
    }
}

#[test]
fn write_overwrites_existing_value() {
    for (name, store) in backends() {
        store.write("k", "v1").unwrap();
        store.write("k", "v2").unwrap();
        assert_eq!(store.read("k").unwrap().as_deref(), Some("v2"), "{name}");
        assert_eq!(store.read_all().unwrap().len(), 1, "{name}");
    }
}

#[test]
fn delete_is_idempotent() {
    for (name, store) in backends() {
        store.write("k", "v").unwrap();
        store.delete("k").unwrap();
        store.delete("k").unwrap();
        assert_eq!(store.read("k").unwrap(), None, "{name}");
    }
}

#[test]
fn read_prefix_returns_only_matching_entries() {
    for (name, store) in backends() {
        store.write("enc_key.a", "1").unwrap();
        store.write("enc_key.b", "2").unwrap();
        store.write("key_backup.c", "3").unwrap();

        let keys = store.read_prefix("enc_key.").unwrap();
        assert_eq!(keys.len(), 2, "{name}");
        assert_eq!(keys.get("enc_key.b").map(String::as_str), Some("2"), "{name}");
    }
}

#[test]
fn delete_all_empties_store() {
    for (name, store) in backends() {
        store.write("a", "1").unwrap();
        store.write("b", "2").unwrap();
        store.delete_all().unwrap();
        assert!(store.read_all().unwrap().is_empty(), "{name}");
    }
}

#[test]
fn duckdb_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("keys.duckdb");

    {
        let store = DuckDbKeyStore::open(&path).unwrap();
        store.write("enc_key.notes", "material").unwrap();
    }

    let reopened = DuckDbKeyStore::open(&path).unwrap();
    assert_eq!(
        reopened.read("enc_key.notes").unwrap().as_deref(),
        Some("material")
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_readers_and_writers() {
    for (_, store) in backends() {
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                let key = format!("k{i}");
                store.write(&key, &i.to_string()).unwrap();
                store.read(&key).unwrap()
            }));
        }
        for (i, h) in handles.into_iter().enumerate() {
            assert_eq!(h.await.unwrap(), Some(i.to_string()));
        }
        assert_eq!(store.read_all().unwrap().len(), 16);
    }
}
