//! Shared helpers for storage integration tests.

#![allow(dead_code)]

use keyward_keystore::MemoryKeyStore;
use keyward_storage::{
    EncryptedRecordStore, FileEncryptor, MemoryRecordStore, MemorySettingsStore, RecordStorage,
    SensitiveFieldPolicy, SettingsStore,
};
use keyward_vault::{EncryptionService, VaultConfig};
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn service() -> Arc<EncryptionService> {
    init_tracing();
    let svc = Arc::new(EncryptionService::with_config(
        Arc::new(MemoryKeyStore::new()),
        VaultConfig::fast_kdf(),
    ));
    svc.initialize().expect("initialize");
    svc
}

/// Calendar events with encrypted description, location and attendees.
pub fn event_policy() -> SensitiveFieldPolicy {
    SensitiveFieldPolicy::new()
        .with_field("event", "description", "description")
        .with_field("event", "location", "location")
        .with_field("event", "attendees", "attendees")
}

pub struct Fixture {
    pub records: Arc<MemoryRecordStore>,
    pub settings: Arc<MemorySettingsStore>,
    pub service: Arc<EncryptionService>,
    pub store: EncryptedRecordStore,
}

pub fn fixture() -> Fixture {
    let records = Arc::new(MemoryRecordStore::new());
    let settings = Arc::new(MemorySettingsStore::new());
    let service = service();
    let store = EncryptedRecordStore::new(
        records.clone() as Arc<dyn RecordStorage>,
        settings.clone() as Arc<dyn SettingsStore>,
        service.clone(),
        event_policy(),
    );
    Fixture {
        records,
        settings,
        service,
        store,
    }
}

pub fn file_encryptor() -> FileEncryptor {
    FileEncryptor::new(service())
}
