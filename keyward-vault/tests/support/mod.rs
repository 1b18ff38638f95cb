//! Shared helpers for vault integration tests.

#![allow(dead_code)]

use keyward_keystore::{KeyStore, MemoryKeyStore};
use keyward_vault::{EncryptionService, SecureKeyManager, VaultConfig};
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

/// Installs a test-writer subscriber once per binary. Honors `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// An initialized service over a fresh in-memory store, with a one-pass KDF.
pub fn service() -> Arc<EncryptionService> {
    service_with_store(Arc::new(MemoryKeyStore::new()))
}

pub fn service_with_store(store: Arc<dyn KeyStore>) -> Arc<EncryptionService> {
    init_tracing();
    let svc = Arc::new(EncryptionService::with_config(store, VaultConfig::fast_kdf()));
    svc.initialize().expect("initialize");
    svc
}

pub fn manager() -> SecureKeyManager {
    SecureKeyManager::new(service())
}

pub const MASTER: &str = "correct-horse-battery";
