//! Transparent field-level encryption over a [`RecordStorage`].
//!
//! Sensitive fields (chosen by the caller's [`SensitiveFieldPolicy`]) are
//! replaced by the wire map of an [`EncryptedPayload`] holding the field's
//! JSON, and listed in the record's [`EncryptionState`]. Reads reverse this.
//! A field whose key is gone or whose payload fails authentication is
//! returned as stored and logged. Infrastructure failures are propagated.

use crate::error::{StorageError, StorageResult};
use crate::file::inaccessible_on_contract_violation;
use crate::record::{EncryptionState, Record};
use crate::record_store::RecordStorage;
use crate::settings::{ENCRYPTION_ENABLED, SettingsStore, field_key_setting};
use keyward_vault::{EncryptedPayload, EncryptionService, VaultError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// A field that must be encrypted, and the key purpose protecting it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SensitiveField {
    pub field: String,
    pub purpose: String,
}

/// Record type → sensitive fields. Types without an entry pass through.
#[derive(Clone, Debug, Default)]
pub struct SensitiveFieldPolicy {
    by_type: HashMap<String, Vec<SensitiveField>>,
}

impl SensitiveFieldPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(
        mut self,
        record_type: impl Into<String>,
        field: impl Into<String>,
        purpose: impl Into<String>,
    ) -> Self {
        self.by_type
            .entry(record_type.into())
            .or_default()
            .push(SensitiveField {
                field: field.into(),
                purpose: purpose.into(),
            });
        self
    }

    pub fn fields_for(&self, record_type: &str) -> &[SensitiveField] {
        self.by_type
            .get(record_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_sensitive(&self, record_type: &str) -> bool {
        !self.fields_for(record_type).is_empty()
    }
}

/// Record store wrapper that encrypts sensitive fields at rest.
pub struct EncryptedRecordStore {
    records: Arc<dyn RecordStorage>,
    settings: Arc<dyn SettingsStore>,
    service: Arc<EncryptionService>,
    policy: SensitiveFieldPolicy,
    // Serializes lazy key creation so one purpose never gets two keys.
    key_lock: Mutex<()>,
}

impl EncryptedRecordStore {
    pub fn new(
        records: Arc<dyn RecordStorage>,
        settings: Arc<dyn SettingsStore>,
        service: Arc<EncryptionService>,
        policy: SensitiveFieldPolicy,
    ) -> Self {
        Self {
            records,
            settings,
            service,
            policy,
            key_lock: Mutex::new(()),
        }
    }

    pub fn policy(&self) -> &SensitiveFieldPolicy {
        &self.policy
    }

    // =========================================================================
    // Settings
    // =========================================================================

    /// The persisted flag; `false` when never set.
    pub fn is_encryption_enabled(&self) -> StorageResult<bool> {
        Ok(self
            .settings
            .get_setting(ENCRYPTION_ENABLED)?
            .is_some_and(|v| v == "true"))
    }

    pub fn set_encryption_enabled(&self, enabled: bool) -> StorageResult<()> {
        self.settings
            .set_setting(ENCRYPTION_ENABLED, if enabled { "true" } else { "false" })?;
        info!(enabled, "record encryption flag changed");
        Ok(())
    }

    /// Key id for `purpose`, created on first use and remembered in settings.
    ///
    /// A remembered id whose key has since been deleted is replaced.
    pub fn key_for_purpose(&self, purpose: &str) -> StorageResult<String> {
        let _guard = self
            .key_lock
            .lock()
            .map_err(|_| StorageError::Storage("key lock poisoned".into()))?;

        let setting = field_key_setting(purpose);
        if let Some(key_id) = self.settings.get_setting(&setting)? {
            if self.service.key_info(&key_id)?.is_some() {
                return Ok(key_id);
            }
            warn!(purpose, key_id = %key_id, "remembered field key is gone, creating a new one");
        }

        let key_id = self.service.create_encryption_key(purpose)?;
        self.settings.set_setting(&setting, &key_id)?;
        info!(purpose, key_id = %key_id, "created field key");
        Ok(key_id)
    }

    // =========================================================================
    // Records
    // =========================================================================

    /// Stores a record, encrypting its sensitive fields when encryption is enabled.
    pub fn put(&self, record: &Record) -> StorageResult<()> {
        if self.is_encryption_enabled()? && self.policy.is_sensitive(&record.record_type) {
            let (encrypted, _) = self.encrypt_record(record.clone())?;
            self.records.put(&encrypted)
        } else {
            self.records.put(record)
        }
    }

    /// Loads a record with its encrypted fields decrypted.
    pub fn get(&self, id: &str) -> StorageResult<Option<Record>> {
        self.records
            .get(id)?
            .map(|r| self.decrypt_record(r))
            .transpose()
    }

    pub fn list(&self, record_type: Option<&str>) -> StorageResult<Vec<Record>> {
        self.records
            .list(record_type)?
            .into_iter()
            .map(|r| self.decrypt_record(r))
            .collect()
    }

    pub fn delete(&self, id: &str) -> StorageResult<()> {
        self.records.delete(id)
    }

    /// Encrypts every sensitive field not yet listed in a record's marker.
    ///
    /// Each migrated row is written with a single `put`. Returns the number of
    /// rows written; a second run returns 0. Enables the encryption flag on
    /// success so later writes stay encrypted.
    pub fn migrate_to_encryption(&self) -> StorageResult<usize> {
        if !self.service.is_initialized() {
            return Err(VaultError::NotInitialized.into());
        }

        let mut migrated = 0usize;
        for record in self.records.list(None)? {
            if !self.policy.is_sensitive(&record.record_type) {
                continue;
            }
            let id = record.id.clone();
            let (encrypted, changed) = self.encrypt_record(record)?;
            if changed {
                self.records.put(&encrypted)?;
                debug!(record_id = %id, "migrated record");
                migrated += 1;
            }
        }

        self.set_encryption_enabled(true)?;
        info!(migrated, "migration to encryption complete");
        Ok(migrated)
    }

    /// Returns the record with its pending sensitive fields encrypted and
    /// whether anything changed.
    ///
    /// A field listed in the marker is skipped only while it still holds a
    /// payload; a listed field carrying anything else is encrypted again.
    fn encrypt_record(&self, mut record: Record) -> StorageResult<(Record, bool)> {
        let mut state = record.encryption.take().unwrap_or_default();
        let mut changed = false;

        for SensitiveField { field, purpose } in self.policy.fields_for(&record.record_type) {
            let Some(value) = record.data.get(field).filter(|v| !v.is_null()) else {
                state.unmark(field);
                continue;
            };
            if state.contains(field) && EncryptedPayload::looks_like_payload(value) {
                continue;
            }

            let json = serde_json::to_string(value)?;
            let key_id = self.key_for_purpose(purpose)?;
            let payload = self
                .service
                .encrypt_data(&json, &key_id)?
                .ok_or_else(|| StorageError::MissingKey(key_id.clone()))?;

            record
                .data
                .insert(field.clone(), Value::Object(payload.to_wire_map()?));
            state.mark(field);
            changed = true;
        }

        record.encryption = (!state.fields.is_empty()).then_some(state);
        Ok((record, changed))
    }

    /// Decrypts listed fields in place. Inaccessible fields keep their stored
    /// value and stay listed in the marker.
    fn decrypt_record(&self, mut record: Record) -> StorageResult<Record> {
        let Some(mut state) = record.encryption.take() else {
            return Ok(record);
        };

        for field in state.fields.clone() {
            match self.decrypt_field(&record, &field)? {
                Some(value) => {
                    record.data.insert(field.clone(), value);
                    state.unmark(&field);
                }
                None => warn!(
                    record_id = %record.id,
                    field = %field,
                    "encrypted field is inaccessible, returning stored value"
                ),
            }
        }

        record.encryption = (!state.fields.is_empty()).then_some(state);
        Ok(record)
    }

    /// `Ok(None)` when the field is inaccessible: missing key, failed tag,
    /// malformed payload or a payload that breaks the decrypt contract.
    fn decrypt_field(&self, record: &Record, field: &str) -> StorageResult<Option<Value>> {
        let Some(map) = record.data.get(field).and_then(Value::as_object) else {
            return Ok(None);
        };
        let payload = match EncryptedPayload::from_wire_map(map) {
            Ok(p) => p,
            Err(e) => {
                debug!(record_id = %record.id, field, "malformed payload: {e}");
                return Ok(None);
            }
        };
        let Some(json) = inaccessible_on_contract_violation(self.service.decrypt_data(&payload))?
        else {
            return Ok(None);
        };
        Ok(serde_json::from_str(&json)
            .inspect_err(|e| debug!(record_id = %record.id, field, "decrypted field is not JSON: {e}"))
            .ok())
    }
}
