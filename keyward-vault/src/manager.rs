//! Key rotation, password-protected backup/restore and secure deletion.

use crate::backup::{BACKUP_PREFIX, KeyBackup, KeyBackupSummary, store_key_for as backup_key};
use crate::error::{VaultError, VaultResult};
use crate::key::{KeyOrigin, KeyTombstone, store_key_for};
use crate::service::EncryptionService;
use chrono::Utc;
use keyward_crypto::{EncryptedPayload, KEY_SIZE, KeyMaterial, fill_random, generate_random_key};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use zeroize::Zeroize;

/// Key administration on top of an [`EncryptionService`].
///
/// Rotation only manufactures new key material. Re-encrypting existing
/// ciphertext under the new key is the caller's job
/// (see [`SecureKeyManager::reencrypt_payload`]).
pub struct SecureKeyManager {
    service: Arc<EncryptionService>,
}

impl SecureKeyManager {
    pub fn new(service: Arc<EncryptionService>) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &Arc<EncryptionService> {
        &self.service
    }

    /// Creates a new key with the same purpose as `old_key_id`.
    ///
    /// Returns `Ok(None)` when the old key does not exist. The old key is kept.
    pub fn rotate_key(&self, old_key_id: &str) -> VaultResult<Option<String>> {
        let Some(purpose) = self.service.key_info(old_key_id)?.map(|i| i.purpose) else {
            debug!(old_key_id, "rotate: key not found");
            return Ok(None);
        };
        let material = generate_random_key()?;
        let new_id = self.service.install_key(
            &purpose,
            &material,
            KeyOrigin::Rotated {
                from: old_key_id.to_string(),
            },
        )?;
        info!(old_key_id, new_key_id = %new_id, "rotated key");
        Ok(Some(new_id))
    }

    /// Decrypts `payload` and re-encrypts it under `new_key_id`.
    ///
    /// `Ok(None)` if either key is missing or the payload fails authentication.
    pub fn reencrypt_payload(
        &self,
        payload: &EncryptedPayload,
        new_key_id: &str,
    ) -> VaultResult<Option<EncryptedPayload>> {
        let Some(mut plaintext) = self.service.decrypt_bytes(payload)? else {
            return Ok(None);
        };
        let result = self.service.encrypt_bytes(&plaintext, new_key_id);
        plaintext.zeroize();
        result
    }

    // =========================================================================
    // Backups
    // =========================================================================

    /// Wraps the key's material with `master_password` and persists a backup.
    ///
    /// Returns the backup id, or `Ok(None)` when the key does not exist.
    pub fn create_key_backup(
        &self,
        key_id: &str,
        master_password: &str,
    ) -> VaultResult<Option<String>> {
        self.check_master_password(master_password)?;
        if !self.service.is_initialized() {
            return Err(VaultError::NotInitialized);
        }
        let Some(record) = self.service.load_key(key_id)? else {
            debug!(key_id, "backup: key not found");
            return Ok(None);
        };

        let wrapped_key = self
            .service
            .encrypt_bytes_with_password(&record.material, master_password)?;

        let backup = KeyBackup {
            backup_id: format!("backup_{}", Uuid::now_v7()),
            original_key_id: key_id.to_string(),
            purpose: record.purpose.clone(),
            created_at: Utc::now(),
            is_password_protected: true,
            wrapped_key,
        };
        let json = serde_json::to_string(&backup).map_err(|e| VaultError::Corrupt(e.to_string()))?;
        self.service
            .key_store()
            .write(&backup_key(&backup.backup_id), &json)?;

        info!(key_id, backup_id = %backup.backup_id, "created key backup");
        Ok(Some(backup.backup_id))
    }

    /// Backup metadata, newest first. Wrapped key bytes are not returned.
    pub fn list_key_backups(&self) -> VaultResult<Vec<KeyBackupSummary>> {
        let mut summaries: Vec<KeyBackupSummary> = self
            .service
            .key_store()
            .read_prefix(BACKUP_PREFIX)?
            .into_iter()
            .filter_map(|(k, json)| match serde_json::from_str::<KeyBackup>(&json) {
                Ok(backup) => Some(KeyBackupSummary::from(&backup)),
                Err(e) => {
                    warn!("skipping unreadable backup {k}: {e}");
                    None
                }
            })
            .collect();
        summaries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.backup_id.cmp(&a.backup_id))
        });
        Ok(summaries)
    }

    fn load_backup(&self, backup_id: &str) -> VaultResult<Option<KeyBackup>> {
        match self.service.key_store().read(&backup_key(backup_id))? {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| VaultError::Corrupt(format!("backup {backup_id}: {e}"))),
            None => Ok(None),
        }
    }

    /// Unwraps a backup and installs the material under a new key id.
    ///
    /// `Ok(None)` for an unknown backup or a wrong password.
    pub fn restore_key_from_backup(
        &self,
        backup_id: &str,
        master_password: &str,
    ) -> VaultResult<Option<String>> {
        if !self.service.is_initialized() {
            return Err(VaultError::NotInitialized);
        }
        let Some(backup) = self.load_backup(backup_id)? else {
            debug!(backup_id, "restore: backup not found");
            return Ok(None);
        };

        let Some(mut raw) = self
            .service
            .decrypt_bytes_with_password(&backup.wrapped_key, master_password)?
        else {
            debug!(backup_id, "restore: wrong password or tampered backup");
            return Ok(None);
        };

        let material = KeyMaterial::from_slice(&raw);
        raw.zeroize();
        let material = material.map_err(|_| {
            VaultError::Corrupt(format!("backup {backup_id}: unwrapped key is not {KEY_SIZE} bytes"))
        })?;

        let new_id = self.service.install_key(
            &backup.purpose,
            &material,
            KeyOrigin::Restored {
                backup_id: backup_id.to_string(),
            },
        )?;
        info!(backup_id, new_key_id = %new_id, "restored key from backup");
        Ok(Some(new_id))
    }

    /// Removes a backup record. Idempotent.
    pub fn delete_key_backup(&self, backup_id: &str) -> VaultResult<bool> {
        self.service.key_store().delete(&backup_key(backup_id))?;
        info!(backup_id, "deleted key backup");
        Ok(true)
    }

    // =========================================================================
    // Deletion
    // =========================================================================

    /// Overwrites the stored key record with a random tombstone, then removes
    /// it. Readers see the key as missing from the overwrite on. Idempotent.
    pub fn secure_delete_key(&self, key_id: &str) -> VaultResult<bool> {
        if !self.service.is_initialized() {
            return Err(VaultError::NotInitialized);
        }
        let store_key = store_key_for(key_id);
        let store = self.service.key_store();

        if let Some(existing) = store.read(&store_key)? {
            let mut noise = vec![0u8; existing.len() * 3 / 4];
            fill_random(&mut noise)?;
            store.write(&store_key, &KeyTombstone::new(key_id, noise).to_json()?)?;
        }
        store.delete(&store_key)?;
        info!(key_id, "securely deleted key");
        Ok(true)
    }

    fn check_master_password(&self, password: &str) -> VaultResult<()> {
        let min = self.service.config().min_master_password_len;
        if password.chars().count() < min {
            return Err(VaultError::PasswordTooShort { min });
        }
        Ok(())
    }
}
