//! Password-wrapped key backups.

use chrono::{DateTime, Utc};
use keyward_crypto::PasswordEncryptedPayload;
use serde::{Deserialize, Serialize};

/// Key store prefix for backup records.
pub(crate) const BACKUP_PREFIX: &str = "key_backup.";

pub(crate) fn store_key_for(backup_id: &str) -> String {
    format!("{BACKUP_PREFIX}{backup_id}")
}

/// A persisted backup. Holds only the wrapped key, never plaintext material.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyBackup {
    pub backup_id: String,
    pub original_key_id: String,
    /// Purpose of the original key, reused by the restored key.
    pub purpose: String,
    pub created_at: DateTime<Utc>,
    pub is_password_protected: bool,
    pub wrapped_key: PasswordEncryptedPayload,
}

/// Backup metadata for listings (no wrapped bytes).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyBackupSummary {
    pub backup_id: String,
    pub original_key_id: String,
    pub purpose: String,
    pub created_at: DateTime<Utc>,
    pub is_password_protected: bool,
}

impl From<&KeyBackup> for KeyBackupSummary {
    fn from(backup: &KeyBackup) -> Self {
        Self {
            backup_id: backup.backup_id.clone(),
            original_key_id: backup.original_key_id.clone(),
            purpose: backup.purpose.clone(),
            created_at: backup.created_at,
            is_password_protected: backup.is_password_protected,
        }
    }
}
