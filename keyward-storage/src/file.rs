//! Whole-file encryption and the key helpers shared by the file paths.

use crate::config::StorageConfig;
use crate::error::{StorageError, StorageResult};
use chrono::{DateTime, Utc};
use keyward_crypto::payload::b64;
use keyward_crypto::{Algorithm, EncryptedPayload, PasswordEncryptedPayload, sha256_hex};
use keyward_vault::{EncryptionService, VaultError};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Describes an encrypted file. Ciphertext travels separately.
///
/// Key-encrypted files carry `keyId`; password-encrypted files carry `salt`
/// and `iterations` instead.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedFileMetadata {
    pub original_size: u64,
    pub encrypted_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(with = "b64")]
    pub iv: Vec<u8>,
    #[serde(default, with = "b64::option", skip_serializing_if = "Option::is_none")]
    pub salt: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
    #[serde(with = "b64")]
    pub tag: Vec<u8>,
    pub algorithm: Algorithm,
    pub created: DateTime<Utc>,
    /// SHA-256 hex of the plaintext.
    pub checksum: String,
}

/// File, chunk and metadata encryption on top of an [`EncryptionService`].
pub struct FileEncryptor {
    pub(crate) service: Arc<EncryptionService>,
    pub(crate) config: StorageConfig,
    provider_lock: Mutex<()>,
}

impl FileEncryptor {
    pub fn new(service: Arc<EncryptionService>) -> Self {
        Self::with_config(service, StorageConfig::default())
    }

    pub fn with_config(service: Arc<EncryptionService>, config: StorageConfig) -> Self {
        Self {
            service,
            config,
            provider_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    // =========================================================================
    // Keys
    // =========================================================================

    /// Creates a dedicated key for one file (purpose `file_{fileId}`).
    pub fn create_file_encryption_key(&self, file_id: &str) -> StorageResult<String> {
        let purpose = format!("file_{}", sanitize_name(file_id, "file id")?);
        Ok(self.service.create_encryption_key(&purpose)?)
    }

    /// Returns the provider's key (purpose `cloud_provider_{provider}`),
    /// creating it on first use.
    pub fn create_cloud_provider_key(&self, provider: &str) -> StorageResult<String> {
        let purpose = format!("cloud_provider_{}", sanitize_name(provider, "provider")?);
        let _guard = self
            .provider_lock
            .lock()
            .map_err(|_| StorageError::Storage("provider key lock poisoned".into()))?;

        if let Some(key_id) = self.service.find_key_for_purpose(&purpose)? {
            return Ok(key_id);
        }
        let key_id = self.service.create_encryption_key(&purpose)?;
        info!(provider, key_id = %key_id, "created cloud provider key");
        Ok(key_id)
    }

    // =========================================================================
    // Whole files
    // =========================================================================

    /// Encrypts a file under `key_id`. `Ok(None)` when the key does not exist.
    pub fn encrypt_file(
        &self,
        data: &[u8],
        key_id: &str,
    ) -> StorageResult<Option<(Vec<u8>, EncryptedFileMetadata)>> {
        let Some(payload) = self.service.encrypt_bytes(data, key_id)? else {
            return Ok(None);
        };
        let metadata = EncryptedFileMetadata {
            original_size: data.len() as u64,
            encrypted_size: payload.ciphertext.len() as u64,
            key_id: payload.key_id,
            iv: payload.iv,
            salt: None,
            iterations: None,
            tag: payload.tag,
            algorithm: payload.algorithm,
            created: Utc::now(),
            checksum: sha256_hex(data),
        };
        Ok(Some((payload.ciphertext, metadata)))
    }

    /// Encrypts a file under a password-derived key. Nothing is persisted.
    pub fn encrypt_file_with_password(
        &self,
        data: &[u8],
        password: &str,
    ) -> StorageResult<(Vec<u8>, EncryptedFileMetadata)> {
        let sealed = self.service.encrypt_bytes_with_password(data, password)?;
        let PasswordEncryptedPayload {
            payload,
            salt,
            iterations,
        } = sealed;
        let metadata = EncryptedFileMetadata {
            original_size: data.len() as u64,
            encrypted_size: payload.ciphertext.len() as u64,
            key_id: None,
            iv: payload.iv,
            salt: Some(salt),
            iterations: Some(iterations),
            tag: payload.tag,
            algorithm: payload.algorithm,
            created: Utc::now(),
            checksum: sha256_hex(data),
        };
        Ok((payload.ciphertext, metadata))
    }

    /// Decrypts a key-encrypted file and verifies its checksum.
    ///
    /// Metadata without `keyId` is a precondition violation. Unknown keys,
    /// failed tags and checksum mismatches return `Ok(None)`.
    pub fn decrypt_file(
        &self,
        ciphertext: &[u8],
        metadata: &EncryptedFileMetadata,
    ) -> StorageResult<Option<Vec<u8>>> {
        if metadata.salt.is_some() {
            return Err(StorageError::Precondition(
                "file is password-encrypted, use decrypt_file_with_password".into(),
            ));
        }
        let payload = EncryptedPayload {
            ciphertext: ciphertext.to_vec(),
            iv: metadata.iv.clone(),
            tag: metadata.tag.clone(),
            key_id: metadata.key_id.clone(),
            algorithm: metadata.algorithm,
        };
        let plaintext = self.service.decrypt_bytes(&payload)?;
        Ok(plaintext.and_then(|p| verified(p, metadata)))
    }

    /// Decrypts a password-encrypted file and verifies its checksum.
    pub fn decrypt_file_with_password(
        &self,
        ciphertext: &[u8],
        metadata: &EncryptedFileMetadata,
        password: &str,
    ) -> StorageResult<Option<Vec<u8>>> {
        let (Some(salt), Some(iterations)) = (metadata.salt.clone(), metadata.iterations) else {
            return Err(StorageError::Precondition(
                "file metadata lacks salt/iterations".into(),
            ));
        };
        let sealed = PasswordEncryptedPayload {
            payload: EncryptedPayload {
                ciphertext: ciphertext.to_vec(),
                iv: metadata.iv.clone(),
                tag: metadata.tag.clone(),
                key_id: None,
                algorithm: metadata.algorithm,
            },
            salt,
            iterations,
        };
        let plaintext = self.service.decrypt_bytes_with_password(&sealed, password)?;
        Ok(plaintext.and_then(|p| verified(p, metadata)))
    }
}

fn verified(plaintext: Vec<u8>, metadata: &EncryptedFileMetadata) -> Option<Vec<u8>> {
    if plaintext.len() as u64 != metadata.original_size || sha256_hex(&plaintext) != metadata.checksum
    {
        warn!("decrypted file does not match its recorded size/checksum");
        return None;
    }
    Some(plaintext)
}

/// Maps a caller-supplied name onto the key purpose alphabet.
pub(crate) fn sanitize_name(name: &str, what: &str) -> StorageResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(StorageError::Precondition(format!("{what} must not be empty")));
    }
    let sanitized: String = trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '.') {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    debug!(name, sanitized = %sanitized, "sanitized key purpose component");
    Ok(sanitized)
}

/// Collapses contract violations into "inaccessible"; infrastructure failures
/// still propagate.
pub(crate) fn inaccessible_on_contract_violation<T>(
    result: Result<Option<T>, VaultError>,
) -> StorageResult<Option<T>> {
    match result {
        Ok(value) => Ok(value),
        Err(e) if e.is_contract_violation() => {
            debug!("treating as inaccessible: {e}");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}
