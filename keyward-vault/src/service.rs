//! Stateless AEAD operations over keys held in a [`KeyStore`].
//!
//! Keyed operations follow one signalling rule: `Ok(None)` means the data is
//! inaccessible (unknown key id, or the AEAD tag did not verify). The two
//! cases are deliberately indistinguishable to the caller. `Err` is reserved
//! for contract violations and key store failures.

use crate::config::VaultConfig;
use crate::error::{VaultError, VaultResult};
use crate::key::{KEY_PREFIX, KeyInfo, KeyOrigin, StoredKey, store_key_for, validate_purpose};
use keyward_crypto::{
    CryptoError, CryptoResult, EncryptedPayload, KeyMaterial, PasswordEncryptedPayload,
    generate_random_key, open, rng_available, seal,
};
use keyward_keystore::KeyStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

const PROBE_KEY: &str = "keyward.probe";

/// Encryption primitives bound to a key store.
///
/// Cheap to share behind an `Arc`; every method takes `&self` and no lock is
/// held beyond a single key store call.
pub struct EncryptionService {
    store: Arc<dyn KeyStore>,
    config: VaultConfig,
    ready: AtomicBool,
}

impl EncryptionService {
    pub fn new(store: Arc<dyn KeyStore>) -> Self {
        Self::with_config(store, VaultConfig::default())
    }

    pub fn with_config(store: Arc<dyn KeyStore>, config: VaultConfig) -> Self {
        Self {
            store,
            config,
            ready: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub(crate) fn key_store(&self) -> &Arc<dyn KeyStore> {
        &self.store
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Probes the environment and marks the service ready for keyed operations.
    pub fn initialize(&self) -> VaultResult<()> {
        self.config.validate()?;
        if !self.is_encryption_available() {
            return Err(VaultError::Unavailable);
        }
        self.ready.store(true, Ordering::Release);
        info!("encryption service initialized");
        Ok(())
    }

    /// Marks the service closed. Keyed operations fail until re-initialized.
    pub fn dispose(&self) {
        if self.ready.swap(false, Ordering::AcqRel) {
            info!("encryption service disposed");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    fn ensure_ready(&self) -> VaultResult<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(VaultError::NotInitialized)
        }
    }

    /// Whether the key store is reachable and the OS RNG is usable.
    pub fn is_encryption_available(&self) -> bool {
        if !rng_available() {
            warn!("OS random source unavailable");
            return false;
        }
        match self.store.read(PROBE_KEY) {
            Ok(_) => true,
            Err(e) => {
                warn!("key store unavailable: {e}");
                false
            }
        }
    }

    // =========================================================================
    // Keys
    // =========================================================================

    /// Creates and persists a fresh 256-bit key for `purpose`.
    pub fn create_encryption_key(&self, purpose: &str) -> VaultResult<String> {
        self.ensure_ready()?;
        validate_purpose(purpose)?;
        let material = generate_random_key()?;
        self.install_key(purpose, &material, KeyOrigin::Created)
    }

    pub(crate) fn install_key(
        &self,
        purpose: &str,
        material: &KeyMaterial,
        origin: KeyOrigin,
    ) -> VaultResult<String> {
        let record = StoredKey::new(purpose, material, origin);
        self.store
            .write(&store_key_for(&record.id), &record.to_json()?)?;
        info!(key_id = %record.id, "created encryption key");
        Ok(record.id.clone())
    }

    pub(crate) fn load_key(&self, key_id: &str) -> VaultResult<Option<StoredKey>> {
        match self.store.read(&store_key_for(key_id))? {
            Some(json) => StoredKey::parse_live(key_id, &json),
            None => Ok(None),
        }
    }

    /// Ids of every stored key, sorted.
    pub fn list_encryption_keys(&self) -> VaultResult<Vec<String>> {
        self.ensure_ready()?;
        let mut ids: Vec<String> = self
            .store
            .read_prefix(KEY_PREFIX)?
            .into_iter()
            .filter_map(|(k, json)| {
                let id = k.strip_prefix(KEY_PREFIX)?;
                match StoredKey::parse_live(id, &json) {
                    Ok(None) => None,
                    _ => Some(id.to_string()),
                }
            })
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Metadata of every stored key. Unreadable records are skipped with a warning.
    pub fn list_key_info(&self) -> VaultResult<Vec<KeyInfo>> {
        self.ensure_ready()?;
        let mut infos: Vec<KeyInfo> = self
            .store
            .read_prefix(KEY_PREFIX)?
            .into_iter()
            .filter_map(|(k, json)| {
                let id = k.strip_prefix(KEY_PREFIX)?;
                match StoredKey::parse_live(id, &json) {
                    Ok(record) => record.map(|r| r.info()),
                    Err(e) => {
                        warn!("skipping unreadable key record: {e}");
                        None
                    }
                }
            })
            .collect();
        infos.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(infos)
    }

    pub fn key_info(&self, key_id: &str) -> VaultResult<Option<KeyInfo>> {
        self.ensure_ready()?;
        Ok(self.load_key(key_id)?.map(|k| k.info()))
    }

    /// Newest key created for `purpose`, if any.
    pub fn find_key_for_purpose(&self, purpose: &str) -> VaultResult<Option<String>> {
        Ok(self
            .list_key_info()?
            .into_iter()
            .filter(|info| info.purpose == purpose)
            .next_back()
            .map(|info| info.id))
    }

    /// Removes a key. Succeeds whether or not the key existed.
    pub fn delete_encryption_key(&self, key_id: &str) -> VaultResult<bool> {
        self.ensure_ready()?;
        self.store.delete(&store_key_for(key_id))?;
        info!(key_id, "deleted encryption key");
        Ok(true)
    }

    // =========================================================================
    // Keyed encryption
    // =========================================================================

    /// Encrypts a string. `Ok(None)` when `key_id` does not exist.
    pub fn encrypt_data(
        &self,
        plaintext: &str,
        key_id: &str,
    ) -> VaultResult<Option<EncryptedPayload>> {
        self.encrypt_bytes(plaintext.as_bytes(), key_id)
    }

    /// Encrypts bytes with a fresh random nonce. `Ok(None)` when `key_id` does not exist.
    pub fn encrypt_bytes(
        &self,
        plaintext: &[u8],
        key_id: &str,
    ) -> VaultResult<Option<EncryptedPayload>> {
        self.ensure_ready()?;
        let Some(record) = self.load_key(key_id)? else {
            debug!(key_id, "encrypt: key not found");
            return Ok(None);
        };
        let key = record.key_material()?;
        let sealed = seal(&key, plaintext)?;
        Ok(Some(EncryptedPayload::from_sealed(
            sealed,
            Some(key_id.to_string()),
        )))
    }

    /// Decrypts to a string.
    ///
    /// A payload without `keyId` is a contract violation and returns
    /// `Err(VaultError::Precondition)`. Unknown keys, failed tags and
    /// non-UTF-8 plaintext all return `Ok(None)`.
    pub fn decrypt_data(&self, payload: &EncryptedPayload) -> VaultResult<Option<String>> {
        Ok(self
            .decrypt_bytes(payload)?
            .and_then(|bytes| match String::from_utf8(bytes) {
                Ok(s) => Some(s),
                Err(_) => {
                    debug!("decrypt: plaintext is not UTF-8");
                    None
                }
            }))
    }

    /// Decrypts to bytes. See [`Self::decrypt_data`] for the failure contract.
    pub fn decrypt_bytes(&self, payload: &EncryptedPayload) -> VaultResult<Option<Vec<u8>>> {
        let key_id = payload.require_key_id()?;
        self.ensure_ready()?;
        let Some(record) = self.load_key(key_id)? else {
            debug!(key_id, "decrypt: key not found");
            return Ok(None);
        };
        let key = record.key_material()?;
        inaccessible_on_auth_failure(open(
            &key,
            &payload.ciphertext,
            &payload.iv,
            &payload.tag,
        ))
    }

    // =========================================================================
    // Password-based encryption
    // =========================================================================

    /// Encrypts a string under a key derived from `password`. Nothing is persisted.
    pub fn encrypt_with_password(
        &self,
        plaintext: &str,
        password: &str,
    ) -> VaultResult<PasswordEncryptedPayload> {
        self.encrypt_bytes_with_password(plaintext.as_bytes(), password)
    }

    pub fn encrypt_bytes_with_password(
        &self,
        plaintext: &[u8],
        password: &str,
    ) -> VaultResult<PasswordEncryptedPayload> {
        let params = self.config.kdf_params()?;
        Ok(keyward_crypto::encrypt_with_password(plaintext, password, &params)?)
    }

    /// Decrypts a password payload. A wrong password returns `Ok(None)`.
    pub fn decrypt_with_password(
        &self,
        payload: &PasswordEncryptedPayload,
        password: &str,
    ) -> VaultResult<Option<String>> {
        Ok(self
            .decrypt_bytes_with_password(payload, password)?
            .and_then(|bytes| String::from_utf8(bytes).ok()))
    }

    pub fn decrypt_bytes_with_password(
        &self,
        payload: &PasswordEncryptedPayload,
        password: &str,
    ) -> VaultResult<Option<Vec<u8>>> {
        inaccessible_on_auth_failure(keyward_crypto::decrypt_with_password(payload, password))
    }
}

/// Collapses authentication failures into `Ok(None)`; everything else propagates.
fn inaccessible_on_auth_failure(result: CryptoResult<Vec<u8>>) -> VaultResult<Option<Vec<u8>>> {
    match result {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.is_authentication_failure() => {
            debug!("decrypt: {e}");
            Ok(None)
        }
        Err(CryptoError::Precondition(msg)) => Err(VaultError::Precondition(msg)),
        Err(e) => Err(e.into()),
    }
}
