//! Encryption of small JSON metadata maps sent to remote storage.

use crate::error::{StorageError, StorageResult};
use crate::file::{FileEncryptor, inaccessible_on_contract_violation};
use keyward_crypto::EncryptedPayload;
use serde_json::{Map, Value};
use tracing::debug;

impl FileEncryptor {
    /// Encrypts `metadata` under the provider's key and returns the payload's
    /// wire map.
    pub fn encrypt_metadata(
        &self,
        metadata: &Map<String, Value>,
        provider: &str,
    ) -> StorageResult<Map<String, Value>> {
        let key_id = self.create_cloud_provider_key(provider)?;
        let json = serde_json::to_string(metadata)?;
        let payload = self
            .service
            .encrypt_data(&json, &key_id)?
            .ok_or_else(|| StorageError::MissingKey(key_id.clone()))?;
        Ok(payload.to_wire_map()?)
    }

    /// Reverses [`Self::encrypt_metadata`].
    ///
    /// A wire map without a string `keyId` is a precondition violation.
    /// Inaccessible payloads, or plaintext that is not a JSON object, return
    /// `Ok(None)`.
    pub fn decrypt_metadata(
        &self,
        wire: &Map<String, Value>,
    ) -> StorageResult<Option<Map<String, Value>>> {
        match wire.get("keyId") {
            Some(Value::String(id)) if !id.is_empty() => {}
            _ => {
                return Err(StorageError::Precondition(
                    "encrypted metadata is missing keyId".into(),
                ));
            }
        }
        let payload = EncryptedPayload::from_wire_map(wire)?;
        let Some(json) = inaccessible_on_contract_violation(self.service.decrypt_data(&payload))?
        else {
            return Ok(None);
        };
        match serde_json::from_str::<Value>(&json) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(_) | Err(_) => {
                debug!("decrypted metadata is not a JSON object");
                Ok(None)
            }
        }
    }
}
