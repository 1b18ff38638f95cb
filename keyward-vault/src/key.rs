//! Stored key records.
//!
//! A key record is serialized as JSON under `enc_key.{id}` in the key store.
//! Raw material is held only inside [`StoredKey`], which zeroizes it on drop.

use crate::error::{VaultError, VaultResult};
use chrono::{DateTime, Utc};
use keyward_crypto::KeyMaterial;
use keyward_crypto::payload::b64;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroize;

/// Key store prefix for key records.
pub(crate) const KEY_PREFIX: &str = "enc_key.";

/// How a key came into existence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum KeyOrigin {
    Created,
    Rotated {
        from: String,
    },
    #[serde(rename_all = "camelCase")]
    Restored {
        backup_id: String,
    },
}

/// Key metadata without material.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyInfo {
    pub id: String,
    pub purpose: String,
    pub created_at: DateTime<Utc>,
    pub origin: KeyOrigin,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StoredKey {
    pub id: String,
    pub purpose: String,
    #[serde(with = "b64")]
    pub material: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub origin: KeyOrigin,
}

impl Drop for StoredKey {
    fn drop(&mut self) {
        self.material.zeroize();
    }
}

impl StoredKey {
    pub fn new(purpose: &str, material: &KeyMaterial, origin: KeyOrigin) -> Self {
        Self {
            id: key_id_for(purpose, &origin),
            purpose: purpose.to_string(),
            material: material.as_bytes().to_vec(),
            created_at: Utc::now(),
            origin,
        }
    }

    pub fn key_material(&self) -> VaultResult<KeyMaterial> {
        KeyMaterial::from_slice(&self.material)
            .map_err(|e| VaultError::Corrupt(format!("key {}: {e}", self.id)))
    }

    pub fn info(&self) -> KeyInfo {
        KeyInfo {
            id: self.id.clone(),
            purpose: self.purpose.clone(),
            created_at: self.created_at,
            origin: self.origin.clone(),
        }
    }

    pub fn to_json(&self) -> VaultResult<String> {
        serde_json::to_string(self).map_err(|e| VaultError::Corrupt(e.to_string()))
    }

    pub fn from_json(id: &str, json: &str) -> VaultResult<Self> {
        serde_json::from_str(json).map_err(|e| VaultError::Corrupt(format!("key {id}: {e}")))
    }

    /// Parses a key record, reading a tombstone as an absent key.
    pub fn parse_live(id: &str, json: &str) -> VaultResult<Option<Self>> {
        match Self::from_json(id, json) {
            Ok(record) => Ok(Some(record)),
            Err(e) => match serde_json::from_str::<KeyTombstone>(json) {
                Ok(tombstone) if tombstone.deleted => Ok(None),
                _ => Err(e),
            },
        }
    }
}

/// Written over a key record during secure deletion. Same size class as the
/// record it replaces, and never mistaken for a live key.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct KeyTombstone {
    pub id: String,
    pub deleted: bool,
    #[serde(with = "b64")]
    pub noise: Vec<u8>,
}

impl Drop for KeyTombstone {
    fn drop(&mut self) {
        self.noise.zeroize();
    }
}

impl KeyTombstone {
    pub fn new(id: &str, noise: Vec<u8>) -> Self {
        Self {
            id: id.to_string(),
            deleted: true,
            noise,
        }
    }

    pub fn to_json(&self) -> VaultResult<String> {
        serde_json::to_string(self).map_err(|e| VaultError::Corrupt(e.to_string()))
    }
}

pub(crate) fn store_key_for(key_id: &str) -> String {
    format!("{KEY_PREFIX}{key_id}")
}

/// Key ids embed the purpose and a v7 UUID, which encodes the creation
/// millisecond followed by random bits.
fn key_id_for(purpose: &str, origin: &KeyOrigin) -> String {
    let uuid = Uuid::now_v7();
    match origin {
        KeyOrigin::Created => format!("{purpose}_{uuid}"),
        KeyOrigin::Rotated { .. } => format!("{purpose}_rot_{uuid}"),
        KeyOrigin::Restored { .. } => format!("{purpose}_rst_{uuid}"),
    }
}

/// Purposes become part of key ids and store keys.
pub(crate) fn validate_purpose(purpose: &str) -> VaultResult<()> {
    if purpose.is_empty() {
        return Err(VaultError::Precondition("key purpose must not be empty".into()));
    }
    if let Some(bad) = purpose
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return Err(VaultError::Precondition(format!(
            "key purpose contains invalid character {bad:?}"
        )));
    }
    Ok(())
}
