//! Serializable encrypted payloads and their JSON wire format.
//!
//! Wire fields: `data`, `iv`, `tag` (standard base64), `keyId`, `algorithm`.
//! The password variant adds `salt` (base64) and `iterations`.

use crate::cipher::{Algorithm, Sealed};
use crate::error::{CryptoError, CryptoResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ciphertext with everything needed to decrypt it under a stored key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPayload {
    #[serde(rename = "data", with = "b64")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "b64")]
    pub iv: Vec<u8>,
    #[serde(with = "b64")]
    pub tag: Vec<u8>,
    /// Id of the key that sealed this payload. Required for decryption.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    #[serde(default)]
    pub algorithm: Algorithm,
}

impl EncryptedPayload {
    pub fn from_sealed(sealed: Sealed, key_id: Option<String>) -> Self {
        Self {
            ciphertext: sealed.ciphertext,
            iv: sealed.iv.to_vec(),
            tag: sealed.tag.to_vec(),
            key_id,
            algorithm: Algorithm::Aes256Gcm,
        }
    }

    /// Returns the key id or a precondition error when it is absent or empty.
    pub fn require_key_id(&self) -> CryptoResult<&str> {
        match self.key_id.as_deref() {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(CryptoError::Precondition(
                "encrypted payload is missing keyId".into(),
            )),
        }
    }

    pub fn to_wire_map(&self) -> CryptoResult<Map<String, Value>> {
        to_map(self)
    }

    pub fn from_wire_map(map: &Map<String, Value>) -> CryptoResult<Self> {
        from_map(map)
    }

    /// Whether a JSON value has the shape of an encrypted payload.
    pub fn looks_like_payload(value: &Value) -> bool {
        value.as_object().is_some_and(|m| {
            m.contains_key("data") && m.contains_key("iv") && m.contains_key("tag")
        })
    }
}

/// Payload sealed under a password-derived key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordEncryptedPayload {
    #[serde(flatten)]
    pub payload: EncryptedPayload,
    #[serde(with = "b64")]
    pub salt: Vec<u8>,
    pub iterations: u32,
}

impl PasswordEncryptedPayload {
    pub fn to_wire_map(&self) -> CryptoResult<Map<String, Value>> {
        to_map(self)
    }

    pub fn from_wire_map(map: &Map<String, Value>) -> CryptoResult<Self> {
        from_map(map)
    }
}

fn to_map<T: Serialize>(value: &T) -> CryptoResult<Map<String, Value>> {
    match serde_json::to_value(value).map_err(|e| CryptoError::Encoding(e.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(CryptoError::Encoding(format!(
            "expected JSON object, got {other}"
        ))),
    }
}

fn from_map<T: for<'de> Deserialize<'de>>(map: &Map<String, Value>) -> CryptoResult<T> {
    serde_json::from_value(Value::Object(map.clone()))
        .map_err(|e| CryptoError::Precondition(format!("malformed payload: {e}")))
}

/// Standard-alphabet base64 for byte fields.
pub mod b64 {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
    }

    /// Same encoding for optional byte fields.
    pub mod option {
        use super::STANDARD;
        use base64::Engine;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            bytes: &Option<Vec<u8>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match bytes {
                Some(b) => serializer.serialize_some(&STANDARD.encode(b)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Vec<u8>>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|s| STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}
