//! Records as seen by the storage backend.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Current [`EncryptionState`] format version.
pub const ENCRYPTION_STATE_VERSION: u32 = 1;

/// Per-record marker listing the top-level fields that hold an encrypted payload.
///
/// Rows without a marker are legacy plaintext.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionState {
    pub version: u32,
    pub fields: Vec<String>,
}

impl Default for EncryptionState {
    fn default() -> Self {
        Self {
            version: ENCRYPTION_STATE_VERSION,
            fields: Vec::new(),
        }
    }
}

impl EncryptionState {
    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    pub(crate) fn mark(&mut self, field: &str) {
        if !self.contains(field) {
            self.fields.push(field.to_string());
            self.fields.sort();
        }
    }

    pub(crate) fn unmark(&mut self, field: &str) {
        self.fields.retain(|f| f != field);
    }
}

/// A typed JSON document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub record_type: String,
    pub data: Map<String, Value>,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
    pub modified_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption: Option<EncryptionState>,
}

impl Record {
    pub fn new(id: impl Into<String>, record_type: impl Into<String>, data: Map<String, Value>) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: id.into(),
            record_type: record_type.into(),
            data,
            created_at: now,
            modified_at: now,
            encryption: None,
        }
    }

    /// Builds a record from a `json!({...})` object. Non-object values yield empty data.
    pub fn from_json(id: impl Into<String>, record_type: impl Into<String>, data: Value) -> Self {
        let data = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(id, record_type, data)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.data.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }

    /// Whether `field` is currently stored as an encrypted payload.
    pub fn is_field_encrypted(&self, field: &str) -> bool {
        self.encryption.as_ref().is_some_and(|s| s.contains(field))
    }
}
