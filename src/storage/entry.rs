use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One line of a JSONL database: `{"k":..,"v":..}` sets a key, a line
/// without `v` deletes it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JsonlEntry {
    #[serde(rename = "k")]
    pub key: String,
    #[serde(
        rename = "v",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<Value>,
}

// Keeps `"v": null` (a stored null) distinct from a missing `v` (a delete).
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl JsonlEntry {
    pub fn set(key: impl Into<String>, value: Value) -> Self {
        JsonlEntry {
            key: key.into(),
            value: Some(value),
        }
    }

    pub fn delete(key: impl Into<String>) -> Self {
        JsonlEntry {
            key: key.into(),
            value: None,
        }
    }

    pub fn is_delete(&self) -> bool {
        self.value.is_none()
    }
}
