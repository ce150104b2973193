//! Wire event record sent to the DVR alert server.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One camera event, serialized as a single JSON line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event: String,
    pub camera: String,
    /// UTC time in ISO-8601 with a `Z` suffix.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_b64: Option<String>,
}

impl EventRecord {
    /// Serializes the record as one wire frame, including the trailing `\n`.
    ///
    /// # Errors
    ///
    /// Returns an error if `meta` cannot be serialized.
    pub fn to_frame(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}
