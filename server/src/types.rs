//! Event and alert types for the DVR alert server.
//!
//! An [`EventRecord`] is what a camera-side emitter puts on the wire. An
//! [`Alert`] is the email derived from exactly one record. Neither outlives
//! a single pass through the server.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Event tag used when the sender omits `event`.
pub const DEFAULT_EVENT: &str = "UNKNOWN";

/// Camera identifier used when the sender omits `camera`.
pub const DEFAULT_CAMERA: &str = "camera";

/// One camera event as decoded from a wire frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Free-form alert type tag (e.g. `MOTION_DETECTED`).
    #[serde(default = "default_event")]
    pub event: String,

    /// Source camera identifier.
    #[serde(default = "default_camera")]
    pub camera: String,

    /// Sender-generated timestamp. Not validated.
    #[serde(default = "default_timestamp")]
    pub timestamp: String,

    /// Opaque metadata, re-serialized verbatim into the alert body.
    ///
    /// A present `null` is kept as `Some(Value::Null)`.
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub meta: Option<Value>,

    /// Suggested name for the attached image.
    ///
    /// Kept as raw JSON: a value of the wrong type only invalidates the
    /// image, never the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_filename: Option<Value>,

    /// Base64-encoded image bytes, kept as raw JSON like `image_filename`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_b64: Option<Value>,
}

fn default_event() -> String {
    DEFAULT_EVENT.to_string()
}

fn default_camera() -> String {
    DEFAULT_CAMERA.to_string()
}

/// Receive time in ISO-8601 without offset, used when the sender sent none.
fn default_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Distinguishes `"meta": null` from a missing `meta` key.
fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl EventRecord {
    /// Returns the raw image payload, treating `null` and `""` as absent.
    pub fn image_payload(&self) -> Option<&Value> {
        self.image_b64.as_ref().filter(|b64| !is_blank(b64))
    }

    /// Returns the raw image file name, treating `null` and `""` as absent.
    pub fn image_name(&self) -> Option<&Value> {
        self.image_filename.as_ref().filter(|name| !is_blank(name))
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// A file attached to an alert email.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name shown to the recipient; also drives MIME type guessing.
    pub filename: String,

    /// Raw attachment bytes.
    pub bytes: Vec<u8>,
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// An email alert derived from one event record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub subject: String,
    pub body: String,
    /// Zero or one recipient. Empty means dry-run.
    pub recipients: Vec<String>,
    pub attachment: Option<Attachment>,
}

impl Alert {
    /// Returns `true` when no recipient is configured.
    pub fn is_dry_run(&self) -> bool {
        self.recipients.is_empty()
    }
}
