//! Alert construction.
//!
//! Turns a decoded [`EventRecord`] into an [`Alert`]: subject line, body
//! text, recipients, and the optional image attachment. A decoded image is
//! also written to the scratch directory so it can be inspected on the
//! server host.
//!
//! # Body Format
//!
//! ```text
//! Event: MOTION_DETECTED
//! Camera: cam1
//! Timestamp: 2024-01-01T00:00:00Z
//! Meta: {"zone":"driveway"}        (only when meta is present)
//! Image attached: cam1.jpg         (only when the image was saved)
//! ```
//!
//! Two events resolving to the same image file name overwrite each other in
//! the scratch directory; the last write wins.

use std::io;
use std::path::{Path, PathBuf};

use base64::prelude::*;
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

use crate::config::Config;
use crate::types::{Alert, Attachment, EventRecord};

/// Errors that can occur while handling an embedded image.
#[derive(Error, Debug)]
pub enum ImageError {
    /// An image field holds a JSON value that is not a string.
    #[error("{field} must be a string, got {value}")]
    NotAString { field: &'static str, value: Value },

    /// The payload is not valid base64.
    #[error("invalid base64 image payload: {0}")]
    Decode(#[from] base64::DecodeError),

    /// The decoded bytes could not be written to the scratch directory.
    #[error("failed to write image to {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// An image that was decoded and written to disk.
#[derive(Debug, Clone)]
pub struct SavedImage {
    /// Where the bytes were written.
    pub path: PathBuf,

    /// Name and bytes for the email attachment.
    pub attachment: Attachment,
}

/// Builds the subject line: `DVR ALERT: <event> - <camera>`.
pub fn format_subject(record: &EventRecord) -> String {
    format!("DVR ALERT: {} - {}", record.event, record.camera)
}

/// Builds the alert body.
///
/// `attached` is the file name of a successfully saved image, if any.
pub fn format_body(record: &EventRecord, attached: Option<&str>) -> String {
    let mut lines = vec![
        format!("Event: {}", record.event),
        format!("Camera: {}", record.camera),
        format!("Timestamp: {}", record.timestamp),
    ];

    if let Some(meta) = &record.meta {
        lines.push(format!("Meta: {meta}"));
    }

    if let Some(name) = attached {
        lines.push(format!("Image attached: {name}"));
    }

    lines.join("\n")
}

/// Resolves the scratch file name for a record's image.
///
/// Uses the basename of `image_filename` so a sender cannot write outside
/// the scratch directory. Falls back to `<camera>_<timestamp>.jpg`.
///
/// # Errors
///
/// Returns [`ImageError::NotAString`] if `image_filename` is not a string.
pub fn image_file_name(record: &EventRecord) -> Result<String, ImageError> {
    let requested = record
        .image_name()
        .map(|name| as_text("image_filename", name))
        .transpose()?;

    Ok(requested
        .and_then(|name| Path::new(name).file_name())
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!("{}_{}.jpg", record.camera, record.timestamp).replace(['/', '\\'], "_")
        }))
}

fn as_text<'a>(field: &'static str, value: &'a Value) -> Result<&'a str, ImageError> {
    value.as_str().ok_or_else(|| ImageError::NotAString {
        field,
        value: value.clone(),
    })
}

/// Decodes base64, skipping ASCII whitespace such as MIME line breaks.
fn decode_payload(payload: &str) -> Result<Vec<u8>, ImageError> {
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    Ok(BASE64_STANDARD.decode(compact)?)
}

/// Decodes the record's image and writes it under `scratch_dir`.
///
/// Returns `Ok(None)` when the record carries no image.
///
/// # Errors
///
/// Returns [`ImageError`] if an image field is not a string, the payload is
/// not valid base64, or the file cannot be written. None of these is fatal
/// to the event.
pub async fn save_image(
    record: &EventRecord,
    scratch_dir: &Path,
) -> Result<Option<SavedImage>, ImageError> {
    let Some(payload) = record.image_payload() else {
        return Ok(None);
    };

    let bytes = decode_payload(as_text("image_b64", payload)?)?;
    let filename = image_file_name(record)?;
    let path = scratch_dir.join(&filename);

    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|source| ImageError::Persist {
            path: path.clone(),
            source,
        })?;

    Ok(Some(SavedImage {
        path,
        attachment: Attachment { filename, bytes },
    }))
}

/// Builds the alert for one decoded record.
///
/// Image failures are logged and only suppress the attachment.
pub async fn build_alert(record: &EventRecord, config: &Config) -> Alert {
    let attachment = match save_image(record, &config.scratch_dir).await {
        Ok(Some(saved)) => {
            info!(
                camera = %record.camera,
                path = %saved.path.display(),
                size = saved.attachment.bytes.len(),
                "Saved image"
            );
            Some(saved.attachment)
        }
        Ok(None) => None,
        Err(err) => {
            error!(
                camera = %record.camera,
                error = %err,
                "Failed to decode/save image, sending alert without attachment"
            );
            None
        }
    };

    let body = format_body(record, attachment.as_ref().map(|a| a.filename.as_str()));

    Alert {
        subject: format_subject(record),
        body,
        recipients: config.recipients(),
        attachment,
    }
}
