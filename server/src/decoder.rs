//! Wire frame decoder.
//!
//! Each frame is one line of UTF-8 JSON terminated by `\n`. A frame decodes
//! to an [`EventRecord`], to nothing (blank line), or to a [`DecodeError`].
//! Decode errors are never fatal: the caller logs them and reads the next
//! frame.
//!
//! # Example
//!
//! ```
//! use dvr_alert_server::decoder::decode_line;
//!
//! let line = r#"{"event":"MOTION_DETECTED","camera":"cam1","timestamp":"2024-01-01T00:00:00Z"}"#;
//! let record = decode_line(line).unwrap().unwrap();
//! assert_eq!(record.camera, "cam1");
//!
//! assert!(decode_line("   ").unwrap().is_none());
//! assert!(decode_line("{not json").is_err());
//! ```

use serde_json::Value;
use thiserror::Error;

use crate::types::EventRecord;

/// Errors that can occur while decoding a frame.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The frame is not valid UTF-8.
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The frame is not valid JSON, or `event`, `camera` or `timestamp` is
    /// not a string.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The frame is valid JSON but not an object.
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Decode one frame given as raw bytes (delimiter optional).
pub fn decode_frame(frame: &[u8]) -> Result<Option<EventRecord>, DecodeError> {
    let text = std::str::from_utf8(frame)?;
    decode_line(text)
}

/// Decode one line of text.
///
/// Surrounding whitespace, including the trailing `\n` or `\r\n`, is
/// ignored. Returns `Ok(None)` for a blank line.
pub fn decode_line(line: &str) -> Result<Option<EventRecord>, DecodeError> {
    let text = line.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(DecodeError::NotAnObject(kind_of(&value)));
    }

    let record = serde_json::from_value(value)?;
    Ok(Some(record))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DEFAULT_CAMERA, DEFAULT_EVENT};
    use serde_json::json;

    #[test]
    fn decodes_all_fields_exactly() {
        let line = json!({
            "event": "LINE_CROSSED",
            "camera": "gate-2",
            "timestamp": "2024-06-01T12:30:00Z",
            "meta": {"direction": "in", "count": 3},
            "image_filename": "gate.png",
            "image_b64": "aGVsbG8="
        })
        .to_string();

        let record = decode_line(&line).unwrap().unwrap();
        assert_eq!(record.event, "LINE_CROSSED");
        assert_eq!(record.camera, "gate-2");
        assert_eq!(record.timestamp, "2024-06-01T12:30:00Z");
        assert_eq!(record.meta, Some(json!({"direction": "in", "count": 3})));
        assert_eq!(record.image_filename, Some(json!("gate.png")));
        assert_eq!(record.image_b64, Some(json!("aGVsbG8=")));
    }

    #[test]
    fn defaults_only_for_absent_fields() {
        let record = decode_line(r#"{"camera":"porch"}"#).unwrap().unwrap();
        assert_eq!(record.event, DEFAULT_EVENT);
        assert_eq!(record.camera, "porch");
        assert!(!record.timestamp.is_empty());

        let record = decode_line(r#"{"event":"TAMPER"}"#).unwrap().unwrap();
        assert_eq!(record.event, "TAMPER");
        assert_eq!(record.camera, DEFAULT_CAMERA);
    }

    #[test]
    fn blank_lines_are_skipped() {
        assert!(decode_line("").unwrap().is_none());
        assert!(decode_line("\n").unwrap().is_none());
        assert!(decode_line(" \t\r\n").unwrap().is_none());
    }

    #[test]
    fn trailing_crlf_is_tolerated() {
        let record = decode_line("{\"event\":\"MOTION_DETECTED\"}\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(record.event, "MOTION_DETECTED");
    }

    #[test]
    fn invalid_json_is_an_error() {
        let err = decode_line("{\"event\": ").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidJson(_)));
    }

    #[test]
    fn non_object_json_is_malformed() {
        for (line, kind) in [
            ("42", "a number"),
            ("[1,2,3]", "an array"),
            ("\"MOTION\"", "a string"),
            ("null", "null"),
            ("true", "a boolean"),
        ] {
            match decode_line(line) {
                Err(DecodeError::NotAnObject(got)) => assert_eq!(got, kind),
                other => panic!("expected NotAnObject for {line}, got {other:?}"),
            }
        }
    }

    #[test]
    fn wrong_field_type_is_malformed() {
        let err = decode_line(r#"{"event": 5}"#).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidJson(_)));
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let record = decode_line(r#"{"event":"MOTION_DETECTED","firmware":"1.2"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(record.event, "MOTION_DETECTED");
    }

    #[test]
    fn invalid_utf8_frame_is_malformed() {
        let err = decode_frame(&[b'{', 0xff, 0xfe, b'}', b'\n']).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidUtf8(_)));
    }

    #[test]
    fn decode_frame_accepts_delimiter() {
        let record = decode_frame(b"{\"camera\":\"cam9\"}\n").unwrap().unwrap();
        assert_eq!(record.camera, "cam9");
    }
}
