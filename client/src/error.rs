//! Error types for the DVR alert client.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building or sending an event.
#[derive(Error, Debug)]
pub enum EmitterError {
    /// The image file exists but could not be read.
    #[error("failed to read image {path}: {source}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Connecting to or writing to the server failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The event could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server did not accept the connection or the write in time.
    #[error("timed out after {0} seconds talking to {1}")]
    Timeout(u64, String),
}

/// A specialized `Result` type for emitter operations.
pub type Result<T> = std::result::Result<T, EmitterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_display() {
        let err = EmitterError::Timeout(10, "127.0.0.1:5000".to_string());
        assert_eq!(
            err.to_string(),
            "timed out after 10 seconds talking to 127.0.0.1:5000"
        );
    }

    #[test]
    fn image_read_display() {
        let err = EmitterError::ImageRead {
            path: PathBuf::from("/tmp/snap.jpg"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "failed to read image /tmp/snap.jpg: denied");
    }
}
