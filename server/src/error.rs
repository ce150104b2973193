//! Error types for the DVR alert server.
//!
//! # Error Types
//!
//! - [`ServerError`] - Top-level errors for startup and connection handling
//! - [`crate::config::ConfigError`] - Environment parsing failures
//! - [`crate::decoder::DecodeError`] - Malformed frames (never fatal)
//! - [`crate::alert::ImageError`] - Image decode/persist failures (never fatal)
//! - [`crate::mailer::MailError`] - Mail build/transport failures (never fatal)
//!
//! Only [`ServerError::Bind`] and [`ServerError::Config`] stop the process.
//! Everything else is logged where it happens and contained to a single
//! event or a single connection.

use std::error::Error;
use std::fmt;
use std::io;
use std::net::SocketAddr;

use crate::config::ConfigError;

/// Top-level error type for the DVR alert server.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration error during startup.
    Config(ConfigError),

    /// The listening socket could not be created.
    Bind {
        /// Address the server tried to bind.
        addr: SocketAddr,
        /// Underlying I/O failure.
        source: io::Error,
    },

    /// I/O failure on an accepted connection.
    ///
    /// Terminates that connection's read loop only.
    Io(io::Error),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration error: {err}"),
            Self::Bind { addr, source } => write!(f, "failed to bind {addr}: {source}"),
            Self::Io(err) => write!(f, "connection I/O error: {err}"),
        }
    }
}

impl Error for ServerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Bind { source, .. } => Some(source),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<ConfigError> for ServerError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<io::Error> for ServerError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// A specialized `Result` type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_error_display_includes_address() {
        let err = ServerError::Bind {
            addr: "0.0.0.0:5000".parse().unwrap(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
        };
        assert_eq!(
            err.to_string(),
            "failed to bind 0.0.0.0:5000: address in use"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn io_error_converts() {
        let err: ServerError = io::Error::new(io::ErrorKind::ConnectionReset, "reset").into();
        assert!(matches!(err, ServerError::Io(_)));
        assert_eq!(err.to_string(), "connection I/O error: reset");
    }

    #[test]
    fn config_error_converts() {
        let err: ServerError = ConfigError::InvalidFormat {
            var: "DVR_PORT".to_string(),
            message: "contains invalid unicode".to_string(),
        }
        .into();
        assert!(matches!(err, ServerError::Config(_)));
        assert!(err.to_string().starts_with("configuration error:"));
    }
}
