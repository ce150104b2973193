//! Server configuration module.
//!
//! Parses configuration from environment variables once at startup. The
//! resulting [`Config`] is immutable and shared with every connection task.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `ALERT_RECIPIENT` | No | - | Alert recipient; unset means dry-run (log only) |
//! | `SMTP_HOST` | No | - | SMTP server host |
//! | `SMTP_PORT` | No | - | SMTP server port (`0` counts as unset) |
//! | `SMTP_USER` | No | - | SMTP username |
//! | `SMTP_PASS` | No | - | SMTP password |
//! | `SMTP_USE_TLS` | No | true | `1`, `true` or `yes` enable TLS |
//! | `SMTP_FROM` | No | `SMTP_USER` | Sender address |
//! | `DVR_PORT` | No | 5000 | TCP port the listener binds |
//! | `DVR_SCRATCH_DIR` | No | OS temp dir | Where decoded images are written |
//!
//! When `SMTP_HOST` or `SMTP_PORT` is missing, mail goes to a local debug
//! SMTP server at `localhost:1025`.

use std::env;
use std::path::PathBuf;

use thiserror::Error;

/// Default TCP port for the event listener.
pub const DEFAULT_PORT: u16 = 5000;

/// Errors that can occur when parsing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable has invalid format.
    #[error("invalid format for {var}: {message}")]
    InvalidFormat { var: String, message: String },

    /// Port number is invalid.
    #[error("invalid port number for {var}: {source}")]
    InvalidPort {
        var: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// SMTP transport settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmtpSettings {
    /// SMTP server host.
    pub host: Option<String>,

    /// SMTP server port.
    pub port: Option<u16>,

    /// Username for SMTP AUTH.
    pub username: Option<String>,

    /// Password for SMTP AUTH.
    pub password: Option<String>,

    /// Whether TLS (STARTTLS or implicit, depending on port) is requested.
    pub use_tls: bool,

    /// Explicit sender address.
    pub from: Option<String>,
}

impl SmtpSettings {
    /// Returns the configured host and port, if both are present.
    pub fn endpoint(&self) -> Option<(&str, u16)> {
        match (self.host.as_deref(), self.port) {
            (Some(host), Some(port)) => Some((host, port)),
            _ => None,
        }
    }

    /// Returns username and password when both are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        }
    }
}

/// Server configuration parsed from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port for the event listener.
    pub port: u16,

    /// Single alert recipient. `None` puts dispatch in dry-run mode.
    pub alert_recipient: Option<String>,

    /// Directory decoded images are written to.
    pub scratch_dir: PathBuf,

    /// Mail transport settings.
    pub smtp: SmtpSettings,
}

impl Config {
    /// Parse configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `DVR_PORT` or `SMTP_PORT` is not a valid u16.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use dvr_alert_server::config::Config;
    ///
    /// let config = Config::from_env().expect("Failed to load config");
    /// println!("Server will listen on port {}", config.port);
    /// ```
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = parse_port("DVR_PORT")?.unwrap_or(DEFAULT_PORT);
        let alert_recipient = non_empty_env("ALERT_RECIPIENT");
        let scratch_dir = non_empty_env("DVR_SCRATCH_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(env::temp_dir);

        let smtp = SmtpSettings {
            host: non_empty_env("SMTP_HOST"),
            port: parse_port("SMTP_PORT")?.filter(|port| *port != 0),
            username: verbatim_env("SMTP_USER"),
            password: verbatim_env("SMTP_PASS"),
            use_tls: parse_tls_flag("SMTP_USE_TLS"),
            from: non_empty_env("SMTP_FROM"),
        };

        Ok(Self {
            port,
            alert_recipient,
            scratch_dir,
            smtp,
        })
    }

    /// Recipient list for an alert: zero or one address.
    pub fn recipients(&self) -> Vec<String> {
        self.alert_recipient.iter().cloned().collect()
    }
}

/// Read an environment variable, treating empty or whitespace-only values as unset.
fn non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read an environment variable exactly as set. Only an empty value is unset.
fn verbatim_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

/// Parse the TLS flag.
///
/// Unset means enabled. Otherwise `1`, `true` and `yes` (case-insensitive)
/// enable TLS and anything else disables it.
fn parse_tls_flag(name: &str) -> bool {
    match env::var(name) {
        Ok(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => true,
    }
}

/// Parse a port environment variable. Unset or empty yields `None`.
fn parse_port(name: &str) -> Result<Option<u16>, ConfigError> {
    match env::var(name) {
        Ok(port_str) if port_str.trim().is_empty() => Ok(None),
        Ok(port_str) => port_str
            .trim()
            .parse()
            .map(Some)
            .map_err(|source| ConfigError::InvalidPort {
                var: name.to_string(),
                source,
            }),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidFormat {
            var: name.to_string(),
            message: "contains invalid unicode".to_string(),
        }),
    }
}
