//! Event emitter for the DVR alert client.
//!
//! Builds an [`EventRecord`], optionally embedding an image as base64, and
//! writes it to the server as one line over a fresh TCP connection. Each
//! send opens its own connection and closes it after the write.
//!
//! # Example
//!
//! ```no_run
//! use dvr_alert_client::emitter::Emitter;
//!
//! #[tokio::main]
//! async fn main() {
//!     let emitter = Emitter::new("127.0.0.1", 5000, "MOTION_DETECTED", "cam1", None);
//!     emitter.emit_once().await.unwrap();
//! }
//! ```

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::prelude::*;
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{error, info, warn};

use crate::error::{EmitterError, Result};
use crate::types::EventRecord;

/// Default server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_PORT: u16 = 5000;

/// Timeout for connecting to the server and for writing the frame.
pub const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds an event stamped with the current UTC time.
///
/// If `image` is given but does not exist, a warning is logged and the
/// event is built without an image.
///
/// # Errors
///
/// Returns [`EmitterError::ImageRead`] if the image exists but cannot be read.
pub fn build_event(event: &str, camera: &str, image: Option<&Path>) -> Result<EventRecord> {
    let mut record = EventRecord {
        event: event.to_string(),
        camera: camera.to_string(),
        timestamp: Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string(),
        meta: None,
        image_filename: None,
        image_b64: None,
    };

    if let Some(path) = image {
        if path.exists() {
            let bytes = std::fs::read(path).map_err(|source| EmitterError::ImageRead {
                path: path.to_path_buf(),
                source,
            })?;
            record.image_filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned());
            record.image_b64 = Some(BASE64_STANDARD.encode(bytes));
        } else {
            warn!(path = %path.display(), "Image file not found, sending event without image");
        }
    }

    Ok(record)
}

/// Writes one event to the server as a single line.
///
/// # Errors
///
/// Returns [`EmitterError`] if the connection or write fails or times out.
pub async fn send_event(host: &str, port: u16, record: &EventRecord) -> Result<()> {
    let frame = record.to_frame()?;
    let target = format!("{host}:{port}");

    let mut stream = timeout(SOCKET_TIMEOUT, TcpStream::connect((host, port)))
        .await
        .map_err(|_| EmitterError::Timeout(SOCKET_TIMEOUT.as_secs(), target.clone()))??;

    timeout(SOCKET_TIMEOUT, async {
        stream.write_all(frame.as_bytes()).await?;
        stream.shutdown().await
    })
    .await
    .map_err(|_| EmitterError::Timeout(SOCKET_TIMEOUT.as_secs(), target))??;

    Ok(())
}

/// Repeatable event emission with fixed fields.
#[derive(Debug, Clone)]
pub struct Emitter {
    host: String,
    port: u16,
    event: String,
    camera: String,
    image: Option<PathBuf>,
}

impl Emitter {
    /// Creates an emitter for the given server and event fields.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        event: impl Into<String>,
        camera: impl Into<String>,
        image: Option<PathBuf>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            event: event.into(),
            camera: camera.into(),
            image,
        }
    }

    /// Builds a fresh event and sends it once.
    ///
    /// # Errors
    ///
    /// Returns [`EmitterError`] if the image cannot be read or the send fails.
    pub async fn emit_once(&self) -> Result<()> {
        let record = build_event(&self.event, &self.camera, self.image.as_deref())?;
        send_event(&self.host, self.port, &record).await?;
        info!(event = %self.event, camera = %self.camera, "Sent event");
        Ok(())
    }

    /// Sends an event every `interval` until `shutdown` resolves.
    ///
    /// Failed sends are logged and the loop keeps going. Returns the number
    /// of events sent successfully.
    pub async fn run_every<F>(&self, interval: Duration, shutdown: F) -> usize
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut sent = 0;

        loop {
            match self.emit_once().await {
                Ok(()) => sent += 1,
                Err(err) => error!(error = %err, "Failed to send event"),
            }

            tokio::select! {
                () = &mut shutdown => break,
                () = sleep(interval) => {}
            }
        }

        sent
    }
}
