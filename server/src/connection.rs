//! Per-connection read loop.
//!
//! A connection moves through `OPEN -> (DECODE -> DISPATCH)* -> CLOSED`.
//! Frames are read up to each `\n`. Blank and malformed frames are skipped;
//! only end-of-stream or an I/O error ends the loop. The socket is owned by
//! the loop and released when it returns, whatever the exit path.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{error, info, warn};

use crate::alert::build_alert;
use crate::config::Config;
use crate::decoder::decode_frame;
use crate::dispatch::AlertSink;
use crate::error::Result;

/// Counters for one finished connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    /// Events decoded and dispatched.
    pub dispatched: usize,
    /// Frames dropped as malformed.
    pub malformed: usize,
    /// Blank frames skipped.
    pub blank: usize,
}

/// Handles one accepted connection until the peer disconnects.
///
/// Errors are logged here and never propagate to the listener.
pub async fn handle_connection<R, S>(
    stream: R,
    peer: SocketAddr,
    config: Arc<Config>,
    sink: Arc<S>,
) -> ConnectionStats
where
    R: AsyncRead + Unpin,
    S: AlertSink + ?Sized,
{
    info!(peer = %peer, "Connected");

    let mut stats = ConnectionStats::default();
    if let Err(err) = read_frames(stream, peer, &config, sink.as_ref(), &mut stats).await {
        error!(peer = %peer, error = %err, "Error handling client");
    }

    info!(
        peer = %peer,
        dispatched = stats.dispatched,
        malformed = stats.malformed,
        blank = stats.blank,
        "Connection closed"
    );
    stats
}

async fn read_frames<R, S>(
    stream: R,
    peer: SocketAddr,
    config: &Config,
    sink: &S,
    stats: &mut ConnectionStats,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    S: AlertSink + ?Sized,
{
    let mut reader = BufReader::new(stream);
    let mut frame = Vec::new();

    loop {
        frame.clear();
        if reader.read_until(b'\n', &mut frame).await? == 0 {
            return Ok(());
        }

        let record = match decode_frame(&frame) {
            Ok(Some(record)) => record,
            Ok(None) => {
                stats.blank += 1;
                continue;
            }
            Err(err) => {
                stats.malformed += 1;
                warn!(peer = %peer, error = %err, "Invalid JSON from client");
                continue;
            }
        };

        info!(peer = %peer, event = %record.event, camera = %record.camera, "Received event");

        let alert = build_alert(&record, config).await;
        sink.dispatch(alert);
        stats.dispatched += 1;
    }
}
