//! TCP listener and accept loop.
//!
//! Every accepted connection is handed to
//! [`handle_connection`](crate::connection::handle_connection) in its own
//! task; the accept loop never waits for a handler. There is no cap on
//! concurrent connections or in-flight alerts.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpSocket};
use tracing::{info, warn};

use crate::config::Config;
use crate::connection::handle_connection;
use crate::dispatch::AlertSink;
use crate::error::{Result, ServerError};

/// Pending-connection backlog for the listening socket.
pub const LISTEN_BACKLOG: u32 = 5;

/// Pause after a failed `accept` (e.g. file descriptor exhaustion).
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Binds the listening socket with [`LISTEN_BACKLOG`].
///
/// # Errors
///
/// Returns [`ServerError::Bind`], which is fatal at startup.
pub fn bind(addr: SocketAddr) -> Result<TcpListener> {
    let to_bind_error = |source| ServerError::Bind { addr, source };

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(to_bind_error)?;

    socket.set_reuseaddr(true).map_err(to_bind_error)?;
    socket.bind(addr).map_err(to_bind_error)?;
    socket.listen(LISTEN_BACKLOG).map_err(to_bind_error)
}

/// Accepts connections forever, spawning one handler task per connection.
///
/// Only returns if the runtime shuts the task down.
pub async fn serve<S>(listener: TcpListener, config: Arc<Config>, sink: Arc<S>)
where
    S: AlertSink,
{
    if let Ok(addr) = listener.local_addr() {
        info!(address = %addr, "Listening for connections");
    }

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let config = Arc::clone(&config);
                let sink = Arc::clone(&sink);
                tokio::spawn(async move {
                    handle_connection(stream, peer, config, sink).await;
                });
            }
            Err(err) => {
                warn!(error = %err, "Failed to accept connection");
                tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
            }
        }
    }
}
