//! DVR Alert Client - camera event emitter.
//!
//! Sends one event (or one every `--loop` seconds) to the DVR alert server.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dvr_alert_client::emitter::{Emitter, DEFAULT_HOST, DEFAULT_PORT};

/// DVR event client.
///
/// Emits a camera event to the DVR alert server as one line of JSON,
/// optionally with an embedded image.
#[derive(Parser, Debug)]
#[command(name = "dvr-alert-client")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "\
EXAMPLES:
    # Send a single motion event
    dvr-alert-client --camera porch

    # Attach a snapshot
    dvr-alert-client --event PERSON_DETECTED --image ./snapshot.jpg

    # Send every 5 seconds until Ctrl+C
    dvr-alert-client --loop 5
")]
struct Cli {
    /// Server host.
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Server port.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Event type tag.
    #[arg(long, default_value = "MOTION_DETECTED")]
    event: String,

    /// Camera identifier.
    #[arg(long, default_value = "cam1")]
    camera: String,

    /// Optional image file to include.
    #[arg(long)]
    image: Option<PathBuf>,

    /// Send events repeatedly every N seconds (0 = one shot).
    #[arg(long = "loop", value_name = "SECONDS", default_value_t = 0.0)]
    loop_secs: f64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let emitter = Emitter::new(&cli.host, cli.port, &cli.event, &cli.camera, cli.image);

    if cli.loop_secs > 0.0 {
        let Ok(interval) = Duration::try_from_secs_f64(cli.loop_secs) else {
            bail!("invalid --loop interval: {}", cli.loop_secs);
        };

        info!(
            interval_secs = cli.loop_secs,
            "Sending events repeatedly. Press Ctrl+C to stop."
        );
        let sent = emitter.run_every(interval, wait_for_shutdown()).await;
        info!(sent, "Stopped");
        return Ok(());
    }

    emitter
        .emit_once()
        .await
        .with_context(|| format!("Failed to send event to {}:{}", cli.host, cli.port))
}

/// Initialize logging to stderr, filtered by `RUST_LOG` (default `info`).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
