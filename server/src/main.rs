//! DVR Alert Server - Main entry point.
//!
//! Starts the event listener with:
//! - Structured JSON logging
//! - Configuration from environment variables
//! - Shutdown on SIGTERM/SIGINT
//!
//! # Configuration
//!
//! See [`dvr_alert_server::config`] for environment variable configuration.
//!
//! # Example
//!
//! ```bash
//! # Dry-run mode: alerts are only logged
//! cargo run --bin dvr-alert-server
//!
//! # Deliver through a STARTTLS submission server
//! ALERT_RECIPIENT="ops@example.com" \
//! SMTP_HOST="smtp.example.com" SMTP_PORT=587 \
//! SMTP_USER="alerts@example.com" SMTP_PASS="app-password" \
//! cargo run --release --bin dvr-alert-server
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::process::ExitCode;
use std::sync::Arc;

use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use dvr_alert_server::config::Config;
use dvr_alert_server::dispatch::MailDispatcher;
use dvr_alert_server::listener::{bind, serve};
use dvr_alert_server::mailer::Mailer;

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "Failed to load configuration");
            eprintln!("Error: {err}");
            eprintln!();
            eprintln!("Optional environment variables:");
            eprintln!("  ALERT_RECIPIENT  - Alert email recipient (unset: log only)");
            eprintln!("  SMTP_HOST        - SMTP server host");
            eprintln!("  SMTP_PORT        - SMTP server port (587/25 STARTTLS, 465 TLS)");
            eprintln!("  SMTP_USER        - SMTP username");
            eprintln!("  SMTP_PASS        - SMTP password");
            eprintln!("  SMTP_USE_TLS     - 1/true/yes to enable TLS (default: true)");
            eprintln!("  SMTP_FROM        - Sender address (default: SMTP_USER)");
            eprintln!("  DVR_PORT         - Listening port (default: 5000)");
            eprintln!("  DVR_SCRATCH_DIR  - Directory for received images (default: temp dir)");
            eprintln!("  RUST_LOG         - Log level filter (default: info)");
            return ExitCode::from(1);
        }
    };

    let mailer = Mailer::new(&config.smtp);
    let plan = mailer.plan();
    info!(
        port = config.port,
        dry_run = config.alert_recipient.is_none(),
        smtp_host = %plan.host,
        smtp_port = plan.port,
        smtp_security = ?plan.security,
        scratch_dir = %config.scratch_dir.display(),
        "Starting DVR alert server"
    );

    let bind_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
    let listener = match bind(bind_addr) {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, address = %bind_addr, "Failed to bind to address");
            return ExitCode::from(1);
        }
    };

    let sink = Arc::new(MailDispatcher::new(mailer));
    let config = Arc::new(config);

    tokio::select! {
        () = serve(listener, config, sink) => {}
        () = shutdown_signal() => {}
    }

    info!("Server shutdown complete");
    ExitCode::SUCCESS
}

/// Initialize structured logging with tracing.
///
/// JSON output, filtered by `RUST_LOG` (default `info`).
fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_level(true)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .init();
}

/// Resolves when SIGINT (Ctrl+C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down");
        }
    }
}
