//! Fire-and-forget alert dispatch.
//!
//! A connection hands each alert to an [`AlertSink`] and immediately goes
//! back to reading frames. The production sink, [`MailDispatcher`], spawns one
//! task per alert; nothing waits for or reports on its completion. Alerts
//! for the same camera may therefore be delivered out of order.

use std::sync::Arc;

use tracing::{error, info};

use crate::mailer::Mailer;
use crate::types::Alert;

/// Receives alerts from connection handlers.
///
/// Implementations must not block: `dispatch` is called from the read loop.
pub trait AlertSink: Send + Sync + 'static {
    /// Takes ownership of one alert.
    fn dispatch(&self, alert: Alert);
}

/// Result of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// No recipient configured; the alert was only logged.
    DryRun,
    /// The SMTP server accepted the message.
    Sent,
    /// Building or sending the message failed.
    Failed,
}

/// Delivers one alert, or logs it when there is no recipient.
pub async fn deliver(mailer: &Mailer, alert: Alert) -> DeliveryOutcome {
    if alert.is_dry_run() {
        info!(
            subject = %alert.subject,
            body = %alert.body,
            "No ALERT_RECIPIENT configured, would send email"
        );
        return DeliveryOutcome::DryRun;
    }

    if mailer.send(&alert).await {
        info!(subject = %alert.subject, "Alert email sent successfully");
        DeliveryOutcome::Sent
    } else {
        error!(subject = %alert.subject, "Alert email failed");
        DeliveryOutcome::Failed
    }
}

/// Spawns a delivery task per alert on the current tokio runtime.
#[derive(Debug, Clone)]
pub struct MailDispatcher {
    mailer: Arc<Mailer>,
}

impl MailDispatcher {
    /// Creates a dispatcher with the given mailer.
    pub fn new(mailer: Mailer) -> Self {
        Self {
            mailer: Arc::new(mailer),
        }
    }
}

impl AlertSink for MailDispatcher {
    fn dispatch(&self, alert: Alert) {
        let mailer = Arc::clone(&self.mailer);
        tokio::spawn(async move {
            deliver(&mailer, alert).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::{Security, TransportPlan};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    fn dry_run_alert() -> Alert {
        Alert {
            subject: "DVR ALERT: MOTION_DETECTED - cam1".to_string(),
            body: "Event: MOTION_DETECTED".to_string(),
            recipients: Vec::new(),
            attachment: None,
        }
    }

    #[tokio::test]
    async fn dry_run_never_connects() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let mailer = Mailer::with_plan(
            TransportPlan {
                host: "127.0.0.1".to_string(),
                port,
                security: Security::Plain,
                credentials: None,
            },
            "noreply@example.com",
        );

        let outcome = deliver(&mailer, dry_run_alert()).await;
        assert_eq!(outcome, DeliveryOutcome::DryRun);

        let accepted = timeout(Duration::from_millis(200), listener.accept()).await;
        assert!(accepted.is_err(), "dry-run must not open a connection");
    }

    #[tokio::test]
    async fn unreachable_server_reports_failure() {
        // Bind then drop to get a port with nothing listening.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let mailer = Mailer::with_plan(
            TransportPlan {
                host: "127.0.0.1".to_string(),
                port,
                security: Security::Plain,
                credentials: None,
            },
            "noreply@example.com",
        );
        let mut alert = dry_run_alert();
        alert.recipients = vec!["ops@example.com".to_string()];

        assert_eq!(deliver(&mailer, alert).await, DeliveryOutcome::Failed);
    }
}
