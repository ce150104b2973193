//! SMTP mailer for alert emails.
//!
//! This module formats an [`Alert`] as an email and hands it to an SMTP
//! server. The transport is chosen from [`SmtpSettings`]:
//!
//! | Host + port set | TLS | Port | Transport |
//! |-----------------|-----|------|-----------|
//! | no  | -   | -        | plaintext to `localhost:1025` (debug server) |
//! | yes | on  | 587, 25  | plaintext, upgraded with STARTTLS |
//! | yes | on  | 465      | TLS from the first byte |
//! | yes | off, or other port | any | plaintext |
//!
//! Authentication is attempted only when both username and password are set.
//! Every socket operation is bounded by [`SMTP_TIMEOUT`].
//!
//! [`Mailer::send`] never returns an error: failures are logged and reported
//! as `false`.

use std::time::Duration;

use lettre::address::AddressError;
use lettre::message::header::{ContentType, ContentTypeErr};
use lettre::message::{Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{error, info};

use crate::config::SmtpSettings;
use crate::types::{Alert, Attachment};

/// Host of the local debug SMTP server used when no transport is configured.
pub const DEBUG_SMTP_HOST: &str = "localhost";

/// Port of the local debug SMTP server.
pub const DEBUG_SMTP_PORT: u16 = 1025;

/// Timeout applied to each SMTP socket operation.
pub const SMTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Sender address used when neither `SMTP_FROM` nor `SMTP_USER` is set.
pub const DEFAULT_FROM: &str = "noreply@example.com";

/// Errors that can occur while sending an alert email.
#[derive(Error, Debug)]
pub enum MailError {
    /// The alert has no recipients.
    #[error("alert has no recipients")]
    NoRecipients,

    /// A sender or recipient address could not be parsed.
    #[error("invalid email address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: AddressError,
    },

    /// The message could not be assembled.
    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    /// Connect, TLS negotiation, authentication or delivery failed.
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// How the connection to the SMTP server is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Security {
    /// No encryption.
    Plain,
    /// Plaintext connect, then upgrade via STARTTLS.
    StartTls,
    /// TLS handshake immediately after connect.
    ImplicitTls,
}

/// Resolved SMTP endpoint, security mode and credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct TransportPlan {
    pub host: String,
    pub port: u16,
    pub security: Security,
    pub credentials: Option<(String, String)>,
}

impl std::fmt::Debug for TransportPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportPlan")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("security", &self.security)
            .field("authenticated", &self.credentials.is_some())
            .finish()
    }
}

impl TransportPlan {
    /// Applies the transport selection policy to the configured settings.
    pub fn from_settings(settings: &SmtpSettings) -> Self {
        let credentials = settings
            .credentials()
            .map(|(user, pass)| (user.to_string(), pass.to_string()));

        let Some((host, port)) = settings.endpoint() else {
            return Self {
                host: DEBUG_SMTP_HOST.to_string(),
                port: DEBUG_SMTP_PORT,
                security: Security::Plain,
                credentials,
            };
        };

        let security = match (settings.use_tls, port) {
            (true, 587 | 25) => Security::StartTls,
            (true, 465) => Security::ImplicitTls,
            _ => Security::Plain,
        };

        Self {
            host: host.to_string(),
            port,
            security,
            credentials,
        }
    }

    /// Returns `true` if this plan targets the local debug server.
    pub fn is_debug_fallback(&self) -> bool {
        self.host == DEBUG_SMTP_HOST && self.port == DEBUG_SMTP_PORT
    }

    /// Builds a lettre transport for this plan.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::Transport`] if TLS parameters cannot be created
    /// for the host.
    pub fn build_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
        let tls = match self.security {
            Security::Plain => Tls::None,
            Security::StartTls => Tls::Required(TlsParameters::new(self.host.clone())?),
            Security::ImplicitTls => Tls::Wrapper(TlsParameters::new(self.host.clone())?),
        };

        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(self.host.as_str())
                .port(self.port)
                .tls(tls)
                .timeout(Some(SMTP_TIMEOUT));

        if let Some((user, pass)) = &self.credentials {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(builder.build())
    }
}

/// Sends alert emails over SMTP.
#[derive(Debug, Clone)]
pub struct Mailer {
    plan: TransportPlan,
    from: String,
}

impl Mailer {
    /// Creates a mailer from SMTP settings.
    pub fn new(settings: &SmtpSettings) -> Self {
        let from = settings
            .from
            .clone()
            .or_else(|| settings.username.clone())
            .unwrap_or_else(|| DEFAULT_FROM.to_string());

        Self::with_plan(TransportPlan::from_settings(settings), from)
    }

    /// Creates a mailer with an explicit transport plan.
    pub fn with_plan(plan: TransportPlan, from: impl Into<String>) -> Self {
        Self {
            plan,
            from: from.into(),
        }
    }

    /// The transport plan used for every send.
    pub fn plan(&self) -> &TransportPlan {
        &self.plan
    }

    /// The `From` address.
    pub fn from_address(&self) -> &str {
        &self.from
    }

    /// Sends one alert. Returns `true` once the server has accepted it.
    pub async fn send(&self, alert: &Alert) -> bool {
        match self.try_send(alert).await {
            Ok(()) => {
                info!(recipients = ?alert.recipients, "Email sent");
                true
            }
            Err(err) => {
                error!(
                    error = %err,
                    host = %self.plan.host,
                    port = self.plan.port,
                    "Failed to send email"
                );
                false
            }
        }
    }

    async fn try_send(&self, alert: &Alert) -> Result<(), MailError> {
        let message = self.build_message(alert)?;

        if self.plan.is_debug_fallback() {
            info!(
                host = DEBUG_SMTP_HOST,
                port = DEBUG_SMTP_PORT,
                "No SMTP config found, falling back to local debug SMTP server"
            );
        } else {
            info!(
                host = %self.plan.host,
                port = self.plan.port,
                security = ?self.plan.security,
                "Using configured SMTP server"
            );
        }

        let transport = self.plan.build_transport()?;
        transport.send(message).await?;
        Ok(())
    }

    /// Assembles the email for an alert.
    ///
    /// An attachment whose part cannot be built is logged and left out; the
    /// message is still produced.
    ///
    /// # Errors
    ///
    /// Returns [`MailError`] if there are no recipients, an address is
    /// invalid, or the message cannot be assembled.
    pub fn build_message(&self, alert: &Alert) -> Result<Message, MailError> {
        if alert.recipients.is_empty() {
            return Err(MailError::NoRecipients);
        }

        let mut builder = Message::builder()
            .from(parse_mailbox(&self.from)?)
            .subject(alert.subject.as_str())
            .date_now();

        for recipient in &alert.recipients {
            builder = builder.to(parse_mailbox(recipient)?);
        }

        let text = SinglePart::plain(alert.body.clone());

        let message = match alert.attachment.as_ref().map(attachment_part) {
            Some(Ok(part)) => {
                builder.multipart(MultiPart::mixed().singlepart(text).singlepart(part))?
            }
            Some(Err(err)) => {
                error!(error = %err, "Failed to attach file, sending without attachment");
                builder.singlepart(text)?
            }
            None => builder.singlepart(text)?,
        };

        Ok(message)
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, MailError> {
    address.parse().map_err(|source| MailError::Address {
        address: address.to_string(),
        source,
    })
}

/// Guesses the attachment MIME type from its extension.
pub fn guess_content_type(filename: &str) -> String {
    mime_guess::from_path(filename)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

fn attachment_part(attachment: &Attachment) -> Result<SinglePart, ContentTypeErr> {
    let content_type = ContentType::parse(&guess_content_type(&attachment.filename))?;
    Ok(lettre::message::Attachment::new(attachment.filename.clone())
        .body(attachment.bytes.clone(), content_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(host: Option<&str>, port: Option<u16>, use_tls: bool) -> SmtpSettings {
        SmtpSettings {
            host: host.map(str::to_string),
            port,
            use_tls,
            ..SmtpSettings::default()
        }
    }

    fn alert(attachment: Option<Attachment>) -> Alert {
        Alert {
            subject: "DVR ALERT: MOTION_DETECTED - cam1".to_string(),
            body: "Event: MOTION_DETECTED\nCamera: cam1\nTimestamp: t0".to_string(),
            recipients: vec!["ops@example.com".to_string()],
            attachment,
        }
    }

    #[test]
    fn unconfigured_falls_back_to_debug_server() {
        let plan = TransportPlan::from_settings(&settings(None, None, true));
        assert_eq!(plan.host, DEBUG_SMTP_HOST);
        assert_eq!(plan.port, DEBUG_SMTP_PORT);
        assert_eq!(plan.security, Security::Plain);
        assert!(plan.is_debug_fallback());

        let plan = TransportPlan::from_settings(&settings(Some("smtp.example.com"), None, true));
        assert!(plan.is_debug_fallback());
    }

    #[test]
    fn starttls_for_submission_ports() {
        for port in [587, 25] {
            let plan =
                TransportPlan::from_settings(&settings(Some("smtp.example.com"), Some(port), true));
            assert_eq!(plan.security, Security::StartTls, "port {port}");
            assert_eq!(plan.port, port);
        }
    }

    #[test]
    fn implicit_tls_for_port_465() {
        let plan =
            TransportPlan::from_settings(&settings(Some("smtp.example.com"), Some(465), true));
        assert_eq!(plan.security, Security::ImplicitTls);
        assert!(!plan.is_debug_fallback());
    }

    #[test]
    fn plain_when_tls_disabled_or_other_port() {
        for (port, tls) in [(465, false), (587, false), (2525, true), (1025, true)] {
            let plan = TransportPlan::from_settings(&settings(Some("mail.lan"), Some(port), tls));
            assert_eq!(plan.security, Security::Plain, "port {port} tls {tls}");
        }
    }

    #[test]
    fn credentials_only_when_both_set() {
        let mut s = settings(Some("smtp.example.com"), Some(587), true);
        s.username = Some("user".to_string());
        assert!(TransportPlan::from_settings(&s).credentials.is_none());

        s.password = Some("secret".to_string());
        let plan = TransportPlan::from_settings(&s);
        assert_eq!(
            plan.credentials,
            Some(("user".to_string(), "secret".to_string()))
        );
        assert!(!format!("{plan:?}").contains("secret"));
    }

    #[test]
    fn from_address_precedence() {
        let mut s = SmtpSettings::default();
        assert_eq!(Mailer::new(&s).from_address(), DEFAULT_FROM);

        s.username = Some("alerts@example.com".to_string());
        assert_eq!(Mailer::new(&s).from_address(), "alerts@example.com");

        s.from = Some("dvr@example.com".to_string());
        assert_eq!(Mailer::new(&s).from_address(), "dvr@example.com");
    }

    #[test]
    fn content_type_guessing() {
        assert_eq!(guess_content_type("snap.jpg"), "image/jpeg");
        assert_eq!(guess_content_type("snap.PNG"), "image/png");
        assert_eq!(guess_content_type("snap"), "application/octet-stream");
        assert_eq!(guess_content_type("snap.nope-ext"), "application/octet-stream");
    }

    #[test]
    fn message_without_attachment() {
        let mailer = Mailer::new(&SmtpSettings::default());
        let message = mailer.build_message(&alert(None)).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: DVR ALERT: MOTION_DETECTED - cam1"));
        assert!(raw.contains("To: ops@example.com"));
        assert!(raw.contains("From: noreply@example.com"));
        assert!(raw.contains("Date: "));
        assert!(raw.contains("Event: MOTION_DETECTED"));
        assert!(!raw.contains("multipart/mixed"));
    }

    #[test]
    fn message_with_attachment() {
        let mailer = Mailer::new(&SmtpSettings::default());
        let message = mailer
            .build_message(&alert(Some(Attachment {
                filename: "cam1.jpg".to_string(),
                bytes: vec![0xff, 0xd8, 0xff],
            })))
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("image/jpeg"));
        assert!(raw.contains("cam1.jpg"));
        assert!(raw.contains("Camera: cam1"));
    }

    #[test]
    fn message_requires_recipient() {
        let mailer = Mailer::new(&SmtpSettings::default());
        let mut no_rcpt = alert(None);
        no_rcpt.recipients.clear();
        assert!(matches!(
            mailer.build_message(&no_rcpt),
            Err(MailError::NoRecipients)
        ));
    }

    #[test]
    fn invalid_recipient_is_reported() {
        let mailer = Mailer::new(&SmtpSettings::default());
        let mut bad = alert(None);
        bad.recipients = vec!["not an address".to_string()];
        assert!(matches!(
            mailer.build_message(&bad),
            Err(MailError::Address { ref address, .. }) if address == "not an address"
        ));
    }
}
