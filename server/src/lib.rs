//! DVR Alert Server - camera event listener and email relay.
//!
//! This crate provides the server component of the DVR alert relay,
//! responsible for:
//! - Accepting TCP connections from camera-side emitters
//! - Decoding newline-delimited JSON event records
//! - Building alert emails and delivering them over SMTP
//!
//! # Architecture
//!
//! Each accepted connection runs in its own task. Every decoded event is
//! turned into an [`types::Alert`] and handed to an [`dispatch::AlertSink`],
//! which delivers it in a separate task without blocking the read loop.
//! Nothing is persisted except decoded images written to the scratch
//! directory.

pub mod alert;
pub mod config;
pub mod connection;
pub mod decoder;
pub mod dispatch;
pub mod error;
pub mod listener;
pub mod mailer;
pub mod types;

pub use config::{Config, SmtpSettings};
pub use dispatch::{AlertSink, DeliveryOutcome, MailDispatcher};
pub use error::{Result, ServerError};
pub use types::{Alert, Attachment, EventRecord};
