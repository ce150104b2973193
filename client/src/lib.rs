//! DVR Alert Client - camera event emitter.
//!
//! This crate builds camera events and writes them to the DVR alert server
//! as newline-delimited JSON. The server sends no acknowledgment, so a
//! successful send only means the line was written to the socket.
//!
//! # Modules
//!
//! - [`types`]: The wire event record
//! - [`emitter`]: Event construction, image embedding and transmission
//! - [`error`]: Error types for emitter operations

pub mod emitter;
pub mod error;
pub mod types;

pub use emitter::{build_event, send_event, Emitter, DEFAULT_HOST, DEFAULT_PORT};
pub use error::{EmitterError, Result};
pub use types::EventRecord;
