//! Gateway Protocol - wire vocabulary for the chat gateway
//!
//! This crate has no I/O. It describes what travels over the gateway's
//! persistent WebSocket (`/ws`) and its small REST surface, and it owns the
//! heuristic that recognises streamed response chunks inside a `message`
//! event.
//!
//! # Example
//!
//! ```
//! use gateway_protocol::{EventBody, Payload, ServerEvent, classify};
//!
//! let event = ServerEvent::decode(r#"{"type":"message","session_id":"s-1","content":"{\"content\":\"Hel\"}"}"#).unwrap();
//! assert_eq!(event.session_id.as_deref(), Some("s-1"));
//!
//! if let EventBody::Message { content } = &event.body {
//!     assert_eq!(classify(content), Payload::Chunks("Hel".to_string()));
//! }
//! ```

mod chunk;
mod error;
mod event;
mod request;
pub mod rest;

pub use chunk::{Payload, classify};
pub use error::DecodeError;
pub use event::{EventBody, ServerEvent};
pub use request::{ChatPayload, ControlRequest};

/// Largest text frame the gateway accepts before closing the socket with a
/// `message_too_large` error.
pub const MAX_TEXT_FRAME_BYTES: usize = 32 * 1024;

/// Path of the WebSocket endpoint on the gateway.
pub const WS_PATH: &str = "/ws";
