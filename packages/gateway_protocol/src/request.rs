//! Client → server frames.

use serde::{Deserialize, Serialize};

/// Handshake frames. Exactly one is sent automatically when a socket opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlRequest {
    /// Ask for a fresh session.
    Init,
    /// Reattach to a session issued by an earlier connection.
    Resume { session_id: String },
}

impl ControlRequest {
    /// Pick the handshake for the session currently held, if any.
    pub fn handshake(session_id: Option<&str>) -> Self {
        match session_id {
            Some(id) => ControlRequest::Resume {
                session_id: id.to_string(),
            },
            None => ControlRequest::Init,
        }
    }
}

/// A user chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

impl ChatPayload {
    pub fn new(content: impl Into<String>, provider: Option<String>) -> Self {
        Self {
            content: content.into(),
            provider,
        }
    }
}
