//! Server → client events.
//!
//! The gateway discriminates frames by a `type` field. Known types decode into
//! dedicated variants; anything else is kept verbatim in [`EventBody::Unknown`]
//! so newer gateways keep working against older clients.

use serde_json::{Map, Value};

use crate::error::DecodeError;

/// A decoded frame from the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerEvent {
    /// Any event may carry the session the gateway associates with this socket.
    pub session_id: Option<String>,
    pub body: EventBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventBody {
    /// Welcome sent right after the socket opens.
    Connected { note: Option<String> },
    /// Reply to a `resume` request.
    Resumed { history_length: Option<u64> },
    /// Assistant output. May itself contain newline-delimited JSON chunks.
    Message { content: String },
    /// Protocol-level error. Does not close the socket by itself.
    Error {
        code: Option<String>,
        message: Option<String>,
    },
    /// Unrecognised or untyped frame, kept whole.
    Unknown { kind: Option<String>, raw: Value },
}

impl ServerEvent {
    /// Decode a text frame.
    ///
    /// Only non-JSON text and JSON that is not an object are errors. Field
    /// extraction is lenient: a mistyped optional field reads as absent.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(obj) = value else {
            return Err(DecodeError::NotAnObject);
        };

        let session_id = str_field(&obj, "session_id").filter(|s| !s.is_empty());
        let kind = str_field(&obj, "type");

        let body = match kind.as_deref() {
            Some("connected") => EventBody::Connected {
                note: str_field(&obj, "note"),
            },
            Some("resumed") => EventBody::Resumed {
                history_length: obj.get("history_length").and_then(Value::as_u64),
            },
            Some("message") => EventBody::Message {
                content: match obj.get("content") {
                    Some(Value::String(s)) => s.clone(),
                    Some(Value::Null) | None => String::new(),
                    Some(other) => other.to_string(),
                },
            },
            Some("error") => EventBody::Error {
                code: str_field(&obj, "code"),
                message: str_field(&obj, "message"),
            },
            _ => EventBody::Unknown {
                kind: kind.clone(),
                raw: Value::Object(obj),
            },
        };

        Ok(Self { session_id, body })
    }

    /// The wire `type` tag this event was decoded from, if any.
    pub fn kind(&self) -> Option<&str> {
        match &self.body {
            EventBody::Connected { .. } => Some("connected"),
            EventBody::Resumed { .. } => Some("resumed"),
            EventBody::Message { .. } => Some("message"),
            EventBody::Error { .. } => Some("error"),
            EventBody::Unknown { kind, .. } => kind.as_deref(),
        }
    }
}

fn str_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}
