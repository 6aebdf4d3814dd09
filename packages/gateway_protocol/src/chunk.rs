//! Streaming chunk detection.
//!
//! The gateway does not declare a framing format for streamed output. A
//! `message` whose content is newline-delimited JSON objects, each carrying a
//! `content` field, is a batch of stream chunks; everything else is a whole
//! message. This is a sniffing heuristic and is kept deliberately loose: any
//! line shaped like `{...}` with a `content` key counts.

use serde_json::Value;

/// Result of classifying the content of one `message` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// At least one line decoded as a chunk. Holds the concatenated chunk text.
    Chunks(String),
    /// No chunk lines. Holds the raw content, untouched.
    Whole(String),
}

impl Payload {
    pub fn is_chunk(&self) -> bool {
        matches!(self, Payload::Chunks(_))
    }

    pub fn text(&self) -> &str {
        match self {
            Payload::Chunks(s) | Payload::Whole(s) => s,
        }
    }
}

/// Classify the raw content of a `message` event.
///
/// Lines that are not `{...}` shaped, fail to decode, or lack `content` are
/// dropped silently. They only matter when no line qualifies, in which case
/// the whole raw text becomes a single complete message.
pub fn classify(raw: &str) -> Payload {
    let mut accumulated = String::new();
    let mut chunks = 0usize;

    for line in raw.split('\n') {
        let line = line.trim();
        if line.is_empty() || !line.starts_with('{') || !line.ends_with('}') {
            continue;
        }
        let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        let Some(content) = obj.get("content") else {
            continue;
        };
        match content {
            Value::String(s) => accumulated.push_str(s),
            Value::Null => {}
            other => accumulated.push_str(&other.to_string()),
        }
        chunks += 1;
    }

    if chunks == 0 {
        Payload::Whole(raw.to_string())
    } else {
        Payload::Chunks(accumulated)
    }
}
