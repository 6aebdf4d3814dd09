//! Folds streamed chunks into one growing assistant entry.

use gateway_protocol::{Payload, classify};

use crate::view::{ChatView, Entry, EntryId};

/// How a message payload was rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingested {
    /// Streamed text, appended to the current turn's entry.
    Chunk,
    /// A complete message shown as its own entry. Ends any stream in progress.
    Whole,
}

#[derive(Debug)]
struct StreamBuffer {
    accumulated: String,
    target: EntryId,
}

/// At most one streaming entry exists per turn. A turn starts when the user
/// submits a message or the chat is cleared.
#[derive(Debug, Default)]
pub struct StreamAggregator {
    buffer: Option<StreamBuffer>,
}

impl StreamAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_streaming(&self) -> bool {
        self.buffer.is_some()
    }

    pub fn buffered_text(&self) -> Option<&str> {
        self.buffer.as_ref().map(|b| b.accumulated.as_str())
    }

    pub fn ingest(&mut self, content: &str, view: &mut dyn ChatView) -> Ingested {
        match classify(content) {
            Payload::Chunks(text) => {
                match self.buffer.as_mut() {
                    Some(buf) => {
                        buf.accumulated.push_str(&text);
                        view.update_entry(buf.target, &buf.accumulated);
                    }
                    None => {
                        let target = view.push_entry(Entry::assistant(text.clone()));
                        self.buffer = Some(StreamBuffer {
                            accumulated: text,
                            target,
                        });
                    }
                }
                Ingested::Chunk
            }
            Payload::Whole(text) => {
                self.buffer = None;
                view.push_entry(Entry::assistant(text));
                Ingested::Whole
            }
        }
    }

    pub fn begin_turn(&mut self) {
        self.buffer = None;
    }
}
