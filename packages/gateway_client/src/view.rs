//! Display boundary.
//!
//! The core never renders anything itself. It pushes entries into a
//! [`ChatView`], grows streamed entries in place, and reports connection and
//! busy-indicator changes through the optional hooks.

use crate::connection::ConnectionState;
use crate::thinking::ThinkingState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
    /// Connection notes and diagnostics.
    System,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub role: Role,
    pub text: String,
}

impl Entry {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Role::Error, text)
    }
}

/// Handle to a displayed entry, valid until the view is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(pub usize);

pub trait ChatView {
    fn push_entry(&mut self, entry: Entry) -> EntryId;

    /// Replace the text of an entry that is already displayed.
    fn update_entry(&mut self, id: EntryId, text: &str);

    fn clear(&mut self);

    fn connection_state_changed(&mut self, _state: ConnectionState) {}

    fn thinking_changed(&mut self, _state: ThinkingState) {}

    /// The ambient status display should be refreshed from the gateway.
    fn status_refresh_requested(&mut self) {}
}

/// Connection states a [`Transcript`] remembers.
pub const STATE_HISTORY: usize = 8;

/// In-memory transcript. Records every hook call so it can back both the
/// terminal renderer and tests.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
    /// Most recent connection states, at most [`STATE_HISTORY`].
    connection_states: Vec<ConnectionState>,
    thinking: ThinkingState,
    status_refreshes: usize,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.entries.get(id.0)
    }

    pub fn last(&self) -> Option<&Entry> {
        self.entries.last()
    }

    /// Recent connection states, oldest first.
    pub fn connection_states(&self) -> &[ConnectionState] {
        &self.connection_states
    }

    pub fn connection_state(&self) -> Option<ConnectionState> {
        self.connection_states.last().copied()
    }

    pub fn thinking(&self) -> ThinkingState {
        self.thinking
    }

    pub fn status_refreshes(&self) -> usize {
        self.status_refreshes
    }
}

impl ChatView for Transcript {
    fn push_entry(&mut self, entry: Entry) -> EntryId {
        self.entries.push(entry);
        EntryId(self.entries.len() - 1)
    }

    fn update_entry(&mut self, id: EntryId, text: &str) {
        if let Some(entry) = self.entries.get_mut(id.0) {
            entry.text.clear();
            entry.text.push_str(text);
        }
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn connection_state_changed(&mut self, state: ConnectionState) {
        if self.connection_states.len() == STATE_HISTORY {
            self.connection_states.remove(0);
        }
        self.connection_states.push(state);
    }

    fn thinking_changed(&mut self, state: ThinkingState) {
        self.thinking = state;
    }

    fn status_refresh_requested(&mut self) {
        self.status_refreshes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_returns_sequential_ids() {
        let mut t = Transcript::new();
        let a = t.push_entry(Entry::user("hi"));
        let b = t.push_entry(Entry::assistant("hello"));
        assert_eq!(a, EntryId(0));
        assert_eq!(b, EntryId(1));
        assert_eq!(t.get(b).unwrap().role, Role::Assistant);
    }

    #[test]
    fn update_replaces_text_in_place() {
        let mut t = Transcript::new();
        let id = t.push_entry(Entry::assistant("Hel"));
        t.update_entry(id, "Hello");
        assert_eq!(t.entries().len(), 1);
        assert_eq!(t.last().unwrap().text, "Hello");
    }

    #[test]
    fn update_of_stale_id_is_ignored() {
        let mut t = Transcript::new();
        t.update_entry(EntryId(3), "nope");
        assert!(t.entries().is_empty());
    }

    #[test]
    fn connection_history_stays_bounded() {
        let mut t = Transcript::new();
        for _ in 0..100 {
            t.connection_state_changed(ConnectionState::Connecting);
            t.connection_state_changed(ConnectionState::Disconnected);
        }
        assert_eq!(t.connection_states().len(), STATE_HISTORY);
        assert_eq!(t.connection_state(), Some(ConnectionState::Disconnected));
    }

    #[test]
    fn clear_drops_entries() {
        let mut t = Transcript::new();
        t.push_entry(Entry::system("x"));
        t.clear();
        assert!(t.last().is_none());
    }
}
