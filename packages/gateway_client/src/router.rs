//! Routes decoded gateway events to the components that handle them.

use gateway_protocol::{EventBody, ServerEvent};
use tracing::{debug, warn};

use crate::aggregator::{Ingested, StreamAggregator};
use crate::scheduler::Scheduler;
use crate::session_store::SessionStore;
use crate::thinking::ThinkingSignal;
use crate::view::{ChatView, Entry};

/// Borrowed handles to everything an event can touch.
pub struct Targets<'a> {
    pub session: &'a mut SessionStore,
    pub aggregator: &'a mut StreamAggregator,
    pub thinking: &'a mut ThinkingSignal,
    pub scheduler: &'a mut dyn Scheduler,
    pub view: &'a mut dyn ChatView,
}

pub fn dispatch(event: ServerEvent, t: &mut Targets<'_>) {
    // Any event may carry the session id, not only the welcome
    if let Some(id) = event.session_id.as_deref() {
        t.session.set(id);
    }

    match event.body {
        EventBody::Connected { note } => {
            if let Some(note) = note {
                t.view.push_entry(Entry::system(note));
            }
            t.view.status_refresh_requested();
        }
        EventBody::Resumed { history_length } => {
            let n = history_length.unwrap_or(0);
            t.view
                .push_entry(Entry::system(format!("Session resumed ({n} messages restored)")));
            t.view.status_refresh_requested();
        }
        EventBody::Message { content } => match t.aggregator.ingest(&content, t.view) {
            Ingested::Chunk => t.thinking.mark_active(t.scheduler, t.view),
            Ingested::Whole => t.thinking.mark_inactive(t.scheduler, t.view),
        },
        EventBody::Error { code, message } => {
            let code = code.unwrap_or_else(|| "unknown".to_string());
            let message = message.unwrap_or_else(|| "Unknown error".to_string());
            warn!(%code, "gateway reported an error: {}", message);
            t.thinking.mark_inactive(t.scheduler, t.view);
            t.view.push_entry(Entry::error(format!("{code}: {message}")));
        }
        EventBody::Unknown { kind, raw } => {
            debug!(kind = ?kind, "unrecognised event");
            t.view.push_entry(Entry::system(raw.to_string()));
        }
    }
}

/// Surface a frame that could not be decoded at all.
pub fn undecodable(raw: String, t: &mut Targets<'_>) {
    t.view.push_entry(Entry::system(raw));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session_store::StateStore;
    use crate::test_helpers::{ManualScheduler, chunk};
    use crate::view::{Role, Transcript};

    struct Rig {
        session: SessionStore,
        aggregator: StreamAggregator,
        thinking: ThinkingSignal,
        sched: ManualScheduler,
        view: Transcript,
        _tmp: tempfile::TempDir,
    }

    impl Rig {
        fn new() -> Self {
            let tmp = tempfile::tempdir().unwrap();
            Self {
                session: SessionStore::load(StateStore::open(tmp.path()).unwrap()),
                aggregator: StreamAggregator::new(),
                thinking: ThinkingSignal::default(),
                sched: ManualScheduler::new(),
                view: Transcript::new(),
                _tmp: tmp,
            }
        }

        fn feed(&mut self, json: &str) {
            let event = ServerEvent::decode(json).unwrap();
            let mut targets = Targets {
                session: &mut self.session,
                aggregator: &mut self.aggregator,
                thinking: &mut self.thinking,
                scheduler: &mut self.sched,
                view: &mut self.view,
            };
            dispatch(event, &mut targets);
        }

        fn message(&mut self, content: &str) {
            self.feed(&serde_json::json!({"type": "message", "content": content}).to_string());
        }
    }

    #[test]
    fn connected_stores_session_and_requests_status() {
        let mut rig = Rig::new();
        rig.feed(r#"{"type":"connected","session_id":"s-1"}"#);
        assert_eq!(rig.session.get(), Some("s-1"));
        assert_eq!(rig.view.status_refreshes(), 1);
        assert!(rig.view.entries().is_empty());
    }

    #[test]
    fn connected_note_is_shown() {
        let mut rig = Rig::new();
        rig.feed(r#"{"type":"connected","session_id":"s-1","note":"welcome back"}"#);
        assert_eq!(rig.view.last().unwrap().text, "welcome back");
        assert_eq!(rig.view.last().unwrap().role, Role::System);
    }

    #[test]
    fn any_event_updates_the_session() {
        let mut rig = Rig::new();
        rig.feed(r#"{"type":"message","content":"hi","session_id":"s-2"}"#);
        assert_eq!(rig.session.get(), Some("s-2"));
        rig.feed(r#"{"type":"whatever","session_id":"s-3"}"#);
        assert_eq!(rig.session.get(), Some("s-3"));
    }

    #[test]
    fn resumed_reports_history_length() {
        let mut rig = Rig::new();
        rig.feed(r#"{"type":"resumed","session_id":"s-1","history_length":12}"#);
        assert_eq!(
            rig.view.last().unwrap().text,
            "Session resumed (12 messages restored)"
        );
        assert_eq!(rig.view.status_refreshes(), 1);

        rig.feed(r#"{"type":"resumed"}"#);
        assert_eq!(
            rig.view.last().unwrap().text,
            "Session resumed (0 messages restored)"
        );
    }

    #[test]
    fn chunks_mark_busy_and_whole_message_clears_it() {
        let mut rig = Rig::new();
        rig.message(&chunk("Hel"));
        assert!(rig.thinking.is_active());
        rig.message(&chunk("lo"));
        assert_eq!(rig.view.entries().len(), 1);
        assert_eq!(rig.view.last().unwrap().text, "Hello");

        rig.message("Final answer.");
        assert!(!rig.thinking.is_active());
        assert_eq!(rig.sched.pending(), 0);
        assert_eq!(rig.view.entries().len(), 2);
    }

    #[test]
    fn error_event_shows_code_and_message() {
        let mut rig = Rig::new();
        rig.message(&chunk("partial"));
        rig.feed(r#"{"type":"error","code":"message_too_large","message":"too big"}"#);

        assert!(!rig.thinking.is_active());
        let last = rig.view.last().unwrap();
        assert_eq!(last.role, Role::Error);
        assert_eq!(last.text, "message_too_large: too big");
    }

    #[test]
    fn error_event_fills_in_placeholders() {
        let mut rig = Rig::new();
        rig.feed(r#"{"type":"error"}"#);
        assert_eq!(rig.view.last().unwrap().text, "unknown: Unknown error");
    }

    #[test]
    fn unknown_event_is_shown_raw() {
        let mut rig = Rig::new();
        rig.feed(r#"{"type":"typing","who":"agent"}"#);
        let last = rig.view.last().unwrap();
        assert_eq!(last.role, Role::System);
        assert!(last.text.contains("typing"));
        assert!(last.text.contains("agent"));
    }

    #[test]
    fn undecodable_frame_is_shown_raw() {
        let mut rig = Rig::new();
        let mut targets = Targets {
            session: &mut rig.session,
            aggregator: &mut rig.aggregator,
            thinking: &mut rig.thinking,
            scheduler: &mut rig.sched,
            view: &mut rig.view,
        };
        undecodable("<html>".to_string(), &mut targets);
        assert_eq!(rig.view.last().unwrap().text, "<html>");
    }
}
