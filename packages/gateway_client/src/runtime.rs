//! Live wiring: real sockets, real timers, and a terminal renderer.

use std::io::Write;

use gateway_protocol::rest::StatusResponse;
use tokio::sync::mpsc;
use tracing::debug;

use crate::client::ChatClient;
use crate::connection::{ConnectionManager, ConnectionOptions, ConnectionState};
use crate::error::{ClientError, Result};
use crate::scheduler::{Timer, TimerHandle, TokioScheduler};
use crate::session_store::SessionStore;
use crate::thinking::{ThinkingSignal, ThinkingState};
use crate::transport::{SocketEvent, SocketId, TungsteniteConnector};
use crate::view::{ChatView, Entry, EntryId, Role, Transcript};

pub type LiveClient<V> = ChatClient<TungsteniteConnector, TokioScheduler, V>;

#[derive(Debug)]
pub enum LiveEvent {
    Socket(SocketId, SocketEvent),
    Timer(TimerHandle, Timer),
}

/// Socket events and timer fires for a [`LiveClient`], merged.
pub struct LiveEvents {
    sockets: mpsc::UnboundedReceiver<(SocketId, SocketEvent)>,
    timers: mpsc::UnboundedReceiver<(TimerHandle, Timer)>,
}

impl LiveEvents {
    /// Cancel-safe; fine to use as a `select!` branch.
    pub async fn next(&mut self) -> Option<LiveEvent> {
        tokio::select! {
            Some((id, ev)) = self.sockets.recv() => Some(LiveEvent::Socket(id, ev)),
            Some((h, t)) = self.timers.recv() => Some(LiveEvent::Timer(h, t)),
            else => None,
        }
    }
}

/// Build a client on tokio-tungstenite sockets and tokio timers. Must be
/// called inside a tokio runtime.
pub fn live_client<V: ChatView>(
    options: ConnectionOptions,
    session: SessionStore,
    thinking: ThinkingSignal,
    view: V,
) -> (LiveClient<V>, LiveEvents) {
    let (connector, sockets) = TungsteniteConnector::new();
    let (scheduler, timers) = TokioScheduler::new();
    let client = ChatClient::new(
        ConnectionManager::new(connector, options),
        session,
        thinking,
        scheduler,
        view,
    );
    (client, LiveEvents { sockets, timers })
}

impl<V: ChatView> ChatClient<TungsteniteConnector, TokioScheduler, V> {
    pub fn apply(&mut self, event: LiveEvent) {
        match event {
            LiveEvent::Socket(id, ev) => self.on_socket_event(id, ev),
            LiveEvent::Timer(handle, timer) => {
                if self.scheduler_mut().complete(handle) {
                    self.on_timer(handle, timer);
                } else {
                    debug!(%handle, "cancelled timer fired late");
                }
            }
        }
    }
}

// =============================================================================
// Terminal rendering
// =============================================================================

/// Erase from the cursor to the end of the line.
const CLEAR_TO_EOL: &str = "\x1b[K";
const SAVE_CURSOR: &str = "\x1b7";
const RESTORE_CURSOR: &str = "\x1b8";
/// Prefix for streamed text that resumes after something else was printed.
const CONTINUED: &str = "\u{2026} ";

/// Line-oriented renderer. Streamed assistant text is printed as it grows;
/// everything else gets its own line. User input is not echoed since the
/// terminal already shows it.
///
/// The busy indicator is drawn after the cursor and the cursor is put back,
/// so the next write starts by erasing it.
pub struct TerminalView<W: Write> {
    out: W,
    transcript: Transcript,
    /// Entry being streamed and how many bytes of it are printed.
    stream: Option<(EntryId, usize)>,
    /// The cursor sits at the end of the streamed text.
    line_open: bool,
    indicator: bool,
    status_requested: bool,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            transcript: Transcript::new(),
            stream: None,
            line_open: false,
            indicator: false,
            status_requested: false,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    /// Consume a pending status refresh request.
    pub fn take_status_request(&mut self) -> bool {
        std::mem::take(&mut self.status_requested)
    }

    /// Show a note that is not part of the conversation.
    pub fn notice(&mut self, text: &str) {
        self.end_line();
        self.emit(&format!("* {text}\n"));
    }

    fn end_line(&mut self) {
        if std::mem::take(&mut self.line_open) {
            self.emit("\n");
        }
    }

    fn emit(&mut self, s: &str) {
        if std::mem::take(&mut self.indicator) {
            self.write_raw(CLEAR_TO_EOL);
        }
        self.write_raw(s);
    }

    fn write_raw(&mut self, s: &str) {
        if let Err(e) = self
            .out
            .write_all(s.as_bytes())
            .and_then(|()| self.out.flush())
        {
            debug!("terminal write failed: {}", e);
        }
    }
}

impl<W: Write> ChatView for TerminalView<W> {
    fn push_entry(&mut self, entry: Entry) -> EntryId {
        self.end_line();
        let id = self.transcript.push_entry(entry.clone());
        match entry.role {
            Role::User => {}
            Role::Assistant => {
                self.emit(&entry.text);
                self.stream = Some((id, entry.text.len()));
                self.line_open = true;
            }
            Role::System => self.emit(&format!("* {}\n", entry.text)),
            Role::Error => self.emit(&format!("! {}\n", entry.text)),
        }
        id
    }

    fn update_entry(&mut self, id: EntryId, text: &str) {
        self.transcript.update_entry(id, text);
        let delta = match self.stream {
            Some((streamed, printed)) if streamed == id => text.get(printed..),
            _ => None,
        };
        match delta {
            Some("") => {}
            Some(delta) if self.line_open => self.emit(delta),
            Some(delta) => {
                self.emit(&format!("{CONTINUED}{delta}"));
                self.line_open = true;
            }
            None => {
                // Another entry, or not a pure append; print it whole
                self.end_line();
                self.emit(text);
                self.line_open = true;
            }
        }
        self.stream = Some((id, text.len()));
    }

    fn clear(&mut self) {
        self.end_line();
        self.stream = None;
        self.transcript.clear();
        self.emit("--- new chat ---\n");
    }

    fn connection_state_changed(&mut self, state: ConnectionState) {
        self.transcript.connection_state_changed(state);
        match state {
            ConnectionState::Connected => self.notice("connected to gateway"),
            ConnectionState::Disconnected => self.notice("disconnected"),
            ConnectionState::Connecting => {}
        }
    }

    fn thinking_changed(&mut self, state: ThinkingState) {
        self.transcript.thinking_changed(state);
        if state.active {
            let lead = if self.line_open { " " } else { "* " };
            self.emit(&format!(
                "{SAVE_CURSOR}{lead}thinking\u{2026} {}s{RESTORE_CURSOR}",
                state.elapsed_secs
            ));
            self.indicator = true;
        } else if std::mem::take(&mut self.indicator) {
            self.write_raw(CLEAR_TO_EOL);
        }
    }

    fn status_refresh_requested(&mut self) {
        self.transcript.status_refresh_requested();
        self.status_requested = true;
    }
}

// =============================================================================
// Ambient status
// =============================================================================

/// One-line summary of a status fetch. Failures degrade to a placeholder.
pub fn render_status(result: &Result<StatusResponse>) -> String {
    match result {
        Ok(s) => {
            let mut line = format!(
                "gateway {}, {} active session{}",
                if s.status.is_empty() { "up" } else { s.status.as_str() },
                s.sessions,
                if s.sessions == 1 { "" } else { "s" }
            );
            if !s.channels.is_empty() {
                line.push_str(&format!(", channels: {}", s.channels.join(", ")));
            }
            if let Some(v) = &s.version {
                line.push_str(&format!(" (v{v})"));
            }
            line
        }
        Err(ClientError::Unavailable) => "gateway status unavailable".to_string(),
        Err(e) => format!("gateway status unavailable ({e})"),
    }
}

/// Announces a newer gateway version once per run.
#[derive(Debug, Default)]
pub struct UpdateNotice {
    shown: bool,
}

impl UpdateNotice {
    pub fn check(&mut self, status: &StatusResponse) -> Option<String> {
        if self.shown {
            return None;
        }
        let latest = status.update_available()?;
        self.shown = true;
        Some(format!("gateway update available: {latest}"))
    }
}
