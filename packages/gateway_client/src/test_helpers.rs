//! Deterministic stand-ins for the clock and the network.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use url::Url;

use crate::client::ChatClient;
use crate::connection::{ConnectionManager, ConnectionOptions};
use crate::error::{ClientError, Result};
use crate::scheduler::{Scheduler, Timer, TimerHandle};
use crate::session_store::{SessionStore, StateStore};
use crate::thinking::ThinkingSignal;
use crate::transport::{Connector, Socket, SocketEvent, SocketId};
use crate::view::Transcript;

/// Virtual-time scheduler. Nothing fires until a test asks for it.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now: Duration,
    next_id: u64,
    pending: Vec<(TimerHandle, Duration, Timer)>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the earliest timer due at or before `until` and move the clock to it.
    pub fn next_due(&mut self, until: Duration) -> Option<(TimerHandle, Timer)> {
        let idx = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, (_, due, _))| *due <= until)
            .min_by_key(|(_, (h, due, _))| (*due, *h))
            .map(|(i, _)| i)?;
        let (handle, due, timer) = self.pending.remove(idx);
        self.now = self.now.max(due);
        Some((handle, timer))
    }

    pub fn advance_to(&mut self, until: Duration) {
        self.now = self.now.max(until);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_of(&self, timer: Timer) -> usize {
        self.pending.iter().filter(|(_, _, t)| *t == timer).count()
    }

    pub fn due_at(&self, timer: Timer) -> Vec<Duration> {
        self.pending
            .iter()
            .filter(|(_, _, t)| *t == timer)
            .map(|(_, due, _)| *due)
            .collect()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration, timer: Timer) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.pending.push((handle, self.now + delay, timer));
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.pending.retain(|(h, _, _)| *h != handle);
    }
}

/// Everything the fake network has been asked to do.
#[derive(Debug, Default)]
pub struct FakeNet {
    pub opened: Vec<(SocketId, Url)>,
    pub sent: Vec<(SocketId, String)>,
    pub closed: Vec<SocketId>,
}

/// Connector whose sockets only record traffic. Clones share one [`FakeNet`].
#[derive(Debug, Clone, Default)]
pub struct FakeConnector {
    net: Rc<RefCell<FakeNet>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn opened(&self) -> Vec<(SocketId, Url)> {
        self.net.borrow().opened.clone()
    }

    pub fn last_opened(&self) -> Option<SocketId> {
        self.net.borrow().opened.last().map(|(id, _)| *id)
    }

    pub fn sent(&self) -> Vec<(SocketId, String)> {
        self.net.borrow().sent.clone()
    }

    /// Sent frames decoded as JSON, in order.
    pub fn sent_json(&self) -> Vec<serde_json::Value> {
        self.net
            .borrow()
            .sent
            .iter()
            .map(|(_, text)| serde_json::from_str(text).unwrap())
            .collect()
    }

    pub fn closed(&self) -> Vec<SocketId> {
        self.net.borrow().closed.clone()
    }
}

impl Connector for FakeConnector {
    type Socket = FakeSocket;

    fn open(&mut self, id: SocketId, url: &Url) -> FakeSocket {
        self.net.borrow_mut().opened.push((id, url.clone()));
        FakeSocket {
            id,
            net: self.net.clone(),
            closed: false,
        }
    }
}

#[derive(Debug)]
pub struct FakeSocket {
    id: SocketId,
    net: Rc<RefCell<FakeNet>>,
    closed: bool,
}

impl Socket for FakeSocket {
    fn send_text(&mut self, text: String) -> Result<()> {
        if self.closed {
            return Err(ClientError::Transport(format!("{} is closed", self.id)));
        }
        self.net.borrow_mut().sent.push((self.id, text));
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
        self.net.borrow_mut().closed.push(self.id);
    }
}

pub fn test_url() -> Url {
    Url::parse("ws://gateway.test/ws").unwrap()
}

pub fn test_options() -> ConnectionOptions {
    ConnectionOptions::new(&test_url(), None)
}

pub type TestClient = ChatClient<FakeConnector, ManualScheduler, Transcript>;

/// A fully wired client on fake transport and virtual time.
pub struct Harness {
    pub client: TestClient,
    pub net: FakeConnector,
    pub store: StateStore,
    _tmp: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_session(None)
    }

    /// Start from a state directory that already holds `session`.
    pub fn with_session(session: Option<&str>) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let store = StateStore::open(tmp.path().join("state")).unwrap();
        if let Some(id) = session {
            store.set(crate::session_store::SESSION_KEY, id).unwrap();
        }
        let net = FakeConnector::new();
        let client = ChatClient::new(
            ConnectionManager::new(net.clone(), test_options()),
            SessionStore::load(store.clone()),
            ThinkingSignal::default(),
            ManualScheduler::new(),
            Transcript::new(),
        );
        Self {
            client,
            net,
            store,
            _tmp: tmp,
        }
    }

    /// Connect and complete the socket open.
    pub fn connected() -> Self {
        let mut h = Self::new();
        h.client.connect();
        h.open();
        h
    }

    pub fn current(&self) -> SocketId {
        self.net.last_opened().expect("no socket opened")
    }

    pub fn open(&mut self) {
        let id = self.current();
        self.client.on_socket_event(id, SocketEvent::Opened);
    }

    pub fn frame(&mut self, json: &str) {
        let id = self.current();
        self.client
            .on_socket_event(id, SocketEvent::Frame(json.to_string()));
    }

    /// A `message` event whose content is `content`.
    pub fn message(&mut self, content: &str) {
        let json = serde_json::json!({ "type": "message", "content": content }).to_string();
        self.frame(&json);
    }

    pub fn drop_socket(&mut self) {
        let id = self.current();
        self.client.on_socket_event(id, SocketEvent::Closed);
    }

    /// Fire every timer due up to `until` (virtual time since the harness started).
    pub fn advance(&mut self, until: Duration) {
        while let Some((h, t)) = self.client.scheduler_mut().next_due(until) {
            self.client.on_timer(h, t);
        }
        self.client.scheduler_mut().advance_to(until);
    }

    pub fn view(&self) -> &Transcript {
        self.client.view()
    }
}

pub fn chunk(text: &str) -> String {
    serde_json::json!({ "content": text }).to_string()
}
