//! Socket lifecycle: open, handshake, decode, drop and retry.
//!
//! The manager owns at most one live socket. Every socket gets a fresh
//! [`SocketId`]; events carrying any other id are ignored, which is how a
//! deliberately replaced socket is kept from triggering a reconnect.

use std::time::Duration;

use gateway_protocol::{ControlRequest, MAX_TEXT_FRAME_BYTES, ServerEvent};
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ClientError, Result};
use crate::scheduler::{Scheduler, Timer, TimerHandle};
use crate::session_store::SessionStore;
use crate::transport::{Connector, Socket, SocketEvent, SocketId};
use crate::view::ChatView;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Full socket URL, token included.
    pub endpoint: Url,
    pub reconnect_delay: Duration,
    pub max_message_bytes: usize,
}

impl ConnectionOptions {
    pub fn new(gateway: &Url, token: Option<&str>) -> Self {
        Self {
            endpoint: endpoint_url(gateway, token),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            max_message_bytes: MAX_TEXT_FRAME_BYTES,
        }
    }
}

/// The socket URL with the access token, if any, as a `token` query parameter.
pub fn endpoint_url(gateway: &Url, token: Option<&str>) -> Url {
    let mut url = gateway.clone();
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        url.query_pairs_mut().append_pair("token", token);
    }
    url
}

/// The endpoint with its query stripped, safe to log.
fn redacted(url: &Url) -> Url {
    let mut url = url.clone();
    url.set_query(None);
    url
}

/// What an inbound frame turned into.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Event(ServerEvent),
    /// Not JSON, or not an object. Kept so it can be shown as a diagnostic.
    Undecodable { raw: String, reason: String },
}

struct ActiveSocket<S> {
    id: SocketId,
    socket: S,
}

pub struct ConnectionManager<C: Connector> {
    connector: C,
    options: ConnectionOptions,
    state: ConnectionState,
    socket: Option<ActiveSocket<C::Socket>>,
    next_socket_id: u64,
    reconnect_timer: Option<TimerHandle>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, options: ConnectionOptions) -> Self {
        Self {
            connector,
            options,
            state: ConnectionState::Disconnected,
            socket: None,
            next_socket_id: 1,
            reconnect_timer: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_timer.is_some()
    }

    pub fn current_socket(&self) -> Option<SocketId> {
        self.socket.as_ref().map(|s| s.id)
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    /// Open a socket unless one is already opening or open.
    pub fn connect(&mut self, sched: &mut dyn Scheduler, view: &mut dyn ChatView) {
        if self.state != ConnectionState::Disconnected {
            debug!(state = %self.state, "connect ignored");
            return;
        }
        if let Some(h) = self.reconnect_timer.take() {
            sched.cancel(h);
        }

        let id = SocketId(self.next_socket_id);
        self.next_socket_id += 1;
        info!(socket = %id, url = %redacted(&self.options.endpoint), "connecting to gateway");

        let socket = self.connector.open(id, &self.options.endpoint);
        self.socket = Some(ActiveSocket { id, socket });
        self.set_state(ConnectionState::Connecting, view);
    }

    /// Apply one socket event. Frames from the current socket come back
    /// decoded for the router; everything else is handled here.
    pub fn on_socket_event(
        &mut self,
        id: SocketId,
        event: SocketEvent,
        session: &SessionStore,
        sched: &mut dyn Scheduler,
        view: &mut dyn ChatView,
    ) -> Option<Inbound> {
        if self.current_socket() != Some(id) {
            debug!(socket = %id, ?event, "event from superseded socket ignored");
            return None;
        }

        match event {
            SocketEvent::Opened => {
                self.set_state(ConnectionState::Connected, view);
                let handshake = ControlRequest::handshake(session.get());
                match &handshake {
                    ControlRequest::Resume { session_id } => {
                        info!(socket = %id, session = %session_id, "resuming session")
                    }
                    ControlRequest::Init => info!(socket = %id, "starting new session"),
                }
                if let Err(e) = self.send(&handshake) {
                    warn!(socket = %id, "failed to send handshake: {}", e);
                }
                None
            }
            SocketEvent::Frame(text) => Some(match ServerEvent::decode(&text) {
                Ok(event) => Inbound::Event(event),
                Err(e) => {
                    debug!(socket = %id, "undecodable frame: {}", e);
                    Inbound::Undecodable {
                        raw: text,
                        reason: e.to_string(),
                    }
                }
            }),
            SocketEvent::Closed => {
                info!(socket = %id, "gateway connection closed");
                self.lose_socket(sched, view);
                None
            }
            SocketEvent::Failed(reason) => {
                warn!(socket = %id, "gateway connection failed: {}", reason);
                self.lose_socket(sched, view);
                None
            }
        }
    }

    /// Handle a fired timer. Returns `false` for handles this manager does
    /// not currently own.
    pub fn on_timer(
        &mut self,
        handle: TimerHandle,
        timer: Timer,
        sched: &mut dyn Scheduler,
        view: &mut dyn ChatView,
    ) -> bool {
        if timer != Timer::Reconnect || self.reconnect_timer != Some(handle) {
            return false;
        }
        self.reconnect_timer = None;
        self.connect(sched, view);
        true
    }

    /// Drop the current socket without scheduling a retry and connect again.
    pub fn reconnect_fresh(&mut self, sched: &mut dyn Scheduler, view: &mut dyn ChatView) {
        if let Some(h) = self.reconnect_timer.take() {
            sched.cancel(h);
        }
        if let Some(mut old) = self.socket.take() {
            debug!(socket = %old.id, "closing socket for fresh connect");
            old.socket.close();
        }
        self.set_state(ConnectionState::Disconnected, view);
        self.connect(sched, view);
    }

    /// Serialize and send one frame on the open socket.
    pub fn send<T: Serialize>(&mut self, payload: &T) -> Result<()> {
        if self.state != ConnectionState::Connected {
            return Err(ClientError::NotConnected);
        }
        let Some(active) = self.socket.as_mut() else {
            return Err(ClientError::NotConnected);
        };

        let text = serde_json::to_string(payload)?;
        if text.len() > self.options.max_message_bytes {
            return Err(ClientError::MessageTooLarge {
                size: text.len(),
                limit: self.options.max_message_bytes,
            });
        }
        active.socket.send_text(text)
    }

    fn lose_socket(&mut self, sched: &mut dyn Scheduler, view: &mut dyn ChatView) {
        self.socket = None;
        self.set_state(ConnectionState::Disconnected, view);

        if self.reconnect_timer.is_some() {
            debug!("reconnect already scheduled");
            return;
        }
        info!(
            delay_ms = self.options.reconnect_delay.as_millis() as u64,
            "scheduling reconnect"
        );
        self.reconnect_timer = Some(sched.schedule(self.options.reconnect_delay, Timer::Reconnect));
    }

    fn set_state(&mut self, state: ConnectionState, view: &mut dyn ChatView) {
        if self.state == state {
            return;
        }
        debug!(from = %self.state, to = %state, "connection state changed");
        self.state = state;
        view.connection_state_changed(state);
    }
}
