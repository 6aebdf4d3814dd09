//! The chat client: one connection, one session, one view.
//!
//! `ChatClient` is the composition root. It owns every component and is the
//! single place socket events, timer fires and user actions enter. Nothing in
//! here blocks or awaits; the event loop feeds it.

use gateway_protocol::ChatPayload;
use tracing::{debug, info, warn};

use crate::aggregator::StreamAggregator;
use crate::connection::{ConnectionManager, ConnectionState, Inbound};
use crate::error::{ClientError, Result};
use crate::router::{self, Targets};
use crate::scheduler::{Scheduler, Timer, TimerHandle};
use crate::session_store::{PROVIDER_KEY, SessionStore};
use crate::thinking::ThinkingSignal;
use crate::transport::{Connector, SocketEvent, SocketId};
use crate::view::{ChatView, Entry};

pub const NOT_CONNECTED_HINT: &str = "Not connected to the gateway. Use /reconnect to try again.";

pub struct ChatClient<C: Connector, S: Scheduler, V: ChatView> {
    connection: ConnectionManager<C>,
    session: SessionStore,
    aggregator: StreamAggregator,
    thinking: ThinkingSignal,
    scheduler: S,
    view: V,
    provider: Option<String>,
}

impl<C: Connector, S: Scheduler, V: ChatView> ChatClient<C, S, V> {
    pub fn new(
        connection: ConnectionManager<C>,
        session: SessionStore,
        thinking: ThinkingSignal,
        scheduler: S,
        view: V,
    ) -> Self {
        Self {
            connection,
            session,
            aggregator: StreamAggregator::new(),
            thinking,
            scheduler,
            view,
            provider: None,
        }
    }

    /// Route chat messages to this provider instead of the gateway default.
    pub fn with_provider(mut self, provider: Option<String>) -> Self {
        self.provider = provider;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn connection(&self) -> &ConnectionManager<C> {
        &self.connection
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn thinking(&self) -> &ThinkingSignal {
        &self.thinking
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn connect(&mut self) {
        self.connection.connect(&mut self.scheduler, &mut self.view);
    }

    /// Replace the socket without waiting for a retry.
    pub fn reconnect_fresh(&mut self) {
        self.connection
            .reconnect_fresh(&mut self.scheduler, &mut self.view);
    }

    pub fn on_socket_event(&mut self, id: SocketId, event: SocketEvent) {
        let inbound = self.connection.on_socket_event(
            id,
            event,
            &self.session,
            &mut self.scheduler,
            &mut self.view,
        );
        let Some(inbound) = inbound else {
            return;
        };

        let mut targets = Targets {
            session: &mut self.session,
            aggregator: &mut self.aggregator,
            thinking: &mut self.thinking,
            scheduler: &mut self.scheduler,
            view: &mut self.view,
        };
        match inbound {
            Inbound::Event(event) => router::dispatch(event, &mut targets),
            Inbound::Undecodable { raw, .. } => router::undecodable(raw, &mut targets),
        }
    }

    pub fn on_timer(&mut self, handle: TimerHandle, timer: Timer) {
        let handled = match timer {
            Timer::Reconnect => {
                self.connection
                    .on_timer(handle, timer, &mut self.scheduler, &mut self.view)
            }
            Timer::ThinkingIdle | Timer::ThinkingTick => {
                self.thinking
                    .on_timer(handle, timer, &mut self.scheduler, &mut self.view)
            }
        };
        if !handled {
            debug!(%handle, ?timer, "stale timer ignored");
        }
    }

    /// Send a chat message. Failures are also shown in the view, so callers
    /// may ignore the returned error.
    pub fn submit(&mut self, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let payload = ChatPayload::new(text, self.provider.clone());
        match self.connection.send(&payload) {
            Ok(()) => {
                self.aggregator.begin_turn();
                self.view.push_entry(Entry::user(text));
                Ok(())
            }
            Err(ClientError::NotConnected) => {
                self.view.push_entry(Entry::error(NOT_CONNECTED_HINT));
                Err(ClientError::NotConnected)
            }
            Err(e) => {
                warn!("failed to send message: {}", e);
                self.view.push_entry(Entry::error(e.to_string()));
                Err(e)
            }
        }
    }

    /// Forget the session and start over on a fresh socket.
    pub fn clear_chat(&mut self) {
        info!("starting a new chat");
        self.session.clear();
        self.aggregator.begin_turn();
        self.thinking
            .mark_inactive(&mut self.scheduler, &mut self.view);
        self.view.clear();
        self.connection
            .reconnect_fresh(&mut self.scheduler, &mut self.view);
    }

    /// Switch the provider used for subsequent messages and remember it.
    pub fn select_provider(&mut self, provider: Option<String>) {
        let store = self.session.state();
        let persisted = match provider.as_deref() {
            Some(id) => store.set(PROVIDER_KEY, id),
            None => store.remove(PROVIDER_KEY),
        };
        if let Err(e) = persisted {
            warn!("failed to persist provider choice: {}", e);
        }

        let note = match provider.as_deref() {
            Some(id) => format!("Using provider {id}"),
            None => "Using the gateway's default provider".to_string(),
        };
        self.view.push_entry(Entry::system(note));
        self.provider = provider;
    }
}
