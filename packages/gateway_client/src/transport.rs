//! Socket seam between the connection manager and the network.
//!
//! A [`Connector`] opens sockets; each socket reports what happens to it as
//! [`SocketEvent`]s tagged with the [`SocketId`] it was opened with. The
//! manager only ever reacts to events from its current socket, so a socket it
//! has given up on can keep reporting without effect.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};
use url::Url;

use crate::error::{ClientError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketId(pub u64);

impl std::fmt::Display for SocketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "socket-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Opened,
    /// A text frame from the gateway.
    Frame(String),
    Closed,
    /// Connect failure or a transport error. The socket is unusable afterwards.
    Failed(String),
}

pub trait Socket {
    /// Queue a text frame. Fails only when the socket is already gone.
    fn send_text(&mut self, text: String) -> Result<()>;
    fn close(&mut self);
}

pub trait Connector {
    type Socket: Socket;

    /// Start opening a socket. The outcome arrives later as `Opened` or `Failed`.
    fn open(&mut self, id: SocketId, url: &Url) -> Self::Socket;
}

/// How long the TCP connect and WebSocket upgrade may take together.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Real WebSocket connector. One task per socket.
pub struct TungsteniteConnector {
    events_tx: mpsc::UnboundedSender<(SocketId, SocketEvent)>,
    handshake_timeout: Duration,
}

impl TungsteniteConnector {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(SocketId, SocketEvent)>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let connector = Self {
            events_tx,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        };
        (connector, events_rx)
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}

impl Connector for TungsteniteConnector {
    type Socket = TungsteniteSocket;

    fn open(&mut self, id: SocketId, url: &Url) -> TungsteniteSocket {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        tokio::spawn(run_socket(
            id,
            url.to_string(),
            self.handshake_timeout,
            commands_rx,
            self.events_tx.clone(),
        ));
        TungsteniteSocket {
            id,
            commands: commands_tx,
        }
    }
}

enum SocketCommand {
    Send(String),
    Close,
}

/// Handle to a socket task. Dropping it closes the socket.
pub struct TungsteniteSocket {
    id: SocketId,
    commands: mpsc::UnboundedSender<SocketCommand>,
}

impl Socket for TungsteniteSocket {
    fn send_text(&mut self, text: String) -> Result<()> {
        self.commands
            .send(SocketCommand::Send(text))
            .map_err(|_| ClientError::Transport(format!("{} is no longer running", self.id)))
    }

    fn close(&mut self) {
        let _ = self.commands.send(SocketCommand::Close);
    }
}

async fn run_socket(
    id: SocketId,
    url: String,
    handshake_timeout: Duration,
    mut commands: mpsc::UnboundedReceiver<SocketCommand>,
    events: mpsc::UnboundedSender<(SocketId, SocketEvent)>,
) {
    let connect = tokio_tungstenite::connect_async(url.as_str());
    let ws = match tokio::time::timeout(handshake_timeout, connect).await {
        Ok(Ok((ws, _))) => ws,
        Ok(Err(e)) => {
            let err = ClientError::from_tungstenite(e);
            warn!(socket = %id, "connect failed: {}", err);
            let _ = events.send((id, SocketEvent::Failed(err.to_string())));
            return;
        }
        Err(_) => {
            let reason = format!("handshake timed out after {handshake_timeout:?}");
            warn!(socket = %id, "connect failed: {}", reason);
            let _ = events.send((id, SocketEvent::Failed(reason)));
            return;
        }
    };
    let _ = events.send((id, SocketEvent::Opened));

    let (mut ws_write, mut ws_read) = ws.split();

    loop {
        tokio::select! {
            cmd = commands.recv() => {
                match cmd {
                    Some(SocketCommand::Send(text)) => {
                        if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                            let _ = events.send((id, SocketEvent::Failed(e.to_string())));
                            break;
                        }
                    }
                    // Close requested, or the handle was dropped
                    Some(SocketCommand::Close) | None => {
                        let _ = ws_write.send(Message::Close(None)).await;
                        let _ = events.send((id, SocketEvent::Closed));
                        break;
                    }
                }
            }

            msg = ws_read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let _ = events.send((id, SocketEvent::Frame(text.to_string())));
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        let _ = events.send((id, SocketEvent::Closed));
                        break;
                    }
                    Some(Ok(_)) => {
                        // Binary, ping and pong frames carry nothing for us
                    }
                    Some(Err(e)) => {
                        let _ = events.send((id, SocketEvent::Failed(e.to_string())));
                        break;
                    }
                }
            }
        }
    }

    debug!(socket = %id, "socket task finished");
}
