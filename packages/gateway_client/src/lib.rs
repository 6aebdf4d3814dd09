//! Client side of the gateway chat protocol.
//!
//! The core is a set of synchronous state machines driven from one event
//! loop:
//!
//! - [`ConnectionManager`] owns the socket, sends the `init`/`resume`
//!   handshake and retries after a fixed delay when the socket drops.
//! - [`SessionStore`] holds the gateway-issued session id and persists it so
//!   a restarted client resumes the same conversation.
//! - [`StreamAggregator`] folds streamed chunks into one growing entry.
//! - [`ThinkingSignal`] debounces chunk arrivals into a busy indicator.
//! - [`router`] sends each decoded event to the right component.
//!
//! Time and I/O enter through the [`Scheduler`] and [`Connector`] seams, so
//! [`ChatClient`] runs the same against tokio in production and against
//! virtual time in tests. [`runtime`] holds the production wiring.

pub mod aggregator;
pub mod api;
pub mod client;
pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod router;
pub mod runtime;
pub mod scheduler;
pub mod session_store;
pub mod thinking;
pub mod transport;
pub mod view;

#[cfg(test)]
mod e2e_tests;
#[cfg(test)]
mod test_helpers;

pub use aggregator::{Ingested, StreamAggregator};
pub use api::GatewayApi;
pub use client::ChatClient;
pub use connection::{ConnectionManager, ConnectionOptions, ConnectionState};
pub use error::{ClientError, Result};
pub use scheduler::{Scheduler, Timer, TimerHandle, TokioScheduler};
pub use session_store::{SessionStore, StateStore};
pub use thinking::{ThinkingSignal, ThinkingState};
pub use transport::{Connector, Socket, SocketEvent, SocketId, TungsteniteConnector};
pub use view::{ChatView, Entry, EntryId, Role, Transcript};
