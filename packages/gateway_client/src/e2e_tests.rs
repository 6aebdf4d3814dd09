//! Live client against an in-process gateway stand-in.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use serde_json::{Value, json};
use tokio::time::timeout;
use url::Url;

use crate::connection::{ConnectionOptions, ConnectionState};
use crate::runtime::{LiveClient, LiveEvents, live_client};
use crate::session_store::{SESSION_KEY, SessionStore, StateStore};
use crate::thinking::ThinkingSignal;
use crate::view::{Role, Transcript};

const TEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Default)]
struct GatewayState {
    connections: Arc<AtomicUsize>,
    /// Close the first connection right after the welcome.
    drop_first: bool,
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<GatewayState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn send_json(socket: &mut WebSocket, value: Value) -> bool {
    socket
        .send(Message::Text(value.to_string().into()))
        .await
        .is_ok()
}

async fn handle_socket(mut socket: WebSocket, state: GatewayState) {
    let n = state.connections.fetch_add(1, Ordering::SeqCst) + 1;

    if !send_json(&mut socket, json!({"type": "connected", "session_id": "sess-e2e"})).await {
        return;
    }
    if state.drop_first && n == 1 {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    while let Some(Ok(msg)) = socket.recv().await {
        let Message::Text(text) = msg else { continue };
        let Ok(frame) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        match frame.get("type").and_then(Value::as_str) {
            Some("resume") => {
                let id = frame["session_id"].clone();
                send_json(
                    &mut socket,
                    json!({"type": "resumed", "session_id": id, "history_length": 3}),
                )
                .await;
            }
            Some("init") => {}
            _ => {
                let content = frame["content"].as_str().unwrap_or_default().to_string();
                for part in ["Echo: ", content.as_str()] {
                    let chunk = json!({ "content": part }).to_string();
                    send_json(&mut socket, json!({"type": "message", "content": chunk})).await;
                }
                send_json(&mut socket, json!({"type": "message", "content": "done"})).await;
            }
        }
    }
}

async fn spawn_gateway(state: GatewayState) -> Url {
    let app = Router::new()
        .route(gateway_protocol::WS_PATH, get(ws_handler))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("ws://{addr}/ws")).unwrap()
}

fn options(url: &Url) -> ConnectionOptions {
    ConnectionOptions {
        reconnect_delay: Duration::from_millis(50),
        ..ConnectionOptions::new(url, None)
    }
}

async fn pump_until(
    client: &mut LiveClient<Transcript>,
    events: &mut LiveEvents,
    what: &str,
    done: impl Fn(&LiveClient<Transcript>) -> bool,
) {
    let reached = timeout(TEST_TIMEOUT, async {
        while !done(client) {
            match events.next().await {
                Some(ev) => client.apply(ev),
                None => return false,
            }
        }
        true
    })
    .await;
    assert!(matches!(reached, Ok(true)), "timed out waiting for {what}");
}

#[tokio::test]
async fn chat_round_trip_streams_reply() {
    let url = spawn_gateway(GatewayState::default()).await;
    let tmp = tempfile::tempdir().unwrap();
    let store = StateStore::open(tmp.path()).unwrap();

    let (mut client, mut events) = live_client(
        options(&url),
        SessionStore::load(store.clone()),
        ThinkingSignal::default(),
        Transcript::new(),
    );
    client.connect();
    pump_until(&mut client, &mut events, "welcome", |c| {
        c.session().get() == Some("sess-e2e")
    })
    .await;
    assert_eq!(client.state(), ConnectionState::Connected);
    assert_eq!(store.get(SESSION_KEY).as_deref(), Some("sess-e2e"));

    client.submit("ping").unwrap();
    pump_until(&mut client, &mut events, "reply", |c| {
        c.view().last().is_some_and(|e| e.text == "done")
    })
    .await;

    let entries = client.view().entries();
    let roles: Vec<_> = entries.iter().map(|e| e.role).collect();
    assert_eq!(roles, [Role::User, Role::Assistant, Role::Assistant]);
    assert_eq!(entries[1].text, "Echo: ping");
    assert!(!client.thinking().is_active());
}

#[tokio::test]
async fn dropped_socket_reconnects_and_resumes() {
    let state = GatewayState {
        drop_first: true,
        ..Default::default()
    };
    let connections = state.connections.clone();
    let url = spawn_gateway(state).await;
    let tmp = tempfile::tempdir().unwrap();
    let store = StateStore::open(tmp.path()).unwrap();

    let (mut client, mut events) = live_client(
        options(&url),
        SessionStore::load(store),
        ThinkingSignal::default(),
        Transcript::new(),
    );
    client.connect();
    pump_until(&mut client, &mut events, "resume", |c| {
        c.view()
            .entries()
            .iter()
            .any(|e| e.text == "Session resumed (3 messages restored)")
    })
    .await;

    assert_eq!(connections.load(Ordering::SeqCst), 2);
    assert_eq!(client.state(), ConnectionState::Connected);
    assert!(
        client
            .view()
            .connection_states()
            .contains(&ConnectionState::Disconnected)
    );
}

#[tokio::test]
async fn persisted_session_is_resumed_on_start() {
    let url = spawn_gateway(GatewayState::default()).await;
    let tmp = tempfile::tempdir().unwrap();
    let store = StateStore::open(tmp.path()).unwrap();
    store.set(SESSION_KEY, "sess-old").unwrap();

    let (mut client, mut events) = live_client(
        options(&url),
        SessionStore::load(store.clone()),
        ThinkingSignal::default(),
        Transcript::new(),
    );
    client.connect();
    pump_until(&mut client, &mut events, "resumed", |c| {
        c.view().last().is_some_and(|e| e.role == Role::System)
    })
    .await;

    // The resume reply carries the old id back after the welcome's fresh one
    assert_eq!(client.session().get(), Some("sess-old"));
    assert_eq!(store.get(SESSION_KEY).as_deref(), Some("sess-old"));
}
