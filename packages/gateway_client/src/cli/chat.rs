//! Interactive chat: stdin lines in, rendered transcript out.

use anyhow::Result;
use std::io::BufRead;
use tokio::sync::mpsc;
use tracing::{debug, info};

use gateway_client::commands::{ChatCommand, HELP};
use gateway_client::config::ClientSettings;
use gateway_client::runtime::{LiveClient, TerminalView, UpdateNotice, live_client, render_status};
use gateway_client::session_store::{PROVIDER_KEY, SessionStore, StateStore};
use gateway_client::{GatewayApi, ThinkingSignal};
use gateway_protocol::rest::{AuthCheckResponse, ProvidersResponse, StatusResponse};

use super::api_for;
use super::providers::render_providers;

type Stdout = TerminalView<std::io::Stdout>;

const TOKEN_HINT: [&str; 2] = [
    "This gateway requires an access token.",
    "Run `gwchat login <token>` or pass --token.",
];

/// Results of REST calls made in the background while chatting.
enum SideResult {
    AuthCheck(gateway_client::Result<AuthCheckResponse>),
    Status(gateway_client::Result<StatusResponse>),
    Providers(gateway_client::Result<ProvidersResponse>),
}

/// Whether to tell the user a token is missing. An unreachable gateway says
/// nothing.
fn needs_token_hint(check: &gateway_client::Result<AuthCheckResponse>, has_token: bool) -> bool {
    match check {
        Ok(check) => check.auth_required && !has_token,
        Err(e) => {
            debug!("auth check skipped: {}", e);
            false
        }
    }
}

pub async fn chat_command(
    settings: &ClientSettings,
    store: StateStore,
    token: Option<String>,
) -> Result<()> {
    let api = api_for(settings, token.clone())?;
    let has_token = token.is_some();

    let provider = store.get(PROVIDER_KEY);
    let (client, mut events) = live_client(
        settings.connection_options(token.as_deref()),
        SessionStore::load(store),
        ThinkingSignal::new(settings.thinking_idle, settings.thinking_tick),
        TerminalView::new(std::io::stdout()),
    );
    let mut client = client.with_provider(provider);

    eprintln!(
        "Connecting to {} (type /help for commands)",
        settings.gateway_url
    );

    // Blocking stdin reader thread
    let (line_tx, mut line_rx) = mpsc::channel::<String>(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    let (side_tx, mut side_rx) = mpsc::unbounded_channel::<SideResult>();
    let mut update_notice = UpdateNotice::default();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    client.connect();

    // The socket is already on its way; the auth check only adds a hint
    {
        let api = api.clone();
        let tx = side_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(SideResult::AuthCheck(api.auth_check().await));
        });
    }

    loop {
        tokio::select! {
            Some(ev) = events.next() => client.apply(ev),

            line = line_rx.recv() => {
                // stdin closed
                let Some(line) = line else { break };
                match ChatCommand::parse(&line) {
                    ChatCommand::Say(text) => {
                        if let Err(e) = client.submit(&text) {
                            debug!("submit failed: {}", e);
                        }
                    }
                    ChatCommand::New => client.clear_chat(),
                    ChatCommand::Reconnect => client.reconnect_fresh(),
                    ChatCommand::Provider(id) => client.select_provider(id),
                    ChatCommand::Providers => {
                        let api = api.clone();
                        let tx = side_tx.clone();
                        tokio::spawn(async move {
                            let _ = tx.send(SideResult::Providers(api.providers().await));
                        });
                    }
                    ChatCommand::Status => request_status(&api, &side_tx),
                    ChatCommand::Help => {
                        for line in HELP.lines() {
                            client.view_mut().notice(line);
                        }
                    }
                    ChatCommand::Quit => break,
                    ChatCommand::Unknown(cmd) => client
                        .view_mut()
                        .notice(&format!("unknown command {cmd}, try /help")),
                }
            }

            Some(result) = side_rx.recv() => {
                show_side_result(&mut client, &mut update_notice, has_token, result)
            }

            _ = &mut ctrl_c => break,
        }

        if client.view_mut().take_status_request() {
            request_status(&api, &side_tx);
        }
    }

    info!("chat session ended");
    Ok(())
}

fn request_status(api: &GatewayApi, tx: &mpsc::UnboundedSender<SideResult>) {
    let api = api.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let _ = tx.send(SideResult::Status(api.status().await));
    });
}

fn show_side_result(
    client: &mut LiveClient<Stdout>,
    update_notice: &mut UpdateNotice,
    has_token: bool,
    result: SideResult,
) {
    match result {
        SideResult::AuthCheck(check) => {
            if needs_token_hint(&check, has_token) {
                for line in TOKEN_HINT {
                    client.view_mut().notice(line);
                }
            }
        }
        SideResult::Status(status) => {
            let view = client.view_mut();
            view.notice(&render_status(&status));
            if let Ok(status) = &status {
                if let Some(notice) = update_notice.check(status) {
                    view.notice(&notice);
                }
            }
        }
        SideResult::Providers(Ok(list)) => {
            let lines = render_providers(&list, client.provider());
            for line in lines {
                client.view_mut().notice(&line);
            }
        }
        SideResult::Providers(Err(e)) => client
            .view_mut()
            .notice(&format!("providers unavailable ({e})")),
    }
}
