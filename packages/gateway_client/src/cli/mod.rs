pub mod chat;
pub mod providers;

use anyhow::{Context, Result};

use gateway_client::GatewayApi;
use gateway_client::config::ClientSettings;
use gateway_client::runtime::{UpdateNotice, render_status};
use gateway_client::session_store::{SESSION_KEY, StateStore, TOKEN_KEY};

pub(crate) fn api_for(settings: &ClientSettings, token: Option<String>) -> Result<GatewayApi> {
    GatewayApi::new(settings.api_base.clone(), token, settings.request_timeout)
        .context("Failed to build HTTP client")
}

/// One-shot status query. An unreachable gateway is reported, not an error.
pub async fn status_command(settings: &ClientSettings, token: Option<String>) -> Result<()> {
    let api = api_for(settings, token)?;
    let result = api.status().await;
    println!("{}", render_status(&result));
    if let Ok(status) = &result {
        if let Some(notice) = UpdateNotice::default().check(status) {
            println!("{}", notice);
        }
    }
    Ok(())
}

pub fn login_command(store: &StateStore, token: &str) -> Result<()> {
    let token = token.trim();
    if token.is_empty() {
        anyhow::bail!("token must not be empty");
    }
    store
        .set(TOKEN_KEY, token)
        .context("Failed to save access token")?;
    eprintln!("Token saved to {}", store.path(TOKEN_KEY).display());
    Ok(())
}

pub fn logout_command(store: &StateStore) -> Result<()> {
    store
        .remove(TOKEN_KEY)
        .context("Failed to remove access token")?;
    eprintln!("Token removed");
    Ok(())
}

pub fn forget_command(store: &StateStore) -> Result<()> {
    store
        .remove(SESSION_KEY)
        .context("Failed to remove session")?;
    eprintln!("Session forgotten; the next chat starts fresh");
    Ok(())
}
