//! `gwchat providers` subcommands: list, select, activate.

use anyhow::{Context, Result};

use gateway_client::ClientError;
use gateway_client::config::ClientSettings;
use gateway_client::session_store::{PROVIDER_KEY, StateStore};
use gateway_protocol::rest::{ActivateProviderRequest, ProvidersResponse};

use super::api_for;

/// One line per provider. `selected` is the provider this client sends with.
pub fn render_providers(list: &ProvidersResponse, selected: Option<&str>) -> Vec<String> {
    if list.providers.is_empty() {
        return vec!["no providers configured on the gateway".to_string()];
    }
    list.providers
        .iter()
        .map(|p| {
            let marker = if selected == Some(p.id.as_str()) { '>' } else { ' ' };
            let mut line = format!("{marker} {}", p.id);
            if !p.display_name.is_empty() && p.display_name != p.id {
                line.push_str(&format!(" ({})", p.display_name));
            }
            let mut tags = Vec::new();
            if p.active {
                tags.push("active");
            }
            if p.is_default {
                tags.push("default");
            }
            if p.needs_api_key {
                tags.push("needs api key");
            }
            if !tags.is_empty() {
                line.push_str(&format!(" [{}]", tags.join(", ")));
            }
            line
        })
        .collect()
}

pub async fn list_command(
    settings: &ClientSettings,
    token: Option<String>,
    store: &StateStore,
) -> Result<()> {
    let api = api_for(settings, token)?;
    match api.providers().await {
        Ok(list) => {
            let selected = store.get(PROVIDER_KEY);
            for line in render_providers(&list, selected.as_deref()) {
                println!("{}", line);
            }
            Ok(())
        }
        Err(ClientError::Unavailable) => {
            eprintln!("Gateway unavailable at {}", settings.api_base);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

pub fn select_command(store: &StateStore, id: Option<String>) -> Result<()> {
    match id {
        Some(id) => {
            store
                .set(PROVIDER_KEY, &id)
                .context("Failed to save provider choice")?;
            eprintln!("Chat messages will use provider {}", id);
        }
        None => {
            store
                .remove(PROVIDER_KEY)
                .context("Failed to clear provider choice")?;
            eprintln!("Chat messages will use the gateway's default provider");
        }
    }
    Ok(())
}

pub async fn activate_command(
    settings: &ClientSettings,
    token: Option<String>,
    id: String,
    api_key: Option<String>,
    set_default: bool,
) -> Result<()> {
    let api = api_for(settings, token)?;
    let req = ActivateProviderRequest {
        provider: id,
        api_key,
        set_default,
    };
    api.activate_provider(&req)
        .await
        .with_context(|| format!("Failed to activate provider {}", req.provider))?;
    eprintln!(
        "Activated {}{}",
        req.provider,
        if set_default { " as the default provider" } else { "" }
    );
    Ok(())
}
