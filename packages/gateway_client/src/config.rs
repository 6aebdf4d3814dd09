use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::connection::ConnectionOptions;
use crate::error::ClientError;
use crate::session_store::{StateStore, TOKEN_KEY};

// =============================================================================
// File config (figment-deserialized from defaults / config.toml / env vars)
// =============================================================================
//
//   config.toml:     [gateway]
//                    url = "wss://gw.example.com/ws"
//
//   env var:         GWCHAT_GATEWAY__URL=wss://gw.example.com/ws
//
//   (double underscore = nesting, single underscore stays within field names)

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub gateway: GatewayFileConfig,
    #[serde(default)]
    pub thinking: ThinkingFileConfig,
}

/// Connection tunables (lives under `[gateway]` in config.toml).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayFileConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
    /// Timeout for the REST side-channel (status, providers, auth check).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for GatewayFileConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            token: None,
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_message_bytes: default_max_message_bytes(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Busy indicator tunables (lives under `[thinking]`).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThinkingFileConfig {
    #[serde(default = "default_idle_ms")]
    pub idle_ms: u64,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

impl Default for ThinkingFileConfig {
    fn default() -> Self {
        Self {
            idle_ms: default_idle_ms(),
            tick_ms: default_tick_ms(),
        }
    }
}

fn default_url() -> String {
    "ws://127.0.0.1:3888/ws".to_string()
}
fn default_reconnect_delay_ms() -> u64 {
    2000
}
fn default_max_message_bytes() -> usize {
    gateway_protocol::MAX_TEXT_FRAME_BYTES
}
fn default_request_timeout_ms() -> u64 {
    5000
}
fn default_idle_ms() -> u64 {
    1500
}
fn default_tick_ms() -> u64 {
    1000
}

/// Build a figment that layers: defaults → config.toml → GWCHAT_* env vars.
pub fn load_config(data_dir: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(data_dir.join("config.toml")))
        .merge(Env::prefixed("GWCHAT_").split("__"))
}

// =============================================================================
// Runtime settings (derived from FileConfig)
// =============================================================================

#[derive(Clone, Debug)]
pub struct ClientSettings {
    /// WebSocket endpoint, without the token.
    pub gateway_url: Url,
    /// Origin for REST calls, derived from the socket URL.
    pub api_base: Url,
    pub token: Option<String>,
    pub reconnect_delay: Duration,
    pub max_message_bytes: usize,
    pub request_timeout: Duration,
    pub thinking_idle: Duration,
    pub thinking_tick: Duration,
}

impl ClientSettings {
    pub fn from_file(fc: &FileConfig) -> Result<Self, ClientError> {
        let gateway_url = Url::parse(&fc.gateway.url)?;
        let api_base = api_base_for(&gateway_url)?;

        if fc.thinking.tick_ms == 0 {
            return Err(ClientError::Config("thinking.tick_ms must be positive".into()));
        }

        Ok(Self {
            gateway_url,
            api_base,
            token: fc.gateway.token.clone().filter(|t| !t.is_empty()),
            reconnect_delay: Duration::from_millis(fc.gateway.reconnect_delay_ms),
            max_message_bytes: fc.gateway.max_message_bytes,
            request_timeout: Duration::from_millis(fc.gateway.request_timeout_ms),
            thinking_idle: Duration::from_millis(fc.thinking.idle_ms),
            thinking_tick: Duration::from_millis(fc.thinking.tick_ms),
        })
    }

    /// Token to connect with: explicit flag, then config, then the one saved
    /// by `gwchat login`. A hand-edited token file may carry a trailing newline.
    pub fn resolve_token(&self, flag: Option<String>, store: &StateStore) -> Option<String> {
        flag.filter(|t| !t.is_empty())
            .or_else(|| self.token.clone())
            .or_else(|| {
                store
                    .get(TOKEN_KEY)
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
            })
    }

    pub fn connection_options(&self, token: Option<&str>) -> ConnectionOptions {
        ConnectionOptions {
            reconnect_delay: self.reconnect_delay,
            max_message_bytes: self.max_message_bytes,
            ..ConnectionOptions::new(&self.gateway_url, token)
        }
    }
}

/// `ws://host:port/ws` → `http://host:port/`
fn api_base_for(gateway: &Url) -> Result<Url, ClientError> {
    let scheme = match gateway.scheme() {
        "ws" | "http" => "http",
        "wss" | "https" => "https",
        other => {
            return Err(ClientError::Config(format!(
                "unsupported gateway scheme '{other}', expected ws or wss"
            )));
        }
    };
    let mut base = gateway.clone();
    base.set_scheme(scheme)
        .map_err(|_| ClientError::Config(format!("cannot derive api url from {gateway}")))?;
    base.set_path("/");
    base.set_query(None);
    base.set_fragment(None);
    Ok(base)
}

// =============================================================================
// On-disk layout
// =============================================================================

#[derive(Clone, Debug)]
pub struct ClientPaths {
    pub data_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl ClientPaths {
    pub fn new(custom_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = match custom_dir {
            Some(dir) => dir,
            None => dirs::home_dir()
                .context("Could not find home directory")?
                .join(".gwchat"),
        };

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

        let logs_dir = data_dir.join("logs");
        std::fs::create_dir_all(&logs_dir)
            .with_context(|| format!("Failed to create logs directory: {:?}", logs_dir))?;

        info!("Data directory: {}", data_dir.display());

        Ok(Self { data_dir, logs_dir })
    }

    pub fn state_dir(&self) -> PathBuf {
        self.data_dir.join("state")
    }

    pub fn open_state(&self) -> Result<StateStore> {
        StateStore::open(self.state_dir())
            .with_context(|| format!("Failed to open state directory: {:?}", self.state_dir()))
    }

    pub fn config_toml_path(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }

    pub fn chat_log_path(&self) -> PathBuf {
        self.logs_dir.join("gwchat.log")
    }
}
