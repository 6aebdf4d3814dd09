//! REST response shapes for the gateway's ambient endpoints.
//!
//! Every field defaults so that partial bodies from older gateways decode.

use serde::{Deserialize, Serialize};

pub const STATUS_PATH: &str = "/api/status";
pub const PROVIDERS_PATH: &str = "/api/providers";
pub const AUTH_CHECK_PATH: &str = "/api/auth-check";

/// `GET /api/status`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub sessions: u64,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub latest_version: Option<String>,
}

impl StatusResponse {
    /// The newer version to advertise, if the gateway reports one that differs
    /// from what it runs.
    pub fn update_available(&self) -> Option<&str> {
        match (self.version.as_deref(), self.latest_version.as_deref()) {
            (Some(current), Some(latest)) if !latest.is_empty() && latest != current => {
                Some(latest)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub needs_api_key: bool,
}

/// `GET /api/providers`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvidersResponse {
    #[serde(default)]
    pub providers: Vec<ProviderInfo>,
}

/// `POST /api/providers` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivateProviderRequest {
    pub provider: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub set_default: bool,
}

/// `GET /api/auth-check`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthCheckResponse {
    #[serde(default)]
    pub auth_required: bool,
}
