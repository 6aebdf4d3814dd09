//! REST side-channel to the gateway: status, providers, auth check.
//!
//! None of this is needed to chat. Callers treat [`ClientError::Unavailable`]
//! as "show a placeholder" rather than as a failure.

use std::time::Duration;

use gateway_protocol::rest::{
    AUTH_CHECK_PATH, ActivateProviderRequest, AuthCheckResponse, PROVIDERS_PATH, ProvidersResponse,
    STATUS_PATH, StatusResponse,
};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::{ClientError, Result};

#[derive(Debug, Clone)]
pub struct GatewayApi {
    http: reqwest::Client,
    base: Url,
    token: Option<String>,
}

impl GatewayApi {
    pub fn new(base: Url, token: Option<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ClientError::from_reqwest)?;
        Ok(Self { http, base, token })
    }

    pub async fn status(&self) -> Result<StatusResponse> {
        self.get_json(STATUS_PATH).await
    }

    pub async fn providers(&self) -> Result<ProvidersResponse> {
        self.get_json(PROVIDERS_PATH).await
    }

    pub async fn auth_check(&self) -> Result<AuthCheckResponse> {
        self.get_json(AUTH_CHECK_PATH).await
    }

    pub async fn activate_provider(&self, req: &ActivateProviderRequest) -> Result<()> {
        let url = self.base.join(PROVIDERS_PATH)?;
        let resp = self
            .authorized(self.http.post(url))
            .json(req)
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;
        check_status(PROVIDERS_PATH, &resp)?;
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base.join(path)?;
        debug!(%url, "gateway api request");
        let resp = self
            .authorized(self.http.get(url))
            .send()
            .await
            .map_err(ClientError::from_reqwest)?;
        check_status(path, &resp)?;
        resp.json().await.map_err(ClientError::from_reqwest)
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

fn check_status(path: &str, resp: &reqwest::Response) -> Result<()> {
    let status = resp.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(ClientError::Api(format!("{path} returned {status}")))
    }
}
