//! Gateway connection management
//!
//! The backend's URL and public key are resolved once at startup, either from
//! settings or from the configuration endpoint served next to the web app, and
//! frozen into a [`GatewayHandle`] shared by every consumer.

use std::sync::Arc;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use url::Url;
use crate::config::{BackendConfig, Settings};
use crate::gateway::Table;
use crate::utils::errors::{EventHubError, Result};

/// Connection parameters of the managed backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(rename = "supabaseUrl")]
    pub url: String,
    #[serde(rename = "supabaseAnonKey")]
    pub anon_key: String,
}

/// Fetch the connection parameters from the configuration endpoint
pub async fn fetch_gateway_config(endpoint: &str, timeout: Duration) -> Result<GatewayConfig> {
    tracing::debug!(endpoint = %endpoint, "Fetching gateway configuration");

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("EventHub/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let response = client.get(endpoint).send().await?;
    if !response.status().is_success() {
        return Err(EventHubError::Config(format!(
            "Configuration endpoint returned HTTP {}",
            response.status()
        )));
    }

    let config: GatewayConfig = response.json().await?;
    if config.url.trim().is_empty() || config.anon_key.trim().is_empty() {
        return Err(EventHubError::Config(
            "Configuration endpoint returned an empty backend url or key".to_string()
        ));
    }

    tracing::info!(url = %config.url, "Gateway configuration fetched");
    Ok(config)
}

/// Use the configured connection parameters, or fetch them from the endpoint
pub async fn resolve_gateway_config(config: &BackendConfig) -> Result<GatewayConfig> {
    match (&config.url, &config.anon_key) {
        (Some(url), Some(anon_key)) => Ok(GatewayConfig {
            url: url.clone(),
            anon_key: anon_key.clone(),
        }),
        _ => {
            fetch_gateway_config(
                &config.config_endpoint,
                Duration::from_secs(config.request_timeout_seconds),
            )
            .await
        }
    }
}

/// Immutable connection handle shared by the REST, realtime and auth clients
///
/// The only mutable part is the bearer token, which follows the session and
/// is observable so open realtime channels can pick up a new one.
#[derive(Debug)]
pub struct GatewayHandle {
    config: GatewayConfig,
    base_url: Url,
    http: reqwest::Client,
    access_token: watch::Sender<Option<String>>,
}

impl GatewayHandle {
    pub fn new(config: GatewayConfig, timeout: Duration) -> Result<Self> {
        let mut base = config.url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("EventHub/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let (access_token, _) = watch::channel(None);
        Ok(Self {
            config,
            base_url,
            http,
            access_token,
        })
    }

    /// One-time initialization performed at application start
    pub async fn connect(settings: &Settings) -> Result<Arc<Self>> {
        let config = resolve_gateway_config(&settings.backend).await?;
        let handle = Self::new(config, Duration::from_secs(settings.backend.request_timeout_seconds))?;
        tracing::info!(url = %handle.base_url, "Gateway handle initialized");
        Ok(Arc::new(handle))
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn anon_key(&self) -> &str {
        &self.config.anon_key
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn rest_url(&self, table: Table) -> Result<Url> {
        Ok(self.base_url.join("rest/v1/")?.join(table.as_str())?)
    }

    pub fn auth_url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join("auth/v1/")?.join(path)?)
    }

    /// Websocket endpoint of the realtime service
    pub fn realtime_url(&self) -> Result<Url> {
        let mut url = self.base_url.join("realtime/v1/websocket")?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| EventHubError::Config(format!("Cannot derive websocket url from {}", self.base_url)))?;
        url.query_pairs_mut()
            .append_pair("apikey", &self.config.anon_key)
            .append_pair("vsn", "1.0.0");
        Ok(url)
    }

    /// Token sent as `Authorization: Bearer`; the public key when signed out
    pub async fn bearer(&self) -> String {
        self.access_token
            .borrow()
            .clone()
            .unwrap_or_else(|| self.config.anon_key.clone())
    }

    pub async fn set_access_token(&self, token: Option<String>) {
        self.access_token.send_if_modified(|current| {
            if *current == token {
                return false;
            }
            *current = token;
            true
        });
    }

    /// Follow session token changes; `None` means the public key applies
    pub fn watch_access_token(&self) -> watch::Receiver<Option<String>> {
        self.access_token.subscribe()
    }
}

/// Check that the backend answers
pub async fn health_check(handle: &GatewayHandle) -> Result<()> {
    let url = handle.auth_url("health")?;
    let response = handle
        .http()
        .get(url)
        .header("apikey", handle.anon_key())
        .send()
        .await?;

    if response.status().is_success() {
        Ok(())
    } else {
        Err(EventHubError::Gateway(crate::utils::errors::GatewayError::Unavailable))
    }
}
