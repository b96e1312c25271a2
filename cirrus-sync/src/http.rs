//! HTTP transport backed by `reqwest`.

use crate::config::ClientConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::{Method, Transport, TransportResponse};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::debug;

/// Sends JSON requests to the backend's REST API.
pub struct HttpTransport {
    config: ClientConfig,
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with the config's timeout applied to every request.
    pub fn new(config: ClientConfig) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| SyncError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn perform_request(
        &self,
        method: Method,
        path: &str,
        body: Option<JsonValue>,
    ) -> SyncResult<TransportResponse> {
        let url = self.config.url_for(path);
        debug!("{} {}", method.as_str(), url);

        let mut request = self
            .client
            .request(method.into(), &url)
            .header("Content-Type", "application/json");
        for (name, value) in &self.config.default_headers {
            request = request.header(name, value);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                SyncError::Transport(format!("request timed out: {url}"))
            } else {
                SyncError::Transport(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        debug!("{} {} -> {}", method.as_str(), url, status);

        let body = if bytes.iter().all(u8::is_ascii_whitespace) {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes)?
        };

        Ok(TransportResponse::new(status, body))
    }
}
