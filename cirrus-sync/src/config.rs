use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Connection settings for the backend's REST API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Scheme and host, e.g. `https://mbaas.api.nifcloud.com`.
    pub base_url: String,
    /// API version path segment.
    pub api_version: String,
    /// Request timeout (ms). Expiry surfaces as a transport error.
    pub timeout_ms: u64,
    /// Headers added to every request (application keys, signatures).
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://mbaas.api.nifcloud.com".to_string(),
            api_version: "2013-09-01".to_string(),
            timeout_ms: 10_000,
            default_headers: BTreeMap::new(),
        }
    }
}

impl ClientConfig {
    /// Builds the absolute URL for an API path.
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.api_version.trim_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
