use std::time::Duration;

use polisher_core::RemoteError;
use reqwest::Url;
use serde::Deserialize;

/// Transport settings for the polishing service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Service root, e.g. `http://127.0.0.1:5000`.
    pub base_url: String,
    /// Path joined onto `base_url`.
    pub endpoint_path: String,
    pub connect_timeout_ms: u64,
    /// Whole-request bound covering send and receive.
    pub request_timeout_ms: u64,
    pub user_agent: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            endpoint_path: "/polish".to_string(),
            connect_timeout_ms: 60_000,
            request_timeout_ms: 60_000,
            user_agent: concat!("polisher/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl RemoteConfig {
    pub fn endpoint(&self) -> Result<Url, RemoteError> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| RemoteError::InvalidEndpoint(format!("{}: {e}", self.base_url)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(RemoteError::InvalidEndpoint(format!(
                "{}: unsupported scheme",
                self.base_url
            )));
        }
        base.join(&self.endpoint_path)
            .map_err(|e| RemoteError::InvalidEndpoint(format!("{}: {e}", self.endpoint_path)))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
