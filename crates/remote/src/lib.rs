//! HTTP client for the idiom polishing service.
//!
//! One `POST {base_url}/polish` per call, JSON in and out. Timeouts live in
//! the client configuration; the polisher itself never retries.

mod config;

use async_trait::async_trait;
use polisher_core::{PolishRequest, PolishResponse, PolishResult, RemoteError, RemotePolisher};
use reqwest::Url;

pub use config::RemoteConfig;

/// Longest error body kept in `RemoteError::Status`.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Stands in for an error body that could not be read.
const UNREADABLE_BODY: &str = "<unreadable body>";

/// `RemotePolisher` backed by reqwest.
pub struct HttpPolisher {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpPolisher {
    pub fn new(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let endpoint = config.endpoint()?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;

        tracing::debug!(%endpoint, "Polishing client configured");
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl RemotePolisher for HttpPolisher {
    async fn polish(&self, text: &str) -> Result<PolishResult, RemoteError> {
        tracing::info!(chars = text.chars().count(), "Sending polish request");

        let resp = self
            .client
            .post(self.endpoint.clone())
            .json(&PolishRequest {
                text: text.to_string(),
            })
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            let body = match resp.text().await {
                Ok(body) => body,
                Err(e) => {
                    tracing::debug!(error = %e, "Failed to read error body");
                    UNREADABLE_BODY.to_string()
                }
            };
            tracing::warn!(status = status.as_u16(), "Polish request rejected");
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body: truncate_chars(body.trim(), MAX_ERROR_BODY_CHARS),
            });
        }

        let bytes = resp.bytes().await.map_err(transport_error)?;
        let response: PolishResponse = serde_json::from_slice(&bytes)
            .map_err(|e| RemoteError::MalformedResponse(e.to_string()))?;

        tracing::debug!(idiom = %response.idiom, alternatives = response.alternatives.len(), "Polish response received");
        Ok(response.into())
    }
}

fn transport_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else if e.is_decode() {
        RemoteError::MalformedResponse(e.to_string())
    } else {
        RemoteError::Network(e.to_string())
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
