//! Contract with the remote polishing service.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::PolishResult;

/// Failure of a single polish request.
///
/// No variant is retried by the polisher; the session surfaces all of them
/// the same way.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// Connection refused, reset, DNS failure and similar transport trouble.
    #[error("network error: {0}")]
    Network(String),

    /// The transport's connect or request timeout elapsed.
    #[error("request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The body could not be decoded as a polish response.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The configured endpoint is not a usable URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Performs one request/response exchange with the polishing service.
///
/// Callers must pass non-blank text; implementations do not check it. The
/// returned `original` is whatever the service echoed back.
#[async_trait]
pub trait RemotePolisher: Send + Sync {
    async fn polish(&self, text: &str) -> Result<PolishResult, RemoteError>;
}

/// Type alias for a shared polisher reference.
pub type RemotePolisherRef = Arc<dyn RemotePolisher>;
