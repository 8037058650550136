//! Error types for slack-notify-core

use thiserror::Error;

/// Errors from a single attempt to post a message.
///
/// Every variant is retried identically by [`crate::delivery::deliver`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// Transport-level failure (DNS, connect, TLS, timeout)
    #[error("request failed: {0}")]
    Request(String),

    /// Endpoint answered with a non-success HTTP status
    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    /// Slack answered `ok: false`
    #[error("slack API error: {0}")]
    Api(String),

    /// Response body could not be decoded
    #[error("invalid response: {0}")]
    Response(String),
}

impl From<reqwest::Error> for NotifyError {
    /// Keeps the full cause chain but drops the request URL, which for
    /// incoming webhooks is itself the credential.
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        let mut message = err.to_string();
        let mut cause = std::error::Error::source(&err);
        while let Some(inner) = cause {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            cause = inner.source();
        }
        NotifyError::Request(message)
    }
}

/// Errors that fail a whole resource invocation.
#[derive(Error, Debug)]
pub enum ResourceError {
    #[error("invalid JSON request: {0}")]
    InvalidRequest(serde_json::Error),

    #[error("invalid JSON response: {0}")]
    InvalidResponse(serde_json::Error),

    #[error("usage: {0}")]
    Usage(&'static str),

    #[error("unexpected command {0:?}; must be check, in, out")]
    UnknownVerb(String),

    #[error("failed to create HTTP client: {0}")]
    Client(NotifyError),

    #[error("failed to post message after {attempts} attempt(s): {last_error}")]
    DeliveryFailed {
        attempts: u32,
        last_error: NotifyError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type for resource operations.
pub type Result<T> = std::result::Result<T, ResourceError>;
