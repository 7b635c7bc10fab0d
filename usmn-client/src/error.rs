//! Client error types
//!
//! Non-2xx responses are mapped by status; the server's `message` is kept
//! when the body parses as an API error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure (connect, TLS, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// 2xx body that does not describe a successful read
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// 401: admin token missing or rejected
    #[error("Admin token missing or rejected")]
    Unauthorized,

    /// 404: base URL does not point at a settings service
    #[error("Not found: {0}")]
    NotFound(String),

    /// 409: settings were saved by someone else since they were loaded
    #[error("Settings conflict: {0}")]
    Conflict(String),

    /// 400/422: body rejected (malformed JSON, unsupported value shape)
    #[error("Rejected update: {0}")]
    Validation(String),

    /// 503: settings backend timed out, safe to retry
    #[error("Settings service unavailable: {0}")]
    Unavailable(String),

    /// Any other failure status
    #[error("Server error: {0}")]
    Internal(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Worth retrying without changing the request
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Http(_))
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
