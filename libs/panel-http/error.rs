use reqwest::header::HeaderMap;
use std::time::Duration;
use thiserror::Error;

/// Errors produced by the HTTP client
#[derive(Error, Debug)]
pub enum HttpError {
    /// Transport-level failure (DNS, refused connection, reset)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response; carries the raw response for inspection
    #[error("HTTP {status}: {status_text}")]
    Status {
        status: u16,
        status_text: String,
        headers: HeaderMap,
        body: String,
    },

    /// The client-side timer fired before the response completed
    #[error("request timeout after {}ms", after.as_millis())]
    Timeout { after: Duration },

    /// Cancelled by the caller's signal or by `cancel_all_requests()`
    #[error("request aborted")]
    Aborted,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Interceptor failed: {0}")]
    Interceptor(String),

    #[error("Token storage error: {0}")]
    Storage(String),
}

impl HttpError {
    /// Whether the retry policy may try again
    pub fn is_retryable(&self) -> bool {
        matches!(self, HttpError::Network(_) | HttpError::Status { .. })
    }

    /// Status code of a non-2xx response
    pub fn status(&self) -> Option<u16> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, HttpError::Timeout { .. })
    }

    pub fn interceptor(message: impl Into<String>) -> Self {
        HttpError::Interceptor(message.into())
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            HttpError::InvalidUrl(err.to_string())
        } else {
            HttpError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for HttpError {
    fn from(err: serde_json::Error) -> Self {
        HttpError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HttpError>;
