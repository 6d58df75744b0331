//! Client error types.

use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Service returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The service answered, but with nothing usable (empty or unparsable content)
    #[error("Unusable content: {0}")]
    UnusableContent(String),

    /// Returned bytes are not a valid image or video
    #[error("Invalid media: {0}")]
    InvalidMedia(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ClientError {
    pub fn http(status: reqwest::StatusCode, body: impl Into<String>) -> Self {
        Self::Http {
            status: status.as_u16(),
            body: body.into(),
        }
    }

    pub fn unusable(message: impl Into<String>) -> Self {
        Self::UnusableContent(message.into())
    }

    pub fn invalid_media(message: impl Into<String>) -> Self {
        Self::InvalidMedia(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether the same request may succeed if sent again.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Http { status, .. } => *status == 429 || *status >= 500,
            ClientError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ClientError::Timeout(_) => true,
            _ => false,
        }
    }
}
