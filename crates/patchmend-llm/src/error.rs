//! Error types for patchmend-llm

use thiserror::Error;

/// Coarse classification of a service failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The model identifier is unknown to the service.
    NotFound,
    /// The request itself was rejected as malformed.
    BadRequest,
    /// Transport, auth, rate-limit and anything else.
    Other,
}

/// Errors that can occur talking to the generative service
#[derive(Error, Debug)]
pub enum LlmError {
    /// Credential environment variable is unset or blank
    #[error("credential {0} is missing")]
    MissingCredential(String),

    /// Unknown model identifier (HTTP 404)
    #[error("model not found: {model}")]
    NotFound { model: String, body: String },

    /// Malformed request (HTTP 400)
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Any other non-success status
    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response body could not be decoded
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Classify into the three buckets the pipeline distinguishes.
    pub fn class(&self) -> ErrorClass {
        match self {
            LlmError::NotFound { .. } => ErrorClass::NotFound,
            LlmError::BadRequest(_) => ErrorClass::BadRequest,
            _ => ErrorClass::Other,
        }
    }

    /// Whether repeating the identical call could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::MissingCredential(_) => false,
            other => other.class() == ErrorClass::Other,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Http(err.to_string())
    }
}
