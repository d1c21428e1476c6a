//! Domain-level error taxonomy for patchmend.

use patchmend_llm::{ErrorClass, LlmError};

/// Failures on the generative path. All of them are recovered by falling
/// back to the deterministic patcher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("generative service unavailable: {0}")]
    Unavailable(String),

    #[error("generative service disabled")]
    Disabled,

    #[error("transport error after {attempts} attempt(s): {message}")]
    Transport { attempts: u32, message: String },

    #[error("model not found: {0}")]
    ModelNotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("malformed response: no fenced code block found")]
    MalformedResponse,

    #[error("service attempt timed out after {secs}s")]
    Timeout { secs: u64 },
}

impl ServiceError {
    /// Stable identifier recorded as the `trigger` of a `mode_switch` event.
    pub fn trigger(&self) -> &'static str {
        match self {
            ServiceError::Unavailable(_) => "service_unavailable",
            ServiceError::Disabled => "service_disabled",
            ServiceError::Transport { .. } => "transport_error",
            ServiceError::ModelNotFound(_) => "model_not_found",
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::MalformedResponse => "malformed_response",
            ServiceError::Timeout { .. } => "timeout",
        }
    }

    /// Convert a client error observed on attempt number `attempts`.
    pub fn from_llm(err: LlmError, attempts: u32) -> Self {
        match err {
            LlmError::MissingCredential(var) => {
                ServiceError::Unavailable(format!("credential {var} is missing"))
            }
            other => match other.class() {
                ErrorClass::NotFound => ServiceError::ModelNotFound(other.to_string()),
                ErrorClass::BadRequest => ServiceError::BadRequest(other.to_string()),
                ErrorClass::Other => ServiceError::Transport {
                    attempts,
                    message: other.to_string(),
                },
            },
        }
    }
}

impl From<LlmError> for ServiceError {
    fn from(err: LlmError) -> Self {
        ServiceError::from_llm(err, 1)
    }
}

/// patchmend domain errors.
#[derive(Debug, thiserror::Error)]
pub enum PatchmendError {
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("service error: {0}")]
    Service(#[from] ServiceError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for patchmend domain operations.
pub type Result<T> = std::result::Result<T, PatchmendError>;
