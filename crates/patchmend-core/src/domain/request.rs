//! Inputs and raw outputs of the generative path.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::digest::content_digest;
use super::error::ServiceError;

/// Immutable input of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRequest {
    target_path: PathBuf,
    task: String,
    content: String,
}

impl PatchRequest {
    pub fn new(target_path: impl Into<PathBuf>, task: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            target_path: target_path.into(),
            task: task.into(),
            content: content.into(),
        }
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    /// File content as read at the start of the run.
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn content_digest(&self) -> String {
        content_digest(&self.content)
    }
}

/// Raw service response and the body extracted from it, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchCandidate {
    pub raw: String,
    pub body: Option<String>,
}

impl PatchCandidate {
    /// The extracted body, or `MalformedResponse` when extraction failed.
    pub fn require_body(&self) -> std::result::Result<&str, ServiceError> {
        self.body.as_deref().ok_or(ServiceError::MalformedResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_accessors() {
        let req = PatchRequest::new("openlibrary/core/imports.py", "add lookup", "x = 1\n");
        assert_eq!(req.target_path(), Path::new("openlibrary/core/imports.py"));
        assert_eq!(req.task(), "add lookup");
        assert_eq!(req.content_digest(), content_digest("x = 1\n"));
    }

    #[test]
    fn test_absent_body_is_malformed() {
        let candidate = PatchCandidate {
            raw: "Sorry, I cannot help.".into(),
            body: None,
        };
        assert_eq!(candidate.require_body(), Err(ServiceError::MalformedResponse));

        let candidate = PatchCandidate {
            raw: String::new(),
            body: Some("pass".into()),
        };
        assert_eq!(candidate.require_body(), Ok("pass"));
    }
}
