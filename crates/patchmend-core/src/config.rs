//! Pipeline configuration.
//!
//! Defaults reproduce the single known target: the import-queue module and
//! its staged/pending lookup. A TOML file may override any field; the CLI
//! layers its flags on top.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{PatchmendError, Result};
use crate::patcher::PatchTemplate;
use crate::validator::ValidationRules;

pub const DEFAULT_TARGET_PATH: &str = "openlibrary/core/imports.py";
pub const DEFAULT_EVENT_LOG_PATH: &str = "/tmp/agent.log";
pub const DEFAULT_API_KEY_ENV: &str = "CLAUDE_API_KEY";
pub const DEFAULT_TASK: &str = "Refactor openlibrary/core/imports.py to add STAGED_SOURCES = (\"amazon\", \"idb\") \
and a static method find_staged_or_pending(identifiers, sources=STAGED_SOURCES) \
that returns a db.select query using \"ia_id in $ids\".";

/// Generative service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Model identifier sent with every request.
    pub model: String,
    /// Maximum output size of one response.
    pub max_tokens: u32,
    /// Total calls allowed for retryable failures (1 = no retry).
    pub max_attempts: u32,
    /// Base delay of the exponential backoff between attempts; 0 disables it.
    pub backoff_base_ms: u64,
    /// Wall-clock budget for the whole service attempt, retries included.
    pub timeout_secs: u64,
    /// Environment variable holding the credential.
    pub api_key_env: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model: patchmend_llm::DEFAULT_MODEL.to_string(),
            max_tokens: 4096,
            max_attempts: 3,
            backoff_base_ms: 500,
            timeout_secs: 120,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

/// Complete configuration of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub target_path: PathBuf,
    pub task: String,
    pub event_log_path: PathBuf,
    /// Post-run syntax checker argv; the target path is appended.
    pub syntax_check: Vec<String>,
    pub service: ServiceConfig,
    pub validation: ValidationRules,
    pub patch: PatchTemplate,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_path: PathBuf::from(DEFAULT_TARGET_PATH),
            task: DEFAULT_TASK.to_string(),
            event_log_path: PathBuf::from(DEFAULT_EVENT_LOG_PATH),
            syntax_check: vec![
                "python3".to_string(),
                "-m".to_string(),
                "py_compile".to_string(),
            ],
            service: ServiceConfig::default(),
            validation: ValidationRules::default(),
            patch: PatchTemplate::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse from TOML text; missing fields take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: PipelineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Load `path` when given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.service.max_attempts == 0 {
            return Err(PatchmendError::Config(
                "service.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.service.timeout_secs == 0 {
            return Err(PatchmendError::Config(
                "service.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.task.trim().is_empty() {
            return Err(PatchmendError::Config("task must not be empty".to_string()));
        }
        self.validation.validate()?;
        self.patch.validate()?;
        Ok(())
    }
}
