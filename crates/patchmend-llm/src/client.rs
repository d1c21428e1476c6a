//! Messages API client
//!
//! Thin `reqwest` wrapper. Each [`CompletionApi::complete`] call issues
//! exactly one HTTP request and classifies the failure, leaving retry
//! decisions to the pipeline.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LlmError;
use crate::types::{MessageRequest, MessageResponse};
use crate::{CompletionApi, Result};

/// Default model identifier used by the patch pipeline.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Messages API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// API base URL (no trailing slash)
    pub base_url: String,
    /// API key
    #[serde(skip_serializing)]
    pub api_key: String,
    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,
}

impl AnthropicConfig {
    /// Config for an explicit key against the public endpoint
    pub fn new(api_key: &str) -> Self {
        AnthropicConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.trim().to_string(),
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
        }
    }

    /// Read the key from environment variable `var`.
    ///
    /// A missing or blank variable is a configuration problem, reported as
    /// [`LlmError::MissingCredential`].
    pub fn from_env(var: &str) -> Result<Self> {
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(&key)),
            _ => Err(LlmError::MissingCredential(var.to_string())),
        }
    }

    /// Point at a different endpoint (proxies, tests)
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Override the per-request timeout
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Masked key for diagnostics: first 8 and last 4 characters.
    pub fn masked_key(&self) -> String {
        let key = &self.api_key;
        if key.len() <= 12 || !key.is_ascii() {
            return "****".to_string();
        }
        format!("{}...{}", &key[..8], &key[key.len() - 4..])
    }
}

/// Client for the messages endpoint
pub struct AnthropicClient {
    config: AnthropicConfig,
    http_client: reqwest::Client,
}

impl AnthropicClient {
    /// Create a new client
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("patchmend-llm/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(AnthropicClient {
            config,
            http_client,
        })
    }

    /// Create client from environment variable `var`
    pub fn from_env(var: &str) -> Result<Self> {
        Self::new(AnthropicConfig::from_env(var)?)
    }

    pub fn config(&self) -> &AnthropicConfig {
        &self.config
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.base_url)
    }
}

/// Map a non-success status to the error taxonomy.
pub(crate) fn classify_status(status: StatusCode, model: &str, body: String) -> LlmError {
    match status {
        StatusCode::NOT_FOUND => LlmError::NotFound {
            model: model.to_string(),
            body,
        },
        StatusCode::BAD_REQUEST => LlmError::BadRequest(body),
        other => LlmError::Api {
            status: other.as_u16(),
            body,
        },
    }
}

#[async_trait]
impl CompletionApi for AnthropicClient {
    async fn complete(&self, model: &str, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = MessageRequest::user(model, prompt, max_tokens);
        debug!(model = %model, max_tokens, prompt_bytes = prompt.len(), "sending messages request");

        let response = self
            .http_client
            .post(self.messages_url())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, model, body));
        }

        let body = response.text().await?;
        let parsed: MessageResponse = serde_json::from_str(&body)?;
        debug!(
            model = %parsed.model,
            stop_reason = ?parsed.stop_reason,
            "received messages response"
        );
        Ok(parsed.text())
    }
}
