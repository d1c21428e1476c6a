//! Generative patch client.
//!
//! Builds a rewrite prompt from the current file and the task, calls the
//! completion capability with a bounded retry budget, and extracts the
//! first fenced source block from the reply. Requests and raw responses are
//! recorded before anything looks at their content.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use patchmend_llm::CompletionApi;
use regex::Regex;
use serde_json::json;
use tracing::warn;

use crate::config::ServiceConfig;
use crate::domain::{EventKind, PatchCandidate, PatchRequest, ServiceError};
use crate::event_log::EventRecorder;
use crate::metrics::METRICS;
use crate::obs;

/// Language tag the prompt asks for and extraction looks for.
pub const CODE_FENCE_TAG: &str = "python";

/// Something that can turn a [`PatchRequest`] into a [`PatchCandidate`].
///
/// The orchestrator only sees this seam, so the real client and scripted
/// doubles are interchangeable.
#[async_trait]
pub trait PatchService: Send + Sync {
    async fn request(
        &self,
        request: &PatchRequest,
        recorder: &EventRecorder,
    ) -> Result<PatchCandidate, ServiceError>;
}

/// Rewrite prompt for `request`.
pub fn build_prompt(request: &PatchRequest) -> String {
    format!(
        "You are an expert Python Developer.\n\
         The file {path} needs a refactor.\n\
         CURRENT CODE:\n\
         ```{tag}\n{code}\n```\n\
         TASK:\n{task}\n\
         INSTRUCTIONS:\n\
         - Return ONLY the full valid python code for the modified file.\n\
         - Do not omit or abbreviate any existing code.\n\
         - Wrap the code in ```{tag} ... ``` blocks.\n",
        path = request.target_path().display(),
        tag = CODE_FENCE_TAG,
        code = request.content(),
        task = request.task(),
    )
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:python|py)[ \t]*\r?\n(.*?)```").expect("static fence pattern")
    })
}

/// Inner text of the first ```python (or ```py) block, trimmed.
pub fn extract_code_block(response: &str) -> Option<String> {
    fence_regex()
        .captures(response)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// [`PatchService`] backed by a [`CompletionApi`].
pub struct GenerativePatchClient {
    api: Arc<dyn CompletionApi>,
    config: ServiceConfig,
}

impl GenerativePatchClient {
    pub fn new(api: Arc<dyn CompletionApi>, config: ServiceConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        Duration::from_millis(self.config.backoff_base_ms.saturating_mul(factor))
    }
}

#[async_trait]
impl PatchService for GenerativePatchClient {
    async fn request(
        &self,
        request: &PatchRequest,
        recorder: &EventRecorder,
    ) -> Result<PatchCandidate, ServiceError> {
        let prompt = build_prompt(request);
        let max_attempts = self.config.max_attempts.max(1);
        let model = self.config.model.as_str();

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            recorder.record(
                EventKind::Request,
                json!({
                    "attempt": attempt,
                    "model": model,
                    "max_tokens": self.config.max_tokens,
                    "target": request.target_path().display().to_string(),
                    "task": request.task(),
                    "content_digest": request.content_digest(),
                    "content_bytes": request.content().len(),
                }),
            );
            METRICS.inc_service_attempts();
            obs::emit_service_attempt(recorder.run_id(), model, attempt, max_attempts);

            match self.api.complete(model, &prompt, self.config.max_tokens).await {
                Ok(raw) => {
                    let body = extract_code_block(&raw);
                    recorder.record(
                        EventKind::Response,
                        json!({
                            "attempt": attempt,
                            "raw": raw,
                            "extracted": body.is_some(),
                        }),
                    );
                    return Ok(PatchCandidate { raw, body });
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let delay = self.backoff(attempt);
                    warn!(
                        run_id = %recorder.run_id(),
                        error = %err,
                        "request failed (attempt {}/{}), retrying in {:?}",
                        attempt,
                        max_attempts,
                        delay
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(err) => return Err(ServiceError::from_llm(err, attempt)),
            }
        }
    }
}
