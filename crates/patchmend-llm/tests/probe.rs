//! Model probing against a scripted completion double.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use patchmend_llm::{probe_models, CompletionApi, LlmError, ProbeStatus, DEFAULT_CANDIDATES};

/// Answers per model; unknown models are treated as 404.
struct ByModel {
    available: Vec<&'static str>,
    bad_request: Vec<&'static str>,
    calls: Mutex<HashMap<String, u32>>,
}

impl ByModel {
    fn new(available: Vec<&'static str>, bad_request: Vec<&'static str>) -> Self {
        Self {
            available,
            bad_request,
            calls: Mutex::new(HashMap::new()),
        }
    }

    fn calls_for(&self, model: &str) -> u32 {
        self.calls.lock().unwrap().get(model).copied().unwrap_or(0)
    }
}

#[async_trait]
impl CompletionApi for ByModel {
    async fn complete(&self, model: &str, _prompt: &str, max_tokens: u32) -> patchmend_llm::Result<String> {
        assert_eq!(max_tokens, 5);
        *self.calls.lock().unwrap().entry(model.to_string()).or_insert(0) += 1;
        if self.available.contains(&model) {
            Ok("Hello".to_string())
        } else if self.bad_request.contains(&model) {
            Err(LlmError::BadRequest("invalid model parameter".to_string()))
        } else {
            Err(LlmError::NotFound {
                model: model.to_string(),
                body: String::new(),
            })
        }
    }
}

#[tokio::test]
async fn first_available_model_wins_and_stops_the_hunt() {
    let api = ByModel::new(vec!["claude-3-opus-20240229", "claude-2.1"], vec![]);
    let report = probe_models(&api, DEFAULT_CANDIDATES).await;

    assert_eq!(report.winner.as_deref(), Some("claude-3-opus-20240229"));
    let last = report.probes.last().unwrap();
    assert_eq!(last.status, ProbeStatus::Available);
    assert!(report.probes[..report.probes.len() - 1]
        .iter()
        .all(|p| p.status == ProbeStatus::NotFound));
    assert_eq!(api.calls_for("claude-2.1"), 0);
}

#[tokio::test]
async fn bad_request_is_recorded_and_hunt_continues() {
    let api = ByModel::new(vec!["beta"], vec!["alpha"]);
    let report = probe_models(&api, &["alpha", "beta"]).await;

    assert!(matches!(report.probes[0].status, ProbeStatus::BadRequest(_)));
    assert_eq!(report.probes[1].status, ProbeStatus::Available);
    assert_eq!(report.winner.as_deref(), Some("beta"));
}

#[tokio::test]
async fn no_working_model_reports_no_winner() {
    let api = ByModel::new(vec![], vec![]);
    let candidates = vec!["a".to_string(), "b".to_string()];
    let report = probe_models(&api, &candidates).await;

    assert!(report.winner.is_none());
    assert_eq!(report.probes.len(), 2);
}
