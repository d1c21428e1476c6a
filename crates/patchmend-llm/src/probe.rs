//! Model availability probing
//!
//! Walks a candidate list of model identifiers with a minimal request and
//! stops at the first one the credential can actually use.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ErrorClass;
use crate::CompletionApi;

/// Candidates tried when no explicit list is given, newest first.
pub const DEFAULT_CANDIDATES: &[&str] = &[
    crate::client::DEFAULT_MODEL,
    "claude-3-5-sonnet-20241022",
    "claude-3-5-sonnet-20240620",
    "claude-3-5-haiku-20241022",
    "claude-3-opus-20240229",
    "claude-3-sonnet-20240229",
    "claude-3-haiku-20240307",
    "claude-2.1",
    "claude-2.0",
    "claude-instant-1.2",
];

const PROBE_PROMPT: &str = "Hi";
const PROBE_MAX_TOKENS: u32 = 5;

/// Outcome of probing one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum ProbeStatus {
    Available,
    NotFound,
    BadRequest(String),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelProbe {
    pub model: String,
    pub status: ProbeStatus,
}

/// Ordered probe results plus the first available model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub probes: Vec<ModelProbe>,
    pub winner: Option<String>,
}

/// Probe `candidates` in order, stopping at the first available model.
pub async fn probe_models<S: AsRef<str>>(api: &dyn CompletionApi, candidates: &[S]) -> ProbeReport {
    let mut probes = Vec::new();

    for candidate in candidates {
        let model = candidate.as_ref();
        let status = match api.complete(model, PROBE_PROMPT, PROBE_MAX_TOKENS).await {
            Ok(_) => ProbeStatus::Available,
            Err(err) => match err.class() {
                ErrorClass::NotFound => ProbeStatus::NotFound,
                ErrorClass::BadRequest => ProbeStatus::BadRequest(err.to_string()),
                ErrorClass::Other => ProbeStatus::Error(err.to_string()),
            },
        };

        let available = status == ProbeStatus::Available;
        if available {
            info!(model = %model, "model available");
        } else {
            warn!(model = %model, status = ?status, "model unavailable");
        }
        probes.push(ModelProbe {
            model: model.to_string(),
            status,
        });

        if available {
            return ProbeReport {
                probes,
                winner: Some(model.to_string()),
            };
        }
    }

    ProbeReport {
        probes,
        winner: None,
    }
}
