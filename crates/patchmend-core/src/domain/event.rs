//! Auditable pipeline events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification of an event in the append-only log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// An outbound request to the generative service.
    Request,
    /// A raw response from the generative service.
    Response,
    /// A candidate failed one of the validation gates.
    ValidationFailure,
    /// The pipeline changed mode (service -> fallback, fallback -> failed).
    ModeSwitch,
    /// Content was applied to the target file.
    Applied,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Request => "request",
            EventKind::Response => "response",
            EventKind::ValidationFailure => "validation_failure",
            EventKind::ModeSwitch => "mode_switch",
            EventKind::Applied => "applied",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single record in the event log. Never rewritten once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// When the event occurred (UTC).
    pub timestamp: DateTime<Utc>,

    /// Event classification.
    pub kind: EventKind,

    /// Event-specific payload. Always carries `run_id`.
    pub payload: serde_json::Value,
}

impl Event {
    /// Create a new event stamped with the current time.
    pub fn new(kind: EventKind, payload: serde_json::Value) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            payload,
        }
    }

    /// `run_id` from the payload, if present.
    pub fn run_id(&self) -> Option<&str> {
        self.payload.get("run_id").and_then(|v| v.as_str())
    }
}
