//! patchmend core library
//!
//! Attempt a generative rewrite of one source file, gate it through
//! validation, and fall back to a deterministic, idempotent patch when the
//! service path fails. Every transition lands in an append-only event log.

pub mod client;
pub mod config;
pub mod domain;
pub mod event_log;
pub mod fakes;
pub mod metrics;
pub mod obs;
pub mod orchestrator;
pub mod patcher;
pub mod pattern;
pub mod report;
pub mod source_file;
pub mod telemetry;
pub mod validator;

pub use client::{build_prompt, extract_code_block, GenerativePatchClient, PatchService};
pub use config::{PipelineConfig, ServiceConfig};
pub use domain::{
    content_digest, Degradation, Event, EventKind, Gate, PatchCandidate, PatchOutcome,
    PatchRequest, PatchRun, PatchmendError, Result, ServiceError, ValidationResult,
};
pub use event_log::{EventLog, EventRecorder, JsonlEventLog};
pub use metrics::METRICS;
pub use orchestrator::{Orchestrator, ServiceHandle};
pub use patcher::{lookup_keys, DeterministicPatcher, PatchTemplate, PatchedContent};
pub use pattern::TextPattern;
pub use report::{render_summary, summarize, summarize_file, EventLogSummary, RunSummary};
pub use source_file::{FsSourceFile, SourceFile};
pub use telemetry::init_tracing;
pub use validator::{PatchValidator, ValidationRules};

/// Crate version, reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
