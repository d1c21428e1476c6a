//! Observability tests for the patch run lifecycle.
//!
//! These verify that the tracing hooks can be emitted under a subscriber
//! from outside the crate and that a full run emits through them. Field
//! content is asserted by the unit tests in `obs.rs`, where the captured
//! output includes this crate's events.

use std::sync::Arc;

use patchmend_core::fakes::{MemoryEventLog, MemorySourceFile};
use patchmend_core::obs::{
    emit_event_log_error, emit_mode_switched, emit_patch_applied, emit_run_finished,
    emit_run_started, emit_service_attempt, emit_service_rejected, run_span,
};
use patchmend_core::{Orchestrator, PipelineConfig, ServiceError, METRICS};
use tracing_test::traced_test;

#[traced_test]
#[test]
fn test_emit_run_started() {
    emit_run_started("run-123", "openlibrary/core/imports.py");
}

#[traced_test]
#[test]
fn test_emit_service_attempt() {
    emit_service_attempt("run-123", "claude-sonnet-4-5-20250929", 2, 3);
}

#[traced_test]
#[test]
fn test_emit_service_rejected() {
    emit_service_rejected("run-123", "non-deletion", "structural marker \"class Stats\" was removed");
}

#[traced_test]
#[test]
fn test_emit_mode_switched() {
    emit_mode_switched("run-123", "service", "fallback", "timeout");
}

#[traced_test]
#[test]
fn test_emit_patch_applied_both_levels() {
    emit_patch_applied("run-123", "fallback", true, true);
    emit_patch_applied("run-123", "fallback", false, false);
}

#[traced_test]
#[test]
fn test_emit_run_finished() {
    emit_run_finished("run-123", 1500, "fallback", true);
}

#[traced_test]
#[test]
fn test_emit_event_log_error() {
    emit_event_log_error("run-err-001", "applied", &"disk full");
}

#[traced_test]
#[test]
fn test_run_span_can_be_entered() {
    let span = run_span("test-span-run");
    let entered = span.enter();
    drop(entered);
}

#[traced_test]
#[tokio::test]
async fn test_fallback_run_updates_metrics() {
    let before = METRICS.fallbacks_applied();
    let file = Arc::new(MemorySourceFile::new("imports.py", "class ImportItem:\n    pass\n"));
    let log = Arc::new(MemoryEventLog::new());
    let orchestrator = Orchestrator::new(&PipelineConfig::default(), file, log).unwrap();

    let run = orchestrator.run(Err(ServiceError::Disabled)).await;

    assert!(run.outcome.is_applied());
    assert!(METRICS.fallbacks_applied() > before);
}
