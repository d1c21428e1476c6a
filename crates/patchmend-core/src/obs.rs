//! Structured observability hooks for the patch pipeline.
//!
//! This module provides:
//! - A run-scoped tracing span via `run_span`
//! - Emission functions for key lifecycle points: start, service attempt,
//!   rejection, mode switch, application, finish
//!
//! These are operator diagnostics. The auditable record of a run is the
//! event log, not this output.

use tracing::{info, info_span, warn, Span};

/// Run-scoped span; attach it to the run future with
/// [`tracing::Instrument::instrument`].
///
/// # Example
///
/// ```ignore
/// orchestrate(request).instrument(run_span("run-12345")).await;
/// // Every event inside now carries run_id = "run-12345"
/// ```
pub fn run_span(run_id: &str) -> Span {
    info_span!("patchmend.run", run_id = %run_id)
}

/// Emit event: run started against a target file.
pub fn emit_run_started(run_id: &str, target: &str) {
    info!(event = "run.started", run_id = %run_id, target = %target);
}

/// Emit event: one outbound call to the generative service.
pub fn emit_service_attempt(run_id: &str, model: &str, attempt: u32, max_attempts: u32) {
    info!(
        event = "service.attempt",
        run_id = %run_id,
        model = %model,
        attempt = attempt,
        max_attempts = max_attempts,
    );
}

/// Emit event: a candidate failed a validation gate.
pub fn emit_service_rejected(run_id: &str, gate: &str, detail: &str) {
    warn!(event = "service.rejected", run_id = %run_id, gate = %gate, detail = %detail);
}

/// Emit event: the pipeline switched mode.
pub fn emit_mode_switched(run_id: &str, from: &str, to: &str, trigger: &str) {
    warn!(
        event = "mode.switched",
        run_id = %run_id,
        from = %from,
        to = %to,
        trigger = %trigger,
    );
}

/// Emit event: content applied to the target.
pub fn emit_patch_applied(run_id: &str, mode: &str, changed: bool, degraded: bool) {
    if degraded {
        warn!(
            event = "patch.applied",
            run_id = %run_id,
            mode = %mode,
            changed = changed,
            degraded = true,
            "lookup method could not be placed; fallback applied partially"
        );
    } else {
        info!(
            event = "patch.applied",
            run_id = %run_id,
            mode = %mode,
            changed = changed,
            degraded = false,
        );
    }
}

/// Emit event: run finished with duration and terminal mode.
pub fn emit_run_finished(run_id: &str, duration_ms: u64, mode: &str, success: bool) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        mode = %mode,
        success = success,
    );
}

/// Emit event: the event log refused an append (warning level).
pub fn emit_event_log_error(run_id: &str, kind: &str, error: &dyn std::fmt::Display) {
    warn!(event = "event_log.append_error", run_id = %run_id, kind = %kind, error = %error);
}
