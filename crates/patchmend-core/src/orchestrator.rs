//! Attempt / validate / fallback orchestration.
//!
//! ```text
//! Start -> ServiceAttempt -> Accepted -> AppliedByService
//!                         \-> Rejected | ServiceError -> FallbackAttempt -> AppliedByFallback
//!                                                                        \-> Failed
//! ```
//!
//! Every way out of the service path (no client, transport exhaustion,
//! timeout, nothing extractable, a rejected candidate, an unreadable or
//! unwritable target) is logged with its own trigger and then collapsed
//! into a single fallback. The only fatal path is an I/O error inside the
//! fallback itself.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::json;
use tracing::Instrument;
use uuid::Uuid;

use crate::client::PatchService;
use crate::config::PipelineConfig;
use crate::domain::{
    content_digest, EventKind, PatchOutcome, PatchRequest, PatchRun, Result, ServiceError,
};
use crate::event_log::{EventLog, EventRecorder};
use crate::metrics::METRICS;
use crate::obs;
use crate::patcher::DeterministicPatcher;
use crate::source_file::SourceFile;
use crate::validator::PatchValidator;

/// The service capability handed to a run, or why there is none.
pub type ServiceHandle = std::result::Result<Arc<dyn PatchService>, ServiceError>;

/// Why the service path was abandoned.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FallbackTrigger {
    trigger: &'static str,
    reason: String,
}

impl FallbackTrigger {
    fn new(trigger: &'static str, reason: impl Into<String>) -> Self {
        Self {
            trigger,
            reason: reason.into(),
        }
    }
}

impl From<ServiceError> for FallbackTrigger {
    fn from(err: ServiceError) -> Self {
        Self::new(err.trigger(), err.to_string())
    }
}

/// Drives one run to exactly one [`PatchOutcome`].
pub struct Orchestrator {
    task: String,
    service_timeout: Duration,
    validator: PatchValidator,
    patcher: DeterministicPatcher,
    file: Arc<dyn SourceFile>,
    events: Arc<dyn EventLog>,
}

impl Orchestrator {
    pub fn new(
        config: &PipelineConfig,
        file: Arc<dyn SourceFile>,
        events: Arc<dyn EventLog>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            task: config.task.clone(),
            service_timeout: Duration::from_secs(config.service.timeout_secs),
            validator: PatchValidator::new(config.validation.clone()),
            patcher: DeterministicPatcher::new(config.patch.clone())?,
            file,
            events,
        })
    }

    pub fn patcher(&self) -> &DeterministicPatcher {
        &self.patcher
    }

    /// Run the pipeline against the target file.
    pub async fn run(&self, service: ServiceHandle) -> PatchRun {
        let run_id = Uuid::new_v4();
        let recorder = EventRecorder::new(Arc::clone(&self.events), run_id.to_string());
        let span = obs::run_span(recorder.run_id());
        let started_at = Utc::now();

        let outcome = self.drive(service, &recorder).instrument(span).await;

        PatchRun {
            run_id,
            outcome,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn drive(&self, service: ServiceHandle, recorder: &EventRecorder) -> PatchOutcome {
        let clock = Instant::now();
        obs::emit_run_started(recorder.run_id(), &self.file.path().display().to_string());

        let outcome = match self.service_attempt(service, recorder).await {
            Ok(()) => PatchOutcome::AppliedByService,
            Err(trigger) => {
                recorder.record(
                    EventKind::ModeSwitch,
                    json!({
                        "from": "service",
                        "to": "fallback",
                        "trigger": trigger.trigger,
                        "reason": trigger.reason,
                    }),
                );
                obs::emit_mode_switched(recorder.run_id(), "service", "fallback", trigger.trigger);
                self.fallback_attempt(recorder)
            }
        };

        obs::emit_run_finished(
            recorder.run_id(),
            clock.elapsed().as_millis() as u64,
            outcome.mode(),
            outcome.is_applied(),
        );
        METRICS.flush();
        outcome
    }

    async fn service_attempt(
        &self,
        service: ServiceHandle,
        recorder: &EventRecorder,
    ) -> std::result::Result<(), FallbackTrigger> {
        let service = service?;
        let original = self
            .file
            .read()
            .map_err(|e| FallbackTrigger::new("read_error", e.to_string()))?;
        let request = PatchRequest::new(self.file.path(), self.task.as_str(), original);

        let candidate =
            match tokio::time::timeout(self.service_timeout, service.request(&request, recorder))
                .await
            {
                Ok(result) => result?,
                Err(_elapsed) => {
                    return Err(ServiceError::Timeout {
                        secs: self.service_timeout.as_secs(),
                    }
                    .into())
                }
            };
        let body = candidate.require_body()?;

        let verdict = self.validator.validate(body, request.content());
        if !verdict.accepted {
            let gate = verdict.failed_gate.map(|g| g.name()).unwrap_or("unknown");
            let detail = verdict.detail.clone().unwrap_or_default();
            recorder.record(
                EventKind::ValidationFailure,
                json!({ "gate": gate, "detail": detail }),
            );
            METRICS.inc_validation_rejections();
            obs::emit_service_rejected(recorder.run_id(), gate, &detail);
            return Err(FallbackTrigger::new(
                "validation_rejected",
                format!("gate {gate}: {detail}"),
            ));
        }

        let mut content = body.to_string();
        if !content.ends_with('\n') {
            content.push('\n');
        }
        self.file
            .write(&content)
            .map_err(|e| FallbackTrigger::new("write_error", e.to_string()))?;

        METRICS.inc_service_accepted();
        let changed = content != request.content();
        recorder.record(
            EventKind::Applied,
            json!({
                "mode": "service",
                "changed": changed,
                "before_digest": request.content_digest(),
                "after_digest": content_digest(&content),
            }),
        );
        obs::emit_patch_applied(recorder.run_id(), "service", changed, false);
        Ok(())
    }

    fn fallback_attempt(&self, recorder: &EventRecorder) -> PatchOutcome {
        let before = match self.file.read() {
            Ok(content) => content,
            Err(e) => return self.fail(recorder, format!("read failed: {e}")),
        };

        let patched = self.patcher.apply(&before);
        if patched.changed() {
            if let Err(e) = self.file.write(&patched.content) {
                return self.fail(recorder, format!("write failed: {e}"));
            }
        }

        METRICS.inc_fallbacks_applied();
        let degraded = patched.degradation.is_some();
        recorder.record(
            EventKind::Applied,
            json!({
                "mode": "fallback",
                "changed": patched.changed(),
                "constant_inserted": patched.constant_inserted,
                "method_inserted": patched.method_inserted,
                "degraded": degraded,
                "degradation": patched.degradation,
                "before_digest": content_digest(&before),
                "after_digest": content_digest(&patched.content),
            }),
        );
        obs::emit_patch_applied(recorder.run_id(), "fallback", patched.changed(), degraded);

        PatchOutcome::AppliedByFallback {
            degradation: patched.degradation,
        }
    }

    fn fail(&self, recorder: &EventRecorder, reason: String) -> PatchOutcome {
        recorder.record(
            EventKind::ModeSwitch,
            json!({
                "from": "fallback",
                "to": "failed",
                "trigger": "fallback_io_error",
                "reason": reason,
            }),
        );
        METRICS.inc_runs_failed();
        obs::emit_mode_switched(recorder.run_id(), "fallback", "failed", "fallback_io_error");
        PatchOutcome::Failed { reason }
    }
}
