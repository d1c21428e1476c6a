//! Global atomic counters for pipeline observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. at the end of a run).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Atomic pipeline counters.
pub struct Metrics {
    service_attempts: AtomicU64,
    service_accepted: AtomicU64,
    validation_rejections: AtomicU64,
    fallbacks_applied: AtomicU64,
    runs_failed: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            service_attempts: AtomicU64::new(0),
            service_accepted: AtomicU64::new(0),
            validation_rejections: AtomicU64::new(0),
            fallbacks_applied: AtomicU64::new(0),
            runs_failed: AtomicU64::new(0),
        }
    }

    /// One outbound call, retries counted individually.
    pub fn inc_service_attempts(&self) {
        self.service_attempts.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "service_attempts", "counter incremented");
    }

    pub fn inc_service_accepted(&self) {
        self.service_accepted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "service_accepted", "counter incremented");
    }

    pub fn inc_validation_rejections(&self) {
        self.validation_rejections.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "validation_rejections", "counter incremented");
    }

    pub fn inc_fallbacks_applied(&self) {
        self.fallbacks_applied.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "fallbacks_applied", "counter incremented");
    }

    pub fn inc_runs_failed(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_failed", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    ///
    /// Call this at natural boundaries (end of a run) rather than on every
    /// increment.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            service_attempts = self.service_attempts(),
            service_accepted = self.service_accepted(),
            validation_rejections = self.validation_rejections(),
            fallbacks_applied = self.fallbacks_applied(),
            runs_failed = self.runs_failed(),
        );
    }

    pub fn service_attempts(&self) -> u64 {
        self.service_attempts.load(Ordering::Relaxed)
    }

    pub fn service_accepted(&self) -> u64 {
        self.service_accepted.load(Ordering::Relaxed)
    }

    pub fn validation_rejections(&self) -> u64 {
        self.validation_rejections.load(Ordering::Relaxed)
    }

    pub fn fallbacks_applied(&self) -> u64 {
        self.fallbacks_applied.load(Ordering::Relaxed)
    }

    pub fn runs_failed(&self) -> u64 {
        self.runs_failed.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.service_attempts.store(0, Ordering::Relaxed);
        self.service_accepted.store(0, Ordering::Relaxed);
        self.validation_rejections.store(0, Ordering::Relaxed);
        self.fallbacks_applied.store(0, Ordering::Relaxed);
        self.runs_failed.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment() {
        let m = Metrics::new();
        assert_eq!(m.service_attempts(), 0);
        m.inc_service_attempts();
        m.inc_service_attempts();
        assert_eq!(m.service_attempts(), 2);

        m.inc_validation_rejections();
        assert_eq!(m.validation_rejections(), 1);

        m.inc_fallbacks_applied();
        m.inc_runs_failed();
        m.inc_service_accepted();
        assert_eq!(m.fallbacks_applied(), 1);
        assert_eq!(m.runs_failed(), 1);
        assert_eq!(m.service_accepted(), 1);
    }

    #[test]
    fn reset_zeroes_all() {
        let m = Metrics::new();
        m.inc_service_attempts();
        m.inc_fallbacks_applied();
        m.inc_runs_failed();
        m.reset();
        assert_eq!(m.service_attempts(), 0);
        assert_eq!(m.fallbacks_applied(), 0);
        assert_eq!(m.runs_failed(), 0);
    }
}
