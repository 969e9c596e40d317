//! Progress-callback trait for per-phase analysis events.
//!
//! Attach an [`Arc<dyn AnalysisProgressCallback>`] with
//! [`crate::Analyzer::with_progress`] to receive events as the pipeline moves
//! through generate → verify → translate and walks the model candidate list.
//!
//! # Example
//!
//! ```rust
//! use medclare::{AnalysisProgressCallback, Phase};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct FailureCounter {
//!     failures: AtomicUsize,
//! }
//!
//! impl AnalysisProgressCallback for FailureCounter {
//!     fn on_model_failed(&self, phase: Phase, model: &str, error: &str) {
//!         self.failures.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{phase}: {model} failed: {error}");
//!     }
//! }
//!
//! let cb = Arc::new(FailureCounter { failures: AtomicUsize::new(0) });
//! let _as_dyn: Arc<dyn AnalysisProgressCallback> = cb;
//! ```

use crate::pipeline::llm::Phase;
use std::sync::Arc;

/// Called by the pipeline as it processes a report.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync`: one
/// [`crate::Analyzer`] may serve several requests at once, and they all share
/// the callback.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called when a phase begins.
    fn on_phase_start(&self, phase: Phase) {
        let _ = phase;
    }

    /// Called just before a request is sent to `model`.
    fn on_model_attempt(&self, phase: Phase, model: &str) {
        let _ = (phase, model);
    }

    /// Called when `model` failed and the pipeline is moving on.
    fn on_model_failed(&self, phase: Phase, model: &str, error: &str) {
        let _ = (phase, model, error);
    }

    /// Called when a phase produced its output.
    ///
    /// # Arguments
    /// * `model`     : the model that answered
    /// * `output_len`: byte length of the phase output
    fn on_phase_complete(&self, phase: Phase, model: &str, output_len: usize) {
        let _ = (phase, model, output_len);
    }

    /// Called when a phase was not run (translation to English) or its
    /// failure was absorbed (translation fell back to English).
    fn on_phase_skipped(&self, phase: Phase, reason: &str) {
        let _ = (phase, reason);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Shared callback handle held by [`crate::Analyzer`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        attempts: AtomicUsize,
        failures: AtomicUsize,
        completed: Mutex<Vec<Phase>>,
        skipped: Mutex<Vec<Phase>>,
    }

    impl AnalysisProgressCallback for TrackingCallback {
        fn on_model_attempt(&self, _phase: Phase, _model: &str) {
            self.attempts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_model_failed(&self, _phase: Phase, _model: &str, _error: &str) {
            self.failures.fetch_add(1, Ordering::SeqCst);
        }

        fn on_phase_complete(&self, phase: Phase, _model: &str, _output_len: usize) {
            self.completed.lock().unwrap().push(phase);
        }

        fn on_phase_skipped(&self, phase: Phase, _reason: &str) {
            self.skipped.lock().unwrap().push(phase);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_phase_start(Phase::Generate);
        cb.on_model_attempt(Phase::Generate, "m");
        cb.on_model_failed(Phase::Generate, "m", "HTTP 500");
        cb.on_phase_complete(Phase::Verify, "m", 42);
        cb.on_phase_skipped(Phase::Translate, "English requested");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_model_attempt(Phase::Generate, "a");
        tracker.on_model_failed(Phase::Generate, "a", "timeout");
        tracker.on_model_attempt(Phase::Generate, "b");
        tracker.on_phase_complete(Phase::Generate, "b", 100);
        tracker.on_phase_skipped(Phase::Translate, "English requested");

        assert_eq!(tracker.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.failures.load(Ordering::SeqCst), 1);
        assert_eq!(*tracker.completed.lock().unwrap(), [Phase::Generate]);
        assert_eq!(*tracker.skipped.lock().unwrap(), [Phase::Translate]);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_phase_start(Phase::Verify);
        cb.on_phase_complete(Phase::Verify, "m", 512);
    }
}
