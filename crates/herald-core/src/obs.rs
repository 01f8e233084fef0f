//! Structured observability hooks for the protocol steps.
//!
//! This module provides:
//! - Step-scoped tracing spans via the `StepSpan` RAII guard
//! - Emission functions for the put lifecycle: step start/finish and the
//!   outcome of every sink
//!
//! Events are emitted at `info!` level except failures (`warn!`).

use tracing::{info, warn};

use crate::domain::error::Step;

/// RAII guard that enters a step-scoped tracing span.
///
/// # Example
///
/// ```ignore
/// let _span = StepSpan::enter(Step::Put);
/// // every event until the guard drops carries step = "put"
/// ```
pub struct StepSpan {
    _span: tracing::span::EnteredSpan,
}

impl StepSpan {
    pub fn enter(step: Step) -> Self {
        let span = tracing::info_span!("herald.step", step = %step);
        Self {
            _span: span.entered(),
        }
    }
}

pub fn emit_step_started(step: Step) {
    info!(event = "step.started", step = %step);
}

pub fn emit_step_finished(step: Step, success: bool) {
    info!(event = "step.finished", step = %step, success = success);
}

/// Emit event: a sink delivered its notification.
pub fn emit_sink_sent(sink: &str, duration_ms: u64) {
    info!(event = "sink.sent", sink = %sink, duration_ms = duration_ms);
}

/// Emit event: a sink decided there was nothing to deliver.
pub fn emit_sink_skipped(sink: &str, reason: &str) {
    info!(event = "sink.skipped", sink = %sink, reason = %reason);
}

/// Emit event: a sink failed (warning level).
pub fn emit_sink_failed(sink: &str, error: &dyn std::fmt::Display) {
    warn!(event = "sink.failed", sink = %sink, error = %error);
}
