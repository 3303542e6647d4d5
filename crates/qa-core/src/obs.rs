//! Structured lifecycle events for orchestration runs.
//!
//! Every event is a `tracing` event carrying an `event = "..."` field so log
//! pipelines can filter on it. Levels follow `RUST_LOG`.

use tracing::{info, warn};

use crate::domain::{RuleEvaluationError, SuiteResult};
use crate::gate::GateDecision;

/// Span that scopes every log emitted by one run.
///
/// Attach it to the run future with [`tracing::Instrument`] rather than
/// entering it, so it is only active while the future is polled.
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("qa.run", run_id = %run_id)
}

pub fn emit_pipeline_started(run_id: &str, environment: &str, enabled_suites: usize) {
    info!(
        event = "pipeline.started",
        run_id = %run_id,
        environment = %environment,
        enabled_suites = enabled_suites,
    );
}

/// Emit event: state machine transition.
pub fn emit_pipeline_transition(run_id: &str, from: &str, to: &str) {
    info!(event = "pipeline.transition", run_id = %run_id, from = %from, to = %to);
}

pub fn emit_suite_finished(run_id: &str, result: &SuiteResult) {
    info!(
        event = "suite.finished",
        run_id = %run_id,
        suite = %result.kind,
        success = result.overall_success,
        total = result.counts.total,
        failed = result.counts.failed,
        duration_ms = result.duration_ms,
        message = result.message.as_deref().unwrap_or(""),
    );
}

/// Emit event: a rule predicate errored or panicked (warning level).
pub fn emit_rule_evaluation_error(rule: &str, error: &RuleEvaluationError) {
    warn!(event = "rule.evaluation_error", rule = %rule, error = %error);
}

pub fn emit_gate_decided(run_id: &str, decision: &GateDecision) {
    info!(
        event = "gate.decided",
        run_id = %run_id,
        verdict = %decision.verdict,
        exit_code = decision.exit_code,
        blocking = decision.blocking_rules.len(),
    );
}

pub fn emit_pipeline_finished(run_id: &str, state: &str, duration_ms: u64, accepted: bool) {
    info!(
        event = "pipeline.finished",
        run_id = %run_id,
        state = %state,
        duration_ms = duration_ms,
        accepted = accepted,
    );
}
