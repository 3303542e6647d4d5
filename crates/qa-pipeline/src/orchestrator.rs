//! Pipeline controller.
//!
//! Drives one run through
//! `Idle → ValidatingInfra → RunningSuites → Evaluating → GatingAndReporting → Completed`,
//! or into `Aborted` when the infrastructure pre-check fails critically or the
//! run is cancelled. The controller is the only writer of the aggregate; suite
//! tasks hand their results back through their join handles.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Semaphore};
use tracing::Instrument;
use uuid::Uuid;

use qa_core::obs;
use qa_core::{
    blocking_failures, decide, evaluate, AggregatedResult, AggregatedResultBuilder,
    ConfigOverrides, GateDecision, InfraCheckResult, QAReport, RenderOutput, ReportGenerator, ReportInput,
    ReportRenderError, RunConfiguration, SuiteKind, SuiteResult, EXIT_INTERNAL_ERROR,
};

use crate::infra::{CommandInfraCheck, InfraCheck};
use crate::notify;
use crate::suites::{Runnable, SuiteRegistry};

pub const ABORT_CRITICAL_VALIDATION: &str = "critical validation failure";
pub const ABORT_CANCELLED: &str = "cancelled";

// ---------------------------------------------------------------------------
// State machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    ValidatingInfra,
    RunningSuites,
    Evaluating,
    GatingAndReporting,
    Completed,
    Aborted,
}

impl PipelineState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ValidatingInfra => "validating_infra",
            Self::RunningSuites => "running_suites",
            Self::Evaluating => "evaluating",
            Self::GatingAndReporting => "gating_and_reporting",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Idle, ValidatingInfra)
            | (ValidatingInfra, RunningSuites)
            | (RunningSuites, Evaluating)
            | (Evaluating, GatingAndReporting)
            | (GatingAndReporting, Completed) => true,
            (from, Aborted) => !from.is_terminal() && from != Idle,
            _ => false,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: PipelineState,
    pub to: PipelineState,
    pub at: DateTime<Utc>,
}

struct StateMachine<'a> {
    run_id: &'a str,
    state: PipelineState,
    transitions: Vec<Transition>,
}

impl<'a> StateMachine<'a> {
    fn new(run_id: &'a str) -> Self {
        Self {
            run_id,
            state: PipelineState::Idle,
            transitions: Vec::new(),
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        obs::emit_pipeline_transition(self.run_id, self.state.as_str(), next.as_str());
        self.transitions.push(Transition {
            from: self.state,
            to: next,
            at: Utc::now(),
        });
        self.state = next;
    }
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cloneable handle that cancels a run. Cancelling twice is a no-op.
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancellationHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Resolves once `rx` observes cancellation.
async fn cancelled(mut rx: watch::Receiver<bool>) {
    if rx.wait_for(|c| *c).await.is_err() {
        // sender gone: cancellation can no longer happen
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Everything one run produced.
#[derive(Debug)]
pub struct PipelineRun {
    pub report: QAReport,
    pub state: PipelineState,
    pub transitions: Vec<Transition>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub rendered: RenderOutput,
    /// Files written under the configured report directory.
    pub artifacts: Vec<PathBuf>,
    /// Set when the report directory was configured but could not be written.
    pub artifact_error: Option<ReportRenderError>,
    pub notified: bool,
}

impl PipelineRun {
    /// Process exit code: the gate's, unless report persistence failed.
    pub fn exit_code(&self) -> i32 {
        if self.artifact_error.is_some() {
            EXIT_INTERNAL_ERROR
        } else {
            self.report.gate.exit_code
        }
    }

    /// States visited, starting with `Idle`.
    pub fn states(&self) -> Vec<PipelineState> {
        let mut states = vec![PipelineState::Idle];
        states.extend(self.transitions.iter().map(|t| t.to));
        states
    }
}

pub struct Orchestrator {
    config: Arc<RunConfiguration>,
    registry: SuiteRegistry,
    infra: Arc<dyn InfraCheck>,
    generator: ReportGenerator,
    cancel: CancellationHandle,
}

impl Orchestrator {
    /// An orchestrator with the command-backed adapters, command probes from
    /// the configuration and the standard renderers.
    pub fn new(config: RunConfiguration) -> Self {
        let infra = CommandInfraCheck::from_config(&config);
        Self {
            config: Arc::new(config),
            registry: SuiteRegistry::command_backed(),
            infra: Arc::new(infra),
            generator: ReportGenerator::standard(),
            cancel: CancellationHandle::new(),
        }
    }

    /// Resolve `environment` with `overrides` and build the default orchestrator for it.
    pub fn from_environment(
        environment: &str,
        overrides: Option<&ConfigOverrides>,
    ) -> qa_core::Result<Self> {
        Ok(Self::new(qa_core::resolve(environment, overrides)?))
    }

    pub fn with_registry(mut self, registry: SuiteRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_infra_check(mut self, infra: impl InfraCheck + 'static) -> Self {
        self.infra = Arc::new(infra);
        self
    }

    pub fn with_report_generator(mut self, generator: ReportGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_handle(&self) -> CancellationHandle {
        self.cancel.clone()
    }

    pub fn config(&self) -> &RunConfiguration {
        &self.config
    }

    /// Execute one run. Never fails: every problem ends up in the report.
    pub async fn run(&self) -> PipelineRun {
        let run_id = Uuid::new_v4();
        let span = obs::run_span(&run_id.to_string());
        self.execute(run_id).instrument(span).await
    }

    async fn execute(&self, run_id: Uuid) -> PipelineRun {
        let run_id_str = run_id.to_string();
        let started_at = Utc::now();
        let start = Instant::now();
        let mut machine = StateMachine::new(&run_id_str);

        let enabled = self.config.enabled_suites();
        obs::emit_pipeline_started(&run_id_str, self.config.environment.as_str(), enabled.len());

        machine.advance(PipelineState::ValidatingInfra);
        let validated = tokio::select! {
            biased;
            _ = cancelled(self.cancel.subscribe()) => None,
            validated = self.infra.validate() => Some(validated),
        };
        let infra = match validated {
            Some(Ok(results)) => results,
            Some(Err(e)) => vec![InfraCheckResult::fail("infrastructure", e.to_string(), true)],
            // cancelled mid-check: in-flight probes are dropped
            None => Vec::new(),
        };

        let abort_reason = if self.cancel.is_cancelled() {
            Some(ABORT_CANCELLED)
        } else if !blocking_failures(&infra).is_empty() {
            Some(ABORT_CRITICAL_VALIDATION)
        } else {
            None
        };

        let (results, outcomes, gate, abort_reason) = match abort_reason {
            Some(reason) => {
                tracing::warn!(reason, "aborting before suites run");
                machine.advance(PipelineState::Aborted);
                (
                    AggregatedResult::default(),
                    Vec::new(),
                    GateDecision::aborted(),
                    Some(reason.to_string()),
                )
            }
            None => {
                machine.advance(PipelineState::RunningSuites);
                let results = self.run_suites(&run_id_str, &enabled).await;

                if self.cancel.is_cancelled() {
                    tracing::warn!(recorded = results.len(), "run cancelled");
                    machine.advance(PipelineState::Aborted);
                    (
                        results,
                        Vec::new(),
                        GateDecision::aborted(),
                        Some(ABORT_CANCELLED.to_string()),
                    )
                } else {
                    machine.advance(PipelineState::Evaluating);
                    let outcomes = evaluate(&self.config.rules, &results);
                    machine.advance(PipelineState::GatingAndReporting);
                    let gate = decide(&outcomes, self.config.rejection_threshold);
                    (results, outcomes, gate, None)
                }
            }
        };
        obs::emit_gate_decided(&run_id_str, &gate);

        let report = QAReport::new(ReportInput {
            run_id,
            environment: self.config.environment,
            threshold: self.config.rejection_threshold,
            infra,
            results,
            outcomes,
            gate,
            abort_reason,
        });

        let rendered = self.generator.render(&report, &self.config.report_formats);
        for (format, err) in &rendered.errors {
            tracing::warn!(format = %format, error = %err, "report format not rendered");
        }

        let (artifacts, artifact_error) = match &self.config.report_dir {
            Some(dir) => match qa_core::write_report_artifacts(dir, &rendered) {
                Ok(paths) => (paths, None),
                Err(e) => {
                    tracing::error!(dir = %dir.display(), error = %e, "failed to write report artifacts");
                    (Vec::new(), Some(e))
                }
            },
            None => (Vec::new(), None),
        };

        let notified = notify::notify(self.config.notifications.as_ref(), &report).await;

        if !machine.state.is_terminal() {
            machine.advance(PipelineState::Completed);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        obs::emit_pipeline_finished(
            &run_id_str,
            machine.state.as_str(),
            duration_ms,
            report.gate.is_accepted(),
        );

        PipelineRun {
            report,
            state: machine.state,
            transitions: machine.transitions,
            started_at,
            duration_ms,
            rendered,
            artifacts,
            artifact_error,
            notified,
        }
    }

    /// Dispatch every enabled suite, bounded by `max_parallel_suites`.
    async fn run_suites(&self, run_id: &str, enabled: &[SuiteKind]) -> AggregatedResult {
        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel_suites.max(1)));
        let mut builder = AggregatedResultBuilder::new();
        let mut tasks = Vec::new();

        for &kind in enabled {
            let Some(suite) = self.registry.get(kind) else {
                builder.record(SuiteResult::execution_failed(
                    kind,
                    "no adapter registered",
                    0,
                ));
                continue;
            };
            let timeout = Duration::from_secs(
                self.config.suite(kind).map_or(1, |s| s.timeout_secs.max(1)),
            );
            let config = Arc::clone(&self.config);
            let semaphore = Arc::clone(&semaphore);
            let cancel_rx = self.cancel.subscribe();

            let task = tokio::spawn(async move {
                let dispatched = Instant::now();
                tokio::select! {
                    biased;
                    _ = cancelled(cancel_rx) => {
                        SuiteResult::cancelled(kind, dispatched.elapsed().as_millis() as u64)
                    }
                    result = run_one(suite, kind, config, semaphore, timeout) => result,
                }
            });
            tasks.push((kind, task));
        }

        for (kind, task) in tasks {
            let result = match task.await {
                Ok(result) => result,
                Err(e) => SuiteResult::execution_failed(kind, format!("suite task failed: {e}"), 0),
            };
            obs::emit_suite_finished(run_id, &result);
            builder.record(result);
        }

        builder.freeze()
    }
}

async fn run_one(
    suite: Arc<dyn Runnable>,
    kind: SuiteKind,
    config: Arc<RunConfiguration>,
    semaphore: Arc<Semaphore>,
    timeout: Duration,
) -> SuiteResult {
    let _permit = semaphore.acquire_owned().await.ok();
    let start = Instant::now();
    let elapsed = || start.elapsed().as_millis() as u64;

    match tokio::time::timeout(timeout, suite.run(&config)).await {
        Ok(Ok(result)) if result.kind == kind => result,
        Ok(Ok(result)) => SuiteResult::execution_failed(
            kind,
            format!("adapter returned a {} result", result.kind),
            elapsed(),
        ),
        Ok(Err(e)) => SuiteResult::execution_failed(kind, e.cause, elapsed()),
        Err(_) => SuiteResult::timed_out(kind, elapsed()),
    }
}
