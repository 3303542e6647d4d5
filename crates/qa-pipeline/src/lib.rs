//! QA Gate pipeline execution.
//!
//! Provides:
//! - Command-backed suite adapters behind the [`Runnable`] trait
//! - The infrastructure pre-check
//! - The [`Orchestrator`] state machine that runs suites, evaluates rules,
//!   decides the gate and publishes the report

pub mod infra;
pub mod notify;
pub mod orchestrator;
pub mod suites;

pub use infra::{CommandInfraCheck, InfraCheck};
pub use notify::{NotificationPayload, NotifyError, WebhookNotifier};
pub use orchestrator::{
    CancellationHandle, Orchestrator, PipelineRun, PipelineState, Transition,
    ABORT_CANCELLED, ABORT_CRITICAL_VALIDATION,
};
pub use suites::{
    AcceptanceSuite, IntegrationSuite, PerformanceSuite, Runnable, SuiteRegistry, UnitSuite,
};
