//! QA Gate core library.
//!
//! Domain model, configuration resolution, rule catalog and engine, quality
//! gate, and report rendering. Suite execution lives in `qa-pipeline`.

pub mod config;
pub mod domain;
pub mod gate;
pub mod obs;
pub mod report;
pub mod rules;
pub mod telemetry;

pub use config::{
    resolve, ConfigOverrides, ConfigResolver, Environment, InfraProbe, NotificationSettings,
    NotifyOn, RuleThresholds, RunConfiguration, SuiteOverrides, SuiteSettings, ThresholdOverrides,
};

pub use domain::{
    blocking_failures, AggregatedResult, AggregatedResultBuilder, CheckStatus, ConfigError,
    InfraCheckResult, QaError, ReportRenderError, Result, RuleCategory, RuleEvaluationError,
    RuleOutcome, ScenarioResult, Severity, SuiteExecutionError, SuiteKind, SuiteMetrics,
    SuiteOutcome, SuiteResult, TestCounts,
};

pub use gate::{
    decide, GateDecision, RejectionThreshold, Verdict, EXIT_ACCEPT, EXIT_INTERNAL_ERROR,
    EXIT_REJECT,
};

pub use report::{
    read_report_artifact, write_report_artifacts, QAReport, RenderOutput, ReportFormat,
    ReportGenerator, ReportInput, ReportRenderer, ReportSummary, RunStatus,
};

pub use rules::{
    build_catalog, default_rules, environment_rules, evaluate, RuleCheck, RuleSpec, RuleVerdict,
    ValidationRule,
};

pub use telemetry::init_tracing;

/// QA Gate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
