//! Domain models for QA Gate.
//!
//! Canonical definitions for the core entities:
//! - `SuiteResult` / `AggregatedResult`: what the suites produced
//! - `RuleOutcome`: how a catalog rule judged the aggregate
//! - `InfraCheckResult`: infrastructure pre-check entries

pub mod error;
pub mod infra;
pub mod rule;
pub mod suite;

pub use error::{ConfigError, QaError, ReportRenderError, Result, RuleEvaluationError, SuiteExecutionError};
pub use infra::{blocking_failures, CheckStatus, InfraCheckResult};
pub use rule::{RuleCategory, RuleOutcome, Severity};
pub use suite::{
    AggregatedResult, AggregatedResultBuilder, ScenarioResult, SuiteKind, SuiteMetrics,
    SuiteOutcome, SuiteResult, TestCounts,
};
