//! Domain-level error taxonomy for QA Gate.

use crate::domain::suite::SuiteKind;

/// Errors produced while resolving a run configuration.
///
/// All of these are fatal: they abort before any suite runs.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown environment: {name}")]
    UnknownEnvironment { name: String },

    #[error("duplicate rule name in catalog: {name}")]
    DuplicateRuleName { name: String },

    #[error("invalid setting {field}: {reason}")]
    InvalidSetting { field: String, reason: String },

    #[error("failed to parse overrides: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A suite could not be executed at all (target unreachable, missing runner,
/// unreadable output). Partial test failures are never reported this way.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind} suite execution failed: {cause}")]
pub struct SuiteExecutionError {
    pub kind: SuiteKind,
    pub cause: String,
}

impl SuiteExecutionError {
    pub fn new(kind: SuiteKind, cause: impl Into<String>) -> Self {
        Self {
            kind,
            cause: cause.into(),
        }
    }
}

/// Errors raised by a rule predicate. The rule engine converts each of these
/// into a failed [`RuleOutcome`](crate::domain::RuleOutcome).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleEvaluationError {
    #[error("{suite} suite produced no metrics")]
    MissingMetrics { suite: SuiteKind },

    #[error("{suite} suite reported metrics of another kind")]
    MetricsMismatch { suite: SuiteKind },

    #[error("predicate failed: {0}")]
    Predicate(String),

    #[error("predicate panicked: {0}")]
    Panicked(String),
}

/// Errors produced while rendering or persisting a report.
#[derive(Debug, thiserror::Error)]
pub enum ReportRenderError {
    #[error("unsupported report format: {0}")]
    UnsupportedFormat(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("report digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Umbrella error for QA Gate operations.
#[derive(Debug, thiserror::Error)]
pub enum QaError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("infrastructure check error: {0}")]
    InfraCheck(String),
}

/// Result type for QA Gate operations.
pub type Result<T> = std::result::Result<T, QaError>;
