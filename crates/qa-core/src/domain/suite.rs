//! Suite results and the per-run aggregate.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One category of test execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuiteKind {
    Unit,
    Integration,
    Performance,
    Acceptance,
}

impl SuiteKind {
    /// All suite kinds in pipeline order.
    pub const ALL: [SuiteKind; 4] = [
        SuiteKind::Unit,
        SuiteKind::Integration,
        SuiteKind::Performance,
        SuiteKind::Acceptance,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Integration => "integration",
            Self::Performance => "performance",
            Self::Acceptance => "acceptance",
        }
    }
}

impl fmt::Display for SuiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SuiteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unit" => Ok(Self::Unit),
            "integration" => Ok(Self::Integration),
            "performance" => Ok(Self::Performance),
            "acceptance" => Ok(Self::Acceptance),
            other => Err(format!("unknown suite kind: {other}")),
        }
    }
}

/// Test counts shared by every suite kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCounts {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub skipped: u32,
}

impl TestCounts {
    pub fn new(total: u32, passed: u32, failed: u32, skipped: u32) -> Self {
        Self {
            total,
            passed,
            failed,
            skipped,
        }
    }

    /// Passed tests as a percentage of executed (non-skipped) tests.
    ///
    /// Returns `None` when nothing was executed.
    pub fn pass_rate(&self) -> Option<f64> {
        let executed = u64::from(self.passed) + u64::from(self.failed);
        if executed == 0 {
            None
        } else {
            Some(f64::from(self.passed) / executed as f64 * 100.0)
        }
    }
}

/// A single acceptance scenario outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Kind-specific metrics reported by a suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuiteMetrics {
    Unit {
        /// Line coverage percentage (0–100).
        coverage: f64,
    },
    Integration {
        /// Passed / executed, as a percentage (0–100).
        pass_rate: f64,
    },
    Performance {
        requests: u64,
        average_response_time_ms: f64,
        p95_response_time_ms: Option<f64>,
        /// Requests per second.
        throughput: f64,
        /// Failed requests as a fraction (0.0–1.0).
        error_rate: f64,
    },
    Acceptance {
        /// Overall score (0–100).
        overall_score: f64,
        scenarios: Vec<ScenarioResult>,
    },
}

impl SuiteMetrics {
    pub fn kind(&self) -> SuiteKind {
        match self {
            Self::Unit { .. } => SuiteKind::Unit,
            Self::Integration { .. } => SuiteKind::Integration,
            Self::Performance { .. } => SuiteKind::Performance,
            Self::Acceptance { .. } => SuiteKind::Acceptance,
        }
    }
}

/// How a suite invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuiteOutcome {
    /// The suite ran to completion (individual tests may still have failed).
    Completed,
    /// The adapter could not execute the suite.
    ExecutionFailed,
    /// The suite exceeded its configured timeout.
    TimedOut,
    /// The run was cancelled while the suite was pending or in flight.
    Cancelled,
}

/// Canonical result of one suite invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteResult {
    pub kind: SuiteKind,
    pub outcome: SuiteOutcome,
    /// Suite-level success derived from the suite's own thresholds.
    pub overall_success: bool,
    pub counts: TestCounts,
    /// Absent when the suite did not complete.
    pub metrics: Option<SuiteMetrics>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SuiteResult {
    /// A suite that ran to completion.
    pub fn completed(
        kind: SuiteKind,
        counts: TestCounts,
        metrics: SuiteMetrics,
        overall_success: bool,
        duration_ms: u64,
    ) -> Self {
        Self {
            kind,
            outcome: SuiteOutcome::Completed,
            overall_success,
            counts,
            metrics: Some(metrics),
            duration_ms,
            message: None,
        }
    }

    /// A suite whose adapter failed to execute it.
    pub fn execution_failed(kind: SuiteKind, message: impl Into<String>, duration_ms: u64) -> Self {
        Self::failed(kind, SuiteOutcome::ExecutionFailed, message.into(), duration_ms)
    }

    /// A suite that overran its timeout.
    pub fn timed_out(kind: SuiteKind, duration_ms: u64) -> Self {
        Self::failed(kind, SuiteOutcome::TimedOut, "timeout".to_string(), duration_ms)
    }

    /// A suite interrupted by cancellation.
    pub fn cancelled(kind: SuiteKind, duration_ms: u64) -> Self {
        Self::failed(kind, SuiteOutcome::Cancelled, "cancelled".to_string(), duration_ms)
    }

    fn failed(kind: SuiteKind, outcome: SuiteOutcome, message: String, duration_ms: u64) -> Self {
        Self {
            kind,
            outcome,
            overall_success: false,
            counts: TestCounts::default(),
            metrics: None,
            duration_ms,
            message: Some(message),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// The per-run collection of suite results, keyed by suite kind.
///
/// Frozen: the only way to build one is through [`AggregatedResultBuilder`],
/// which the orchestrator owns exclusively.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregatedResult {
    suites: BTreeMap<SuiteKind, SuiteResult>,
}

impl AggregatedResult {
    pub fn get(&self, kind: SuiteKind) -> Option<&SuiteResult> {
        self.suites.get(&kind)
    }

    pub fn contains(&self, kind: SuiteKind) -> bool {
        self.suites.contains_key(&kind)
    }

    /// Suite results in kind order.
    pub fn iter(&self) -> impl Iterator<Item = &SuiteResult> {
        self.suites.values()
    }

    pub fn len(&self) -> usize {
        self.suites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }

    /// Sum of test counts across all suites, saturating at `u32::MAX`.
    pub fn total_counts(&self) -> TestCounts {
        self.suites.values().fold(TestCounts::default(), |acc, r| {
            TestCounts::new(
                acc.total.saturating_add(r.counts.total),
                acc.passed.saturating_add(r.counts.passed),
                acc.failed.saturating_add(r.counts.failed),
                acc.skipped.saturating_add(r.counts.skipped),
            )
        })
    }
}

/// Single-writer builder for [`AggregatedResult`].
#[derive(Debug, Default)]
pub struct AggregatedResultBuilder {
    suites: BTreeMap<SuiteKind, SuiteResult>,
}

impl AggregatedResultBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a suite result, keyed by its kind.
    ///
    /// Returns the previous result if the kind was already recorded.
    pub fn record(&mut self, result: SuiteResult) -> Option<SuiteResult> {
        self.suites.insert(result.kind, result)
    }

    pub fn contains(&self, kind: SuiteKind) -> bool {
        self.suites.contains_key(&kind)
    }

    pub fn len(&self) -> usize {
        self.suites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }

    pub fn freeze(self) -> AggregatedResult {
        AggregatedResult {
            suites: self.suites,
        }
    }
}
