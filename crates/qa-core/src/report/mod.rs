//! Run report model and rendering.
//!
//! A [`QAReport`] is built once at the end of a run and handed to the
//! [`ReportGenerator`], which renders it into every requested
//! [`ReportFormat`] through pluggable [`ReportRenderer`]s. JSON is the
//! canonical lossless form; HTML and XML are summary views.

pub mod artifact;
pub mod html;
pub mod json;
pub mod xml;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Environment;
use crate::domain::{
    AggregatedResult, CheckStatus, InfraCheckResult, ReportRenderError, RuleCategory,
    RuleOutcome, Severity, SuiteOutcome, TestCounts,
};
use crate::gate::{GateDecision, RejectionThreshold, Verdict};

pub use artifact::{read_report_artifact, write_report_artifacts, REPORT_DIGEST_FILE};
pub use html::HtmlRenderer;
pub use json::JsonRenderer;
pub use xml::XmlRenderer;

pub const SCHEMA_VERSION: &str = "1.0";

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Json,
    Html,
    Xml,
}

impl ReportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Html => "html",
            Self::Xml => "xml",
        }
    }

    /// File extension used for persisted artifacts.
    pub fn extension(self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = ReportRenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "html" => Ok(Self::Html),
            "xml" => Ok(Self::Xml),
            _ => Err(ReportRenderError::UnsupportedFormat(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Report model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Aborted,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        }
    }
}

/// Counts derived from a report's results and outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub suites_total: usize,
    pub suites_succeeded: usize,
    pub suites_failed: usize,
    /// Suites that timed out, failed to execute or were cancelled.
    pub suites_not_completed: usize,
    pub tests: TestCounts,
    /// Passed / executed across all suites, as a percentage.
    pub test_pass_rate: Option<f64>,
    pub rules_total: usize,
    pub rules_passed: usize,
    pub rules_failed: usize,
    /// Failed rules that rejected the run.
    pub rules_blocking: usize,
    /// Failed rules below the rejection threshold.
    pub rules_warned: usize,
    pub infra_warnings: usize,
    pub failed_by_severity: BTreeMap<Severity, usize>,
    pub failed_by_category: BTreeMap<RuleCategory, usize>,
    /// 0-100; every failed rule costs points by severity.
    pub quality_score: f64,
    pub verdict: Verdict,
}

impl ReportSummary {
    pub fn derive(
        infra: &[InfraCheckResult],
        results: &AggregatedResult,
        outcomes: &[RuleOutcome],
        gate: &GateDecision,
        threshold: RejectionThreshold,
    ) -> Self {
        let tests = results.total_counts();
        let mut failed_by_severity = BTreeMap::new();
        let mut failed_by_category = BTreeMap::new();
        let mut penalty = 0.0;

        for outcome in outcomes.iter().filter(|o| !o.passed) {
            *failed_by_severity.entry(outcome.severity).or_insert(0) += 1;
            *failed_by_category.entry(outcome.category).or_insert(0) += 1;
            penalty += severity_penalty(outcome.severity);
        }

        let rules_failed = outcomes.iter().filter(|o| !o.passed).count();
        let rules_warned = crate::gate::warnings(outcomes, threshold).len();
        let rules_blocking = rules_failed - rules_warned;
        let suites_succeeded = results.iter().filter(|r| r.overall_success).count();

        Self {
            suites_total: results.len(),
            suites_succeeded,
            suites_failed: results.len() - suites_succeeded,
            suites_not_completed: results
                .iter()
                .filter(|r| r.outcome != SuiteOutcome::Completed)
                .count(),
            tests,
            test_pass_rate: tests.pass_rate(),
            rules_total: outcomes.len(),
            rules_passed: outcomes.len() - rules_failed,
            rules_failed,
            rules_blocking,
            rules_warned,
            infra_warnings: infra
                .iter()
                .filter(|r| r.status != CheckStatus::Pass && !r.is_blocking())
                .count(),
            failed_by_severity,
            failed_by_category,
            quality_score: (100.0 - penalty).max(0.0),
            verdict: gate.verdict,
        }
    }

    /// Non-blocking rule failures plus infrastructure warnings.
    pub fn warnings(&self) -> usize {
        self.rules_warned + self.infra_warnings
    }
}

fn severity_penalty(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => 25.0,
        Severity::Major => 10.0,
        Severity::Minor => 5.0,
    }
}

/// The complete, immutable record of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QAReport {
    pub schema_version: String,
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub environment: Environment,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<String>,
    pub infra: Vec<InfraCheckResult>,
    pub results: AggregatedResult,
    pub outcomes: Vec<RuleOutcome>,
    pub gate: GateDecision,
    pub summary: ReportSummary,
}

/// Inputs for [`QAReport::new`].
#[derive(Debug, Clone)]
pub struct ReportInput {
    pub run_id: Uuid,
    pub environment: Environment,
    pub threshold: RejectionThreshold,
    pub infra: Vec<InfraCheckResult>,
    pub results: AggregatedResult,
    pub outcomes: Vec<RuleOutcome>,
    pub gate: GateDecision,
    /// `Some` marks the run as aborted.
    pub abort_reason: Option<String>,
}

impl QAReport {
    pub fn new(input: ReportInput) -> Self {
        let summary = ReportSummary::derive(
            &input.infra,
            &input.results,
            &input.outcomes,
            &input.gate,
            input.threshold,
        );
        let status = if input.abort_reason.is_some() {
            RunStatus::Aborted
        } else {
            RunStatus::Completed
        };
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            run_id: input.run_id,
            generated_at: Utc::now(),
            environment: input.environment,
            status,
            abort_reason: input.abort_reason,
            infra: input.infra,
            results: input.results,
            outcomes: input.outcomes,
            gate: input.gate,
            summary,
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Renders a report into one format.
pub trait ReportRenderer: Send + Sync {
    fn format(&self) -> ReportFormat;
    fn render(&self, report: &QAReport) -> Result<String, ReportRenderError>;
}

/// Everything produced by one [`ReportGenerator::render`] call.
#[derive(Debug, Default)]
pub struct RenderOutput {
    pub rendered: BTreeMap<ReportFormat, String>,
    /// Formats that failed, in request order.
    pub errors: Vec<(ReportFormat, ReportRenderError)>,
}

impl RenderOutput {
    pub fn get(&self, format: ReportFormat) -> Option<&str> {
        self.rendered.get(&format).map(String::as_str)
    }

    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Registry of renderers keyed by format.
#[derive(Default)]
pub struct ReportGenerator {
    renderers: BTreeMap<ReportFormat, Box<dyn ReportRenderer>>,
}

impl ReportGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON, HTML and XML.
    pub fn standard() -> Self {
        Self::new()
            .with_renderer(JsonRenderer)
            .with_renderer(HtmlRenderer)
            .with_renderer(XmlRenderer)
    }

    pub fn with_renderer(mut self, renderer: impl ReportRenderer + 'static) -> Self {
        self.renderers.insert(renderer.format(), Box::new(renderer));
        self
    }

    pub fn supports(&self, format: ReportFormat) -> bool {
        self.renderers.contains_key(&format)
    }

    /// Render `report` into each of `formats`. A failing format is recorded
    /// in [`RenderOutput::errors`] and does not affect the others.
    pub fn render(&self, report: &QAReport, formats: &[ReportFormat]) -> RenderOutput {
        let mut output = RenderOutput::default();
        for &format in formats {
            let Some(renderer) = self.renderers.get(&format) else {
                output.errors.push((
                    format,
                    ReportRenderError::UnsupportedFormat(format.to_string()),
                ));
                continue;
            };
            match renderer.render(report) {
                Ok(text) => {
                    output.rendered.insert(format, text);
                }
                Err(err) => {
                    tracing::warn!(format = %format, error = %err, "report rendering failed");
                    output.errors.push((format, err));
                }
            }
        }
        output
    }
}

impl fmt::Debug for ReportGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportGenerator")
            .field("formats", &self.renderers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Escape text for HTML and XML bodies and attribute values.
pub(crate) fn escape_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::domain::{AggregatedResultBuilder, SuiteKind, SuiteMetrics, SuiteResult};
    use crate::gate::decide;
    use crate::rules::{default_rules, evaluate};

    pub fn sample_report(coverage: f64) -> QAReport {
        let mut builder = AggregatedResultBuilder::new();
        builder.record(SuiteResult::completed(
            SuiteKind::Unit,
            TestCounts::new(120, 118, 2, 0),
            SuiteMetrics::Unit { coverage },
            false,
            1_250,
        ));
        builder.record(SuiteResult::timed_out(SuiteKind::Integration, 600_000));
        let results = builder.freeze();

        let rules = default_rules(&Default::default());
        let outcomes = evaluate(&rules, &results);
        let gate = decide(&outcomes, RejectionThreshold::CriticalOnly);

        QAReport::new(ReportInput {
            run_id: Uuid::parse_str("11111111-1111-4111-8111-111111111111").expect("uuid"),
            environment: Environment::Ci,
            threshold: RejectionThreshold::CriticalOnly,
            infra: vec![
                InfraCheckResult::pass("database", "reachable"),
                InfraCheckResult::warning("cache", "slow <ping>"),
            ],
            results,
            outcomes,
            gate,
            abort_reason: None,
        })
    }
}
