//! Acceptance suite adapter.

use async_trait::async_trait;
use serde::Deserialize;

use qa_core::{
    RunConfiguration, ScenarioResult, SuiteExecutionError, SuiteKind, SuiteMetrics, SuiteResult,
    TestCounts,
};

use crate::suites::command::{annotate, parse_summary, SuiteCommand};
use crate::suites::Runnable;

/// `{"overall_score": 92.0, "scenarios": [{"name": "login", "passed": true, "tags": ["security"]}]}`
#[derive(Debug, Clone, Deserialize)]
pub struct AcceptanceSummary {
    pub overall_score: f64,
    #[serde(default)]
    pub scenarios: Vec<ScenarioResult>,
}

impl AcceptanceSummary {
    pub fn into_result(self, duration_ms: u64) -> SuiteResult {
        let total = u32::try_from(self.scenarios.len()).unwrap_or(u32::MAX);
        let passed = u32::try_from(self.scenarios.iter().filter(|s| s.passed).count())
            .unwrap_or(u32::MAX);
        let failed = total - passed;

        SuiteResult::completed(
            SuiteKind::Acceptance,
            TestCounts::new(total, passed, failed, 0),
            SuiteMetrics::Acceptance {
                overall_score: self.overall_score,
                scenarios: self.scenarios,
            },
            failed == 0,
            duration_ms,
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptanceSuite;

#[async_trait]
impl Runnable for AcceptanceSuite {
    fn kind(&self) -> SuiteKind {
        SuiteKind::Acceptance
    }

    async fn run(&self, config: &RunConfiguration) -> Result<SuiteResult, SuiteExecutionError> {
        let output = SuiteCommand::new(SuiteKind::Acceptance, config)
            .execute()
            .await?;
        let summary: AcceptanceSummary = parse_summary(SuiteKind::Acceptance, &output)?;
        Ok(annotate(summary.into_result(output.duration_ms), &output))
    }
}
