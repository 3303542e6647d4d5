//! Integration suite adapter.

use async_trait::async_trait;
use serde::Deserialize;

use qa_core::{RunConfiguration, SuiteExecutionError, SuiteKind, SuiteMetrics, SuiteResult, TestCounts};

use crate::suites::command::{annotate, parse_summary, SuiteCommand};
use crate::suites::Runnable;

/// `{"total": 40, "passed": 39, "failed": 1, "skipped": 0}`
#[derive(Debug, Clone, Deserialize)]
pub struct IntegrationSummary {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    #[serde(default)]
    pub skipped: u32,
}

impl IntegrationSummary {
    pub fn into_result(self, duration_ms: u64) -> SuiteResult {
        let counts = TestCounts::new(self.total, self.passed, self.failed, self.skipped);
        SuiteResult::completed(
            SuiteKind::Integration,
            counts,
            SuiteMetrics::Integration {
                pass_rate: counts.pass_rate().unwrap_or(0.0),
            },
            self.failed == 0,
            duration_ms,
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IntegrationSuite;

#[async_trait]
impl Runnable for IntegrationSuite {
    fn kind(&self) -> SuiteKind {
        SuiteKind::Integration
    }

    async fn run(&self, config: &RunConfiguration) -> Result<SuiteResult, SuiteExecutionError> {
        let output = SuiteCommand::new(SuiteKind::Integration, config)
            .execute()
            .await?;
        let summary: IntegrationSummary = parse_summary(SuiteKind::Integration, &output)?;
        Ok(annotate(summary.into_result(output.duration_ms), &output))
    }
}
