//! Unit suite adapter.
//!
//! Runner summary:
//!
//! ```json
//! {"total": 120, "passed": 118, "failed": 2, "skipped": 0, "coverage": 87.3}
//! ```

use async_trait::async_trait;
use serde::Deserialize;

use qa_core::{RunConfiguration, SuiteExecutionError, SuiteKind, SuiteMetrics, SuiteResult, TestCounts};

use crate::suites::command::{annotate, parse_summary, SuiteCommand};
use crate::suites::Runnable;

#[derive(Debug, Clone, Deserialize)]
pub struct UnitSummary {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    #[serde(default)]
    pub skipped: u32,
    /// Line coverage percentage.
    pub coverage: f64,
}

impl UnitSummary {
    pub fn into_result(self, duration_ms: u64) -> SuiteResult {
        SuiteResult::completed(
            SuiteKind::Unit,
            TestCounts::new(self.total, self.passed, self.failed, self.skipped),
            SuiteMetrics::Unit {
                coverage: self.coverage,
            },
            self.failed == 0,
            duration_ms,
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct UnitSuite;

#[async_trait]
impl Runnable for UnitSuite {
    fn kind(&self) -> SuiteKind {
        SuiteKind::Unit
    }

    async fn run(&self, config: &RunConfiguration) -> Result<SuiteResult, SuiteExecutionError> {
        let output = SuiteCommand::new(SuiteKind::Unit, config).execute().await?;
        let summary: UnitSummary = parse_summary(SuiteKind::Unit, &output)?;
        Ok(annotate(summary.into_result(output.duration_ms), &output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suites::command::test_support::config_with_script;

    #[tokio::test]
    async fn passing_unit_run() {
        let config = config_with_script(
            SuiteKind::Unit,
            r#"echo '{"total": 10, "passed": 10, "failed": 0, "coverage": 91.5}'"#,
        );
        let result = UnitSuite.run(&config).await.expect("run");
        assert!(result.overall_success);
        assert_eq!(result.metrics, Some(SuiteMetrics::Unit { coverage: 91.5 }));
        assert!(result.message.is_none());
    }

    #[tokio::test]
    async fn failing_tests_with_nonzero_exit_are_partial() {
        let config = config_with_script(
            SuiteKind::Unit,
            r#"echo '{"total": 10, "passed": 8, "failed": 2, "coverage": 85.0}'; exit 101"#,
        );
        let result = UnitSuite.run(&config).await.expect("partial result");
        assert!(!result.overall_success);
        assert_eq!(result.counts.failed, 2);
        assert_eq!(result.message.as_deref(), Some("runner exited with code 101"));
    }
}
