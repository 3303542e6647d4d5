//! Performance suite adapter.
//!
//! Runner summary:
//!
//! ```json
//! {"requests": 5000, "errors": 12, "average_response_time_ms": 180.5,
//!  "p95_response_time_ms": 420.0, "throughput": 250.0}
//! ```
//!
//! Every request counts as one test; failed requests are failed tests.

use async_trait::async_trait;
use serde::Deserialize;

use qa_core::{
    RuleThresholds, RunConfiguration, SuiteExecutionError, SuiteKind, SuiteMetrics, SuiteResult,
    TestCounts,
};

use crate::suites::command::{annotate, parse_summary, SuiteCommand};
use crate::suites::Runnable;

#[derive(Debug, Clone, Deserialize)]
pub struct PerformanceSummary {
    pub requests: u64,
    #[serde(default)]
    pub errors: u64,
    pub average_response_time_ms: f64,
    #[serde(default)]
    pub p95_response_time_ms: Option<f64>,
    /// Requests per second.
    pub throughput: f64,
}

impl PerformanceSummary {
    pub fn error_rate(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.errors.min(self.requests) as f64 / self.requests as f64
        }
    }

    pub fn into_result(self, thresholds: &RuleThresholds, duration_ms: u64) -> SuiteResult {
        let error_rate = self.error_rate();
        let errors = self.errors.min(self.requests);
        let total = saturate(self.requests);
        let failed = saturate(errors);
        let overall_success = error_rate <= thresholds.max_error_rate
            && self.average_response_time_ms <= thresholds.max_average_response_ms;

        SuiteResult::completed(
            SuiteKind::Performance,
            TestCounts::new(total, total - failed, failed, 0),
            SuiteMetrics::Performance {
                requests: self.requests,
                average_response_time_ms: self.average_response_time_ms,
                p95_response_time_ms: self.p95_response_time_ms,
                throughput: self.throughput,
                error_rate,
            },
            overall_success,
            duration_ms,
        )
    }
}

fn saturate(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PerformanceSuite;

#[async_trait]
impl Runnable for PerformanceSuite {
    fn kind(&self) -> SuiteKind {
        SuiteKind::Performance
    }

    async fn run(&self, config: &RunConfiguration) -> Result<SuiteResult, SuiteExecutionError> {
        let output = SuiteCommand::new(SuiteKind::Performance, config)
            .execute()
            .await?;
        let summary: PerformanceSummary = parse_summary(SuiteKind::Performance, &output)?;
        Ok(annotate(
            summary.into_result(&config.thresholds, output.duration_ms),
            &output,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suites::command::test_support::config_with_script;

    fn summary(errors: u64, avg: f64) -> PerformanceSummary {
        PerformanceSummary {
            requests: 1000,
            errors,
            average_response_time_ms: avg,
            p95_response_time_ms: None,
            throughput: 120.0,
        }
    }

    #[test]
    fn success_requires_error_rate_and_latency_within_bounds() {
        let t = RuleThresholds::default();
        assert!(summary(10, 500.0).into_result(&t, 0).overall_success);
        assert!(!summary(11, 100.0).into_result(&t, 0).overall_success);
        assert!(!summary(0, 501.0).into_result(&t, 0).overall_success);
    }

    #[test]
    fn zero_requests_has_zero_error_rate() {
        let s = PerformanceSummary {
            requests: 0,
            errors: 0,
            average_response_time_ms: 0.0,
            p95_response_time_ms: None,
            throughput: 0.0,
        };
        assert_eq!(s.error_rate(), 0.0);
    }

    #[tokio::test]
    async fn performance_runner_summary_is_translated() {
        let config = config_with_script(
            SuiteKind::Performance,
            r#"echo '{"requests": 200, "errors": 1, "average_response_time_ms": 80.0, "p95_response_time_ms": 150.0, "throughput": 400.0}'"#,
        );
        let result = PerformanceSuite.run(&config).await.expect("run");
        assert!(result.overall_success);
        assert_eq!(result.counts.total, 200);
        assert_eq!(result.counts.failed, 1);
        match result.metrics {
            Some(SuiteMetrics::Performance { error_rate, p95_response_time_ms, .. }) => {
                assert_eq!(error_rate, 0.005);
                assert_eq!(p95_response_time_ms, Some(150.0));
            }
            other => panic!("unexpected metrics: {other:?}"),
        }
    }
}
