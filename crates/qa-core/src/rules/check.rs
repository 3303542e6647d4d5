//! Built-in declarative rule checks.

use serde::{Deserialize, Serialize};

use crate::domain::{
    AggregatedResult, RuleEvaluationError, SuiteKind, SuiteMetrics, SuiteOutcome, SuiteResult,
};
use crate::rules::RuleVerdict;

/// A declarative predicate over the aggregate.
///
/// A check whose target suite was not run passes as not applicable; a target
/// suite that ran but produced no metrics is an evaluation error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleCheck {
    /// Unit coverage percentage must be at least `min`.
    MinCoverage { min: f64 },
    /// The suite must report zero failed tests.
    NoFailedTests { suite: SuiteKind },
    /// Passed / executed percentage for the suite must be at least `min`.
    MinPassRate { suite: SuiteKind, min: f64 },
    /// Performance average response time must not exceed `max_ms`.
    MaxAverageResponseTime { max_ms: f64 },
    /// Performance error rate (fraction) must not exceed `max`.
    MaxErrorRate { max: f64 },
    /// Performance throughput (req/s) must be at least `min`.
    MinThroughput { min: f64 },
    /// Acceptance overall score must be at least `min`.
    MinAcceptanceScore { min: f64 },
    /// Every acceptance scenario (optionally only those carrying `tag`) passed.
    AllScenariosPass {
        #[serde(default)]
        tag: Option<String>,
    },
    /// The suite's own `overall_success` flag must be set.
    SuiteSucceeded { suite: SuiteKind },
    /// No suite failed to execute, timed out or was cancelled.
    NoExecutionFailures,
}

impl RuleCheck {
    /// One-line human description, used as the default rule description.
    pub fn describe(&self) -> String {
        match self {
            Self::MinCoverage { min } => format!("unit coverage >= {min:.1}%"),
            Self::NoFailedTests { suite } => format!("{suite} suite has no failed tests"),
            Self::MinPassRate { suite, min } => format!("{suite} pass rate >= {min:.1}%"),
            Self::MaxAverageResponseTime { max_ms } => {
                format!("average response time <= {max_ms:.0}ms")
            }
            Self::MaxErrorRate { max } => format!("error rate <= {:.2}%", max * 100.0),
            Self::MinThroughput { min } => format!("throughput >= {min:.1} req/s"),
            Self::MinAcceptanceScore { min } => format!("acceptance score >= {min:.1}"),
            Self::AllScenariosPass { tag: Some(tag) } => {
                format!("all acceptance scenarios tagged '{tag}' pass")
            }
            Self::AllScenariosPass { tag: None } => "all acceptance scenarios pass".to_string(),
            Self::SuiteSucceeded { suite } => format!("{suite} suite succeeded"),
            Self::NoExecutionFailures => "every suite executed to completion".to_string(),
        }
    }

    pub fn check(&self, result: &AggregatedResult) -> Result<RuleVerdict, RuleEvaluationError> {
        match self {
            Self::MinCoverage { min } => {
                let Some((_, metrics)) = target(result, SuiteKind::Unit)? else {
                    return Ok(not_applicable(SuiteKind::Unit));
                };
                let SuiteMetrics::Unit { coverage } = metrics else {
                    return Err(mismatch(SuiteKind::Unit));
                };
                let coverage = finite("coverage", *coverage)?;
                Ok(RuleVerdict::check(
                    coverage >= *min,
                    format!("coverage {coverage:.1}% (required >= {min:.1}%)"),
                ))
            }
            Self::NoFailedTests { suite } => {
                let Some((suite_result, _)) = target(result, *suite)? else {
                    return Ok(not_applicable(*suite));
                };
                let counts = suite_result.counts;
                Ok(RuleVerdict::check(
                    counts.failed == 0,
                    format!("{} of {} {suite} tests failed", counts.failed, counts.total),
                ))
            }
            Self::MinPassRate { suite, min } => {
                let Some((suite_result, _)) = target(result, *suite)? else {
                    return Ok(not_applicable(*suite));
                };
                match suite_result.counts.pass_rate() {
                    Some(rate) => Ok(RuleVerdict::check(
                        rate >= *min,
                        format!("{suite} pass rate {rate:.1}% (required >= {min:.1}%)"),
                    )),
                    None => Ok(RuleVerdict::fail(format!("no {suite} tests were executed"))),
                }
            }
            Self::MaxAverageResponseTime { max_ms } => {
                let (avg, _, _) = match performance(result)? {
                    Some(p) => p,
                    None => return Ok(not_applicable(SuiteKind::Performance)),
                };
                Ok(RuleVerdict::check(
                    avg <= *max_ms,
                    format!("average response time {avg:.0}ms (allowed <= {max_ms:.0}ms)"),
                ))
            }
            Self::MaxErrorRate { max } => {
                let (_, _, error_rate) = match performance(result)? {
                    Some(p) => p,
                    None => return Ok(not_applicable(SuiteKind::Performance)),
                };
                Ok(RuleVerdict::check(
                    error_rate <= *max,
                    format!(
                        "error rate {:.2}% (allowed <= {:.2}%)",
                        error_rate * 100.0,
                        max * 100.0
                    ),
                ))
            }
            Self::MinThroughput { min } => {
                let (_, throughput, _) = match performance(result)? {
                    Some(p) => p,
                    None => return Ok(not_applicable(SuiteKind::Performance)),
                };
                Ok(RuleVerdict::check(
                    throughput >= *min,
                    format!("throughput {throughput:.1} req/s (required >= {min:.1})"),
                ))
            }
            Self::MinAcceptanceScore { min } => {
                let Some((_, metrics)) = target(result, SuiteKind::Acceptance)? else {
                    return Ok(not_applicable(SuiteKind::Acceptance));
                };
                let SuiteMetrics::Acceptance { overall_score, .. } = metrics else {
                    return Err(mismatch(SuiteKind::Acceptance));
                };
                let score = finite("overall_score", *overall_score)?;
                Ok(RuleVerdict::check(
                    score >= *min,
                    format!("acceptance score {score:.1} (required >= {min:.1})"),
                ))
            }
            Self::AllScenariosPass { tag } => {
                let Some((_, metrics)) = target(result, SuiteKind::Acceptance)? else {
                    return Ok(not_applicable(SuiteKind::Acceptance));
                };
                let SuiteMetrics::Acceptance { scenarios, .. } = metrics else {
                    return Err(mismatch(SuiteKind::Acceptance));
                };
                let selected: Vec<_> = scenarios
                    .iter()
                    .filter(|s| tag.as_ref().map_or(true, |t| s.tags.contains(t)))
                    .collect();
                let failed: Vec<&str> = selected
                    .iter()
                    .filter(|s| !s.passed)
                    .map(|s| s.name.as_str())
                    .collect();

                if failed.is_empty() {
                    Ok(RuleVerdict::pass(format!(
                        "{} scenario(s) passed",
                        selected.len()
                    )))
                } else {
                    Ok(RuleVerdict::fail(format!(
                        "{} of {} scenario(s) failed: [{}]",
                        failed.len(),
                        selected.len(),
                        failed.join(", ")
                    )))
                }
            }
            Self::SuiteSucceeded { suite } => match result.get(*suite) {
                None => Ok(not_applicable(*suite)),
                Some(r) if r.overall_success => Ok(RuleVerdict::pass(format!("{suite} suite succeeded"))),
                Some(r) => Ok(RuleVerdict::fail(format!(
                    "{suite} suite failed{}",
                    r.message
                        .as_deref()
                        .map(|m| format!(": {m}"))
                        .unwrap_or_default()
                ))),
            },
            Self::NoExecutionFailures => {
                let broken: Vec<String> = result
                    .iter()
                    .filter(|r| r.outcome != SuiteOutcome::Completed)
                    .map(|r| format!("{} ({})", r.kind, r.message.as_deref().unwrap_or("failed")))
                    .collect();
                if broken.is_empty() {
                    Ok(RuleVerdict::pass(format!(
                        "{} suite(s) executed to completion",
                        result.len()
                    )))
                } else {
                    Ok(RuleVerdict::fail(format!(
                        "suites did not complete: [{}]",
                        broken.join(", ")
                    )))
                }
            }
        }
    }
}

fn target(
    result: &AggregatedResult,
    kind: SuiteKind,
) -> Result<Option<(&SuiteResult, &SuiteMetrics)>, RuleEvaluationError> {
    let Some(suite) = result.get(kind) else {
        return Ok(None);
    };
    let metrics = suite
        .metrics
        .as_ref()
        .ok_or(RuleEvaluationError::MissingMetrics { suite: kind })?;
    Ok(Some((suite, metrics)))
}

/// `(average_response_time_ms, throughput, error_rate)` of the performance suite.
fn performance(result: &AggregatedResult) -> Result<Option<(f64, f64, f64)>, RuleEvaluationError> {
    let Some((_, metrics)) = target(result, SuiteKind::Performance)? else {
        return Ok(None);
    };
    let SuiteMetrics::Performance {
        average_response_time_ms,
        throughput,
        error_rate,
        ..
    } = metrics
    else {
        return Err(mismatch(SuiteKind::Performance));
    };
    Ok(Some((
        finite("average_response_time_ms", *average_response_time_ms)?,
        finite("throughput", *throughput)?,
        finite("error_rate", *error_rate)?,
    )))
}

fn finite(field: &str, value: f64) -> Result<f64, RuleEvaluationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(RuleEvaluationError::Predicate(format!(
            "{field} is not a finite number"
        )))
    }
}

fn mismatch(suite: SuiteKind) -> RuleEvaluationError {
    RuleEvaluationError::MetricsMismatch { suite }
}

fn not_applicable(suite: SuiteKind) -> RuleVerdict {
    RuleVerdict::pass(format!("not applicable: {suite} suite was not run"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AggregatedResultBuilder, ScenarioResult, TestCounts};

    fn unit(coverage: f64, failed: u32) -> SuiteResult {
        SuiteResult::completed(
            SuiteKind::Unit,
            TestCounts::new(100, 100 - failed, failed, 0),
            SuiteMetrics::Unit { coverage },
            failed == 0,
            10,
        )
    }

    fn aggregate(results: Vec<SuiteResult>) -> AggregatedResult {
        let mut builder = AggregatedResultBuilder::new();
        for r in results {
            builder.record(r);
        }
        builder.freeze()
    }

    #[test]
    fn min_coverage_boundary_is_inclusive() {
        let check = RuleCheck::MinCoverage { min: 80.0 };
        assert!(check.check(&aggregate(vec![unit(80.0, 0)])).unwrap().passed);
        assert!(!check.check(&aggregate(vec![unit(79.9, 0)])).unwrap().passed);
    }

    #[test]
    fn skipped_suite_is_not_applicable() {
        let verdict = RuleCheck::MinCoverage { min: 80.0 }
            .check(&AggregatedResult::default())
            .unwrap();
        assert!(verdict.passed);
        assert!(verdict.message.starts_with("not applicable"));
    }

    #[test]
    fn failed_suite_without_metrics_is_an_error() {
        let agg = aggregate(vec![SuiteResult::execution_failed(
            SuiteKind::Unit,
            "runner missing",
            0,
        )]);
        let err = RuleCheck::MinCoverage { min: 80.0 }.check(&agg).unwrap_err();
        assert_eq!(
            err,
            RuleEvaluationError::MissingMetrics {
                suite: SuiteKind::Unit
            }
        );
    }

    #[test]
    fn mismatched_metrics_are_an_error() {
        let bogus = SuiteResult::completed(
            SuiteKind::Unit,
            TestCounts::default(),
            SuiteMetrics::Integration { pass_rate: 100.0 },
            true,
            0,
        );
        let err = RuleCheck::MinCoverage { min: 1.0 }
            .check(&aggregate(vec![bogus]))
            .unwrap_err();
        assert!(matches!(err, RuleEvaluationError::MetricsMismatch { .. }));
    }

    #[test]
    fn nan_metric_is_an_error() {
        let err = RuleCheck::MinCoverage { min: 1.0 }
            .check(&aggregate(vec![unit(f64::NAN, 0)]))
            .unwrap_err();
        assert!(matches!(err, RuleEvaluationError::Predicate(_)));
    }

    #[test]
    fn tagged_scenarios_filter() {
        let acceptance = SuiteResult::completed(
            SuiteKind::Acceptance,
            TestCounts::new(2, 1, 1, 0),
            SuiteMetrics::Acceptance {
                overall_score: 90.0,
                scenarios: vec![
                    ScenarioResult {
                        name: "login".to_string(),
                        passed: true,
                        tags: vec!["security".to_string()],
                        message: None,
                    },
                    ScenarioResult {
                        name: "dark-mode".to_string(),
                        passed: false,
                        tags: vec![],
                        message: Some("contrast".to_string()),
                    },
                ],
            },
            false,
            0,
        );
        let agg = aggregate(vec![acceptance]);

        let security = RuleCheck::AllScenariosPass {
            tag: Some("security".to_string()),
        };
        assert!(security.check(&agg).unwrap().passed);

        let all = RuleCheck::AllScenariosPass { tag: None };
        let verdict = all.check(&agg).unwrap();
        assert!(!verdict.passed);
        assert!(verdict.message.contains("dark-mode"));
    }

    #[test]
    fn no_execution_failures_lists_broken_suites() {
        let agg = aggregate(vec![
            unit(90.0, 0),
            SuiteResult::timed_out(SuiteKind::Integration, 1_000),
        ]);
        let verdict = RuleCheck::NoExecutionFailures.check(&agg).unwrap();
        assert!(!verdict.passed);
        assert!(verdict.message.contains("integration (timeout)"));
    }

    #[test]
    fn check_round_trips_through_serde_tag() {
        let check = RuleCheck::MinPassRate {
            suite: SuiteKind::Integration,
            min: 95.0,
        };
        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["type"], "min_pass_rate");
        assert_eq!(json["suite"], "integration");
    }
}
