//! The built-in rule catalog.

use std::collections::HashSet;

use crate::config::{Environment, RuleThresholds};
use crate::domain::{ConfigError, RuleCategory, Severity, SuiteKind};
use crate::rules::{RuleCheck, ValidationRule};

/// Rules every environment starts from, parameterised by `thresholds`.
pub fn default_rules(thresholds: &RuleThresholds) -> Vec<ValidationRule> {
    vec![
        ValidationRule::builtin(
            "unit-coverage-min",
            RuleCategory::Coverage,
            Severity::Critical,
            RuleCheck::MinCoverage {
                min: thresholds.min_coverage,
            },
        ),
        ValidationRule::builtin(
            "unit-tests-pass",
            RuleCategory::Reliability,
            Severity::Major,
            RuleCheck::NoFailedTests {
                suite: SuiteKind::Unit,
            },
        ),
        ValidationRule::builtin(
            "integration-pass-rate",
            RuleCategory::Reliability,
            Severity::Critical,
            RuleCheck::MinPassRate {
                suite: SuiteKind::Integration,
                min: thresholds.min_integration_pass_rate,
            },
        ),
        ValidationRule::builtin(
            "performance-response-time",
            RuleCategory::Performance,
            Severity::Major,
            RuleCheck::MaxAverageResponseTime {
                max_ms: thresholds.max_average_response_ms,
            },
        ),
        ValidationRule::builtin(
            "performance-error-rate",
            RuleCategory::Reliability,
            Severity::Critical,
            RuleCheck::MaxErrorRate {
                max: thresholds.max_error_rate,
            },
        ),
        ValidationRule::builtin(
            "performance-throughput",
            RuleCategory::Performance,
            Severity::Minor,
            RuleCheck::MinThroughput {
                min: thresholds.min_throughput,
            },
        ),
        ValidationRule::builtin(
            "acceptance-score",
            RuleCategory::Usability,
            Severity::Major,
            RuleCheck::MinAcceptanceScore {
                min: thresholds.min_acceptance_score,
            },
        ),
        ValidationRule::builtin(
            "acceptance-scenarios-pass",
            RuleCategory::Usability,
            Severity::Minor,
            RuleCheck::AllScenariosPass { tag: None },
        ),
    ]
}

/// Environment-specific rules appended after [`default_rules`].
pub fn environment_rules(environment: Environment) -> Vec<ValidationRule> {
    match environment {
        Environment::Production => vec![
            ValidationRule::builtin(
                "security-scenarios-pass",
                RuleCategory::Security,
                Severity::Critical,
                RuleCheck::AllScenariosPass {
                    tag: Some("security".to_string()),
                },
            ),
            ValidationRule::builtin(
                "suite-execution-health",
                RuleCategory::Reliability,
                Severity::Critical,
                RuleCheck::NoExecutionFailures,
            ),
        ],
        Environment::Ci => vec![ValidationRule::builtin(
            "suite-execution-health",
            RuleCategory::Reliability,
            Severity::Major,
            RuleCheck::NoExecutionFailures,
        )],
        Environment::Development | Environment::Custom => Vec::new(),
    }
}

/// Collect rules into an ordered catalog, rejecting duplicate names.
pub fn build_catalog(
    rules: impl IntoIterator<Item = ValidationRule>,
) -> Result<Vec<ValidationRule>, ConfigError> {
    let mut seen = HashSet::new();
    let mut catalog = Vec::new();
    for rule in rules {
        if !seen.insert(rule.name.clone()) {
            return Err(ConfigError::DuplicateRuleName { name: rule.name });
        }
        catalog.push(rule);
    }
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(rules: &[ValidationRule]) -> Vec<&str> {
        rules.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn default_catalog_order_is_stable() {
        let rules = default_rules(&RuleThresholds::default());
        assert_eq!(
            names(&rules),
            vec![
                "unit-coverage-min",
                "unit-tests-pass",
                "integration-pass-rate",
                "performance-response-time",
                "performance-error-rate",
                "performance-throughput",
                "acceptance-score",
                "acceptance-scenarios-pass",
            ]
        );
    }

    #[test]
    fn default_severities() {
        let rules = default_rules(&RuleThresholds::default());
        let critical: Vec<_> = rules
            .iter()
            .filter(|r| r.severity == Severity::Critical)
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(
            critical,
            vec!["unit-coverage-min", "integration-pass-rate", "performance-error-rate"]
        );
    }

    #[test]
    fn production_adds_security_rule() {
        let rules = environment_rules(Environment::Production);
        assert_eq!(names(&rules), vec!["security-scenarios-pass", "suite-execution-health"]);
        assert!(rules.iter().all(|r| r.severity == Severity::Critical));
        assert!(environment_rules(Environment::Development).is_empty());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut rules = default_rules(&RuleThresholds::default());
        rules.push(rules[0].clone());
        let err = build_catalog(rules).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateRuleName { name } if name == "unit-coverage-min"));
    }
}
