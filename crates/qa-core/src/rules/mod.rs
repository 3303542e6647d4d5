//! Validation rules.
//!
//! A [`ValidationRule`] pairs catalog metadata (name, category, severity)
//! with a predicate over the [`AggregatedResult`]. Predicates are either a
//! declarative [`RuleCheck`] (serde-tagged so it can be written in override
//! files) or a custom closure registered from code.

pub mod catalog;
pub mod check;
pub mod engine;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};

use crate::domain::{AggregatedResult, RuleCategory, RuleEvaluationError, Severity};

pub use catalog::{build_catalog, default_rules, environment_rules};
pub use check::RuleCheck;
pub use engine::evaluate;

/// What a predicate concluded about the aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleVerdict {
    pub passed: bool,
    pub message: String,
}

impl RuleVerdict {
    pub fn pass(message: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
        }
    }

    pub fn check(passed: bool, message: impl Into<String>) -> Self {
        Self {
            passed,
            message: message.into(),
        }
    }
}

type PredicateFn =
    dyn Fn(&AggregatedResult) -> Result<RuleVerdict, RuleEvaluationError> + Send + Sync;

/// A predicate supplied as a closure.
///
/// Compared by identity: two custom predicates are equal only when they share
/// the same allocation.
#[derive(Clone)]
pub struct CustomPredicate(Arc<PredicateFn>);

impl CustomPredicate {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&AggregatedResult) -> Result<RuleVerdict, RuleEvaluationError>
            + Send
            + Sync
            + 'static,
    {
        Self(Arc::new(f))
    }
}

impl fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomPredicate(..)")
    }
}

impl PartialEq for CustomPredicate {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Serialize for CustomPredicate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("custom")
    }
}

/// The predicate half of a rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RulePredicate {
    Builtin(RuleCheck),
    Custom(CustomPredicate),
}

impl RulePredicate {
    pub fn check(&self, result: &AggregatedResult) -> Result<RuleVerdict, RuleEvaluationError> {
        match self {
            Self::Builtin(check) => check.check(result),
            Self::Custom(custom) => (custom.0)(result),
        }
    }
}

/// A named, categorised rule in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationRule {
    pub name: String,
    pub description: String,
    pub category: RuleCategory,
    pub severity: Severity,
    pub predicate: RulePredicate,
}

impl ValidationRule {
    /// A rule backed by a declarative check.
    pub fn builtin(
        name: impl Into<String>,
        category: RuleCategory,
        severity: Severity,
        check: RuleCheck,
    ) -> Self {
        Self {
            name: name.into(),
            description: check.describe(),
            category,
            severity,
            predicate: RulePredicate::Builtin(check),
        }
    }

    /// A rule backed by a closure.
    pub fn custom<F>(name: impl Into<String>, category: RuleCategory, severity: Severity, f: F) -> Self
    where
        F: Fn(&AggregatedResult) -> Result<RuleVerdict, RuleEvaluationError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            description: String::new(),
            category,
            severity,
            predicate: RulePredicate::Custom(CustomPredicate::new(f)),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Declarative rule as written in an overrides file.
///
/// ```toml
/// [[extra_rules]]
/// name = "unit-coverage-strict"
/// category = "coverage"
/// severity = "major"
/// check = { type = "min_coverage", min = 90.0 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category: RuleCategory,
    pub severity: Severity,
    pub check: RuleCheck,
}

impl From<RuleSpec> for ValidationRule {
    fn from(spec: RuleSpec) -> Self {
        let rule = ValidationRule::builtin(spec.name, spec.category, spec.severity, spec.check);
        match spec.description {
            Some(description) => rule.with_description(description),
            None => rule,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SuiteKind;

    #[test]
    fn custom_predicates_compare_by_identity() {
        let a = CustomPredicate::new(|_| Ok(RuleVerdict::pass("ok")));
        let b = CustomPredicate::new(|_| Ok(RuleVerdict::pass("ok")));
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn rule_spec_parses_from_toml() {
        let spec: RuleSpec = toml::from_str(
            r#"
            name = "integration-clean"
            category = "reliability"
            severity = "critical"
            check = { type = "no_failed_tests", suite = "integration" }
            "#,
        )
        .expect("parse rule spec");

        let rule = ValidationRule::from(spec);
        assert_eq!(rule.name, "integration-clean");
        assert_eq!(rule.severity, Severity::Critical);
        assert_eq!(
            rule.predicate,
            RulePredicate::Builtin(RuleCheck::NoFailedTests {
                suite: SuiteKind::Integration
            })
        );
        assert!(!rule.description.is_empty());
    }
}
