//! Rule evaluation.
//!
//! Every rule in the catalog is evaluated exactly once, in catalog order.
//! A predicate that errors or panics yields a failed outcome but never
//! prevents the remaining rules from running.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::domain::{AggregatedResult, RuleEvaluationError, RuleOutcome};
use crate::obs;
use crate::rules::ValidationRule;

pub const EVALUATION_ERROR_MESSAGE: &str = "evaluation error";

/// Evaluate `rules` against `result`, one outcome per rule in input order.
pub fn evaluate(rules: &[ValidationRule], result: &AggregatedResult) -> Vec<RuleOutcome> {
    rules.iter().map(|rule| evaluate_one(rule, result)).collect()
}

fn evaluate_one(rule: &ValidationRule, result: &AggregatedResult) -> RuleOutcome {
    let checked = panic::catch_unwind(AssertUnwindSafe(|| rule.predicate.check(result)))
        .unwrap_or_else(|payload| Err(RuleEvaluationError::Panicked(panic_message(&*payload))));

    match checked {
        Ok(verdict) => RuleOutcome {
            rule: rule.name.clone(),
            category: rule.category,
            severity: rule.severity,
            passed: verdict.passed,
            message: verdict.message,
            detail: None,
        },
        Err(err) => {
            obs::emit_rule_evaluation_error(&rule.name, &err);
            RuleOutcome {
                rule: rule.name.clone(),
                category: rule.category,
                severity: rule.severity,
                passed: false,
                message: EVALUATION_ERROR_MESSAGE.to_string(),
                detail: Some(err.to_string()),
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
