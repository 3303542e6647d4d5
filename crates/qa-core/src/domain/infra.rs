//! Infrastructure pre-check results.

use serde::{Deserialize, Serialize};

/// Status of one infrastructure component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
    Warning,
}

/// One entry returned by the infrastructure pre-check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfraCheckResult {
    pub component: String,
    pub status: CheckStatus,
    pub message: String,
    /// Only critical failures abort the pipeline.
    pub critical: bool,
}

impl InfraCheckResult {
    pub fn pass(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: CheckStatus::Pass,
            message: message.into(),
            critical: false,
        }
    }

    pub fn fail(component: impl Into<String>, message: impl Into<String>, critical: bool) -> Self {
        Self {
            component: component.into(),
            status: CheckStatus::Fail,
            message: message.into(),
            critical,
        }
    }

    pub fn warning(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: CheckStatus::Warning,
            message: message.into(),
            critical: false,
        }
    }

    /// Whether this entry must abort the pipeline.
    pub fn is_blocking(&self) -> bool {
        self.critical && self.status == CheckStatus::Fail
    }
}

/// Components whose failure aborts the run, in input order.
pub fn blocking_failures(results: &[InfraCheckResult]) -> Vec<&InfraCheckResult> {
    results.iter().filter(|r| r.is_blocking()).collect()
}
