//! Rule metadata and rule outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// What aspect of quality a rule judges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Coverage,
    Reliability,
    Performance,
    Security,
    Usability,
    Other,
}

impl RuleCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Coverage => "coverage",
            Self::Reliability => "reliability",
            Self::Performance => "performance",
            Self::Security => "security",
            Self::Usability => "usability",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule severity, ordered `Minor < Major < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Minor,
    Major,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minor => "minor",
            Self::Major => "major",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of evaluating one rule against the aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleOutcome {
    /// Name of the catalog rule this outcome belongs to.
    pub rule: String,
    pub category: RuleCategory,
    pub severity: Severity,
    pub passed: bool,
    pub message: String,
    /// Diagnostic detail (e.g. the cause of an evaluation error).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
