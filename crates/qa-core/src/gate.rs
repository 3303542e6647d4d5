//! Quality gate decision.
//!
//! Turns the rule outcomes of a run into a [`GateDecision`]: an accept/reject
//! verdict plus the process exit code a CI caller should see. Only failures at
//! or above the configured [`RejectionThreshold`] block the release; other
//! failures are warnings in the report.

use serde::{Deserialize, Serialize};

use crate::domain::{RuleOutcome, Severity};

/// Exit code for an accepted run.
pub const EXIT_ACCEPT: i32 = 0;
/// Exit code for a rejected or aborted run.
pub const EXIT_REJECT: i32 = 1;
/// Exit code for an internal error (bad configuration, unusable report path).
pub const EXIT_INTERNAL_ERROR: i32 = 2;

/// Which failed-rule severities block a release.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionThreshold {
    /// Only critical failures reject.
    #[default]
    CriticalOnly,
    /// Critical and major failures reject.
    CriticalOrMajor,
}

impl RejectionThreshold {
    pub fn blocks(self, severity: Severity) -> bool {
        match self {
            Self::CriticalOnly => severity == Severity::Critical,
            Self::CriticalOrMajor => severity >= Severity::Major,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Accept,
    Reject,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final gate outcome for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    pub verdict: Verdict,
    pub exit_code: i32,
    /// Names of the failed rules that caused a rejection, in catalog order.
    pub blocking_rules: Vec<String>,
}

impl GateDecision {
    /// Decision for a run that aborted before evaluation completed.
    pub fn aborted() -> Self {
        Self {
            verdict: Verdict::Reject,
            exit_code: EXIT_REJECT,
            blocking_rules: Vec::new(),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.verdict == Verdict::Accept
    }
}

/// Decide the gate for `outcomes`.
///
/// Reject iff at least one failed outcome's severity is blocked by `threshold`.
pub fn decide(outcomes: &[RuleOutcome], threshold: RejectionThreshold) -> GateDecision {
    let blocking_rules: Vec<String> = outcomes
        .iter()
        .filter(|o| !o.passed && threshold.blocks(o.severity))
        .map(|o| o.rule.clone())
        .collect();

    if blocking_rules.is_empty() {
        GateDecision {
            verdict: Verdict::Accept,
            exit_code: EXIT_ACCEPT,
            blocking_rules,
        }
    } else {
        GateDecision {
            verdict: Verdict::Reject,
            exit_code: EXIT_REJECT,
            blocking_rules,
        }
    }
}

/// Failed outcomes that did not block the gate.
pub fn warnings(outcomes: &[RuleOutcome], threshold: RejectionThreshold) -> Vec<&RuleOutcome> {
    outcomes
        .iter()
        .filter(|o| !o.passed && !threshold.blocks(o.severity))
        .collect()
}
