//! Infrastructure pre-check.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use qa_core::{InfraCheckResult, InfraProbe, RunConfiguration};

/// Validates the infrastructure a run depends on.
///
/// An `Err` is treated by the orchestrator as a critical failure.
#[async_trait]
pub trait InfraCheck: Send + Sync {
    async fn validate(&self) -> qa_core::Result<Vec<InfraCheckResult>>;
}

/// Runs each configured probe command; exit 0 means healthy.
#[derive(Debug, Clone, Default)]
pub struct CommandInfraCheck {
    probes: Vec<InfraProbe>,
}

impl CommandInfraCheck {
    pub fn new(probes: Vec<InfraProbe>) -> Self {
        Self { probes }
    }

    pub fn from_config(config: &RunConfiguration) -> Self {
        Self::new(config.infra_checks.clone())
    }
}

#[async_trait]
impl InfraCheck for CommandInfraCheck {
    async fn validate(&self) -> qa_core::Result<Vec<InfraCheckResult>> {
        Ok(futures::future::join_all(self.probes.iter().map(run_probe)).await)
    }
}

async fn run_probe(probe: &InfraProbe) -> InfraCheckResult {
    let unhealthy = |message: String| {
        if probe.critical {
            InfraCheckResult::fail(&probe.component, message, true)
        } else {
            InfraCheckResult::warning(&probe.component, message)
        }
    };

    let Some((exe, args)) = probe.command.split_first() else {
        return unhealthy("no probe command configured".to_string());
    };

    let child = match Command::new(exe)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => return unhealthy(format!("failed to spawn {exe}: {e}")),
    };

    let timeout = Duration::from_secs(probe.timeout_secs.max(1));
    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) if output.status.success() => {
            InfraCheckResult::pass(&probe.component, "healthy")
        }
        Ok(Ok(output)) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let code = output.status.code().unwrap_or(-1);
            let message = match stderr.trim() {
                "" => format!("probe exited with code {code}"),
                s => format!("probe exited with code {code}: {s}"),
            };
            unhealthy(message)
        }
        Ok(Err(e)) => unhealthy(format!("failed to wait for probe: {e}")),
        Err(_) => unhealthy(format!("probe timed out after {}s", timeout.as_secs())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qa_core::CheckStatus;

    fn probe(component: &str, script: &str, critical: bool) -> InfraProbe {
        InfraProbe {
            component: component.to_string(),
            command: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
            critical,
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn probe_statuses() {
        let check = CommandInfraCheck::new(vec![
            probe("database", "exit 0", true),
            probe("cache", "echo refused >&2; exit 1", false),
            probe("api", "exit 2", true),
        ]);
        let results = check.validate().await.expect("validate");
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].status, CheckStatus::Pass);
        assert_eq!(results[1].status, CheckStatus::Warning);
        assert!(results[1].message.contains("refused"));
        assert_eq!(results[2].status, CheckStatus::Fail);
        assert!(results[2].is_blocking());
    }

    #[tokio::test]
    async fn no_probes_means_nothing_to_check() {
        let results = CommandInfraCheck::default().validate().await.unwrap();
        assert!(results.is_empty());
    }
}
