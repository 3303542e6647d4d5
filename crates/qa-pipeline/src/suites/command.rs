//! Process execution for command-backed suites.
//!
//! A suite runner is any executable that prints a JSON summary on stdout.
//! Suite tunables are passed through `QA_*` environment variables. The
//! summary may be the whole of stdout or its last JSON line, so runners can
//! log freely before printing it.

use std::process::Stdio;
use std::time::Instant;

use serde::de::DeserializeOwned;
use tokio::process::Command;

use qa_core::{RunConfiguration, SuiteExecutionError, SuiteKind, SuiteResult};

/// Captured result of one runner invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code, -1 when terminated by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// The runner invocation for one suite kind.
pub struct SuiteCommand<'a> {
    kind: SuiteKind,
    config: &'a RunConfiguration,
}

impl<'a> SuiteCommand<'a> {
    pub fn new(kind: SuiteKind, config: &'a RunConfiguration) -> Self {
        Self { kind, config }
    }

    /// Environment passed to the runner.
    pub fn env(&self) -> Vec<(&'static str, String)> {
        let mut env = vec![
            ("QA_SUITE", self.kind.to_string()),
            ("QA_ENVIRONMENT", self.config.environment.to_string()),
        ];
        if let Some(settings) = self.config.suite(self.kind) {
            env.push(("QA_PARALLEL", settings.parallel.to_string()));
            env.push(("QA_TIMEOUT_SECS", settings.timeout_secs.to_string()));
            if let Some(v) = settings.max_concurrency {
                env.push(("QA_MAX_CONCURRENCY", v.to_string()));
            }
            if let Some(v) = settings.max_duration_secs {
                env.push(("QA_MAX_DURATION_SECS", v.to_string()));
            }
            if let Some(v) = settings.iterations {
                env.push(("QA_ITERATIONS", v.to_string()));
            }
        }
        env
    }

    /// Spawn the runner and wait for it. The child is killed if this future
    /// is dropped, so an orchestrator timeout stops the process.
    pub async fn execute(&self) -> Result<CommandOutput, SuiteExecutionError> {
        let command = self
            .config
            .suite(self.kind)
            .map(|s| s.command.as_slice())
            .unwrap_or_default();
        let Some((exe, args)) = command.split_first() else {
            return Err(SuiteExecutionError::new(
                self.kind,
                "no runner command configured",
            ));
        };

        let start = Instant::now();
        let child = Command::new(exe)
            .args(args)
            .envs(self.env())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SuiteExecutionError::new(self.kind, format!("failed to spawn {exe}: {e}")))?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| SuiteExecutionError::new(self.kind, format!("failed to wait for {exe}: {e}")))?;

        let result = CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
        };

        if self.config.verbose && !result.stderr.is_empty() {
            tracing::info!(suite = %self.kind, stderr = %result.stderr.trim_end(), "runner stderr");
        } else {
            tracing::debug!(suite = %self.kind, exit_code = result.exit_code, "runner exited");
        }
        Ok(result)
    }
}

/// Parse the runner's JSON summary from stdout.
pub fn parse_summary<T: DeserializeOwned>(
    kind: SuiteKind,
    output: &CommandOutput,
) -> Result<T, SuiteExecutionError> {
    let stdout = output.stdout.trim();
    let parsed = serde_json::from_str::<T>(stdout).or_else(|whole| {
        match stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| line.starts_with('{'))
        {
            Some(line) => serde_json::from_str::<T>(line),
            None => Err(whole),
        }
    });

    parsed.map_err(|e| {
        let mut cause = format!("unparseable {kind} summary: {e}");
        if !output.success() {
            cause.push_str(&format!(
                " (exit code {}; stderr: {})",
                output.exit_code,
                tail(&output.stderr, 200)
            ));
        }
        SuiteExecutionError::new(kind, cause)
    })
}

/// Mark a result parsed from a runner that exited non-zero as partial.
pub fn annotate(result: SuiteResult, output: &CommandOutput) -> SuiteResult {
    if output.success() || result.message.is_some() {
        result
    } else {
        result.with_message(format!("runner exited with code {}", output.exit_code))
    }
}

fn tail(s: &str, max_chars: usize) -> &str {
    let s = s.trim_end();
    match s.char_indices().rev().nth(max_chars.saturating_sub(1)) {
        Some((idx, _)) if idx > 0 => &s[idx..],
        _ => s,
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use qa_core::{resolve, ConfigOverrides, RunConfiguration, SuiteKind, SuiteOverrides};

    /// A ci configuration whose `kind` runner is `sh -c <script>`.
    pub fn config_with_script(kind: SuiteKind, script: &str) -> RunConfiguration {
        let overrides = ConfigOverrides {
            enabled_suites: Some(vec![kind]),
            suites: [(
                kind,
                SuiteOverrides {
                    command: Some(vec!["sh".to_string(), "-c".to_string(), script.to_string()]),
                    ..Default::default()
                },
            )]
            .into_iter()
            .collect(),
            ..Default::default()
        };
        resolve("ci", Some(&overrides)).expect("resolve test configuration")
    }
}
