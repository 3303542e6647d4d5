//! QA Gate CLI
//!
//! The `qa-gate` command runs the configured test suites, evaluates the rule
//! catalog and exits with the quality-gate verdict.
//!
//! ## Commands
//!
//! - `run`: execute a full orchestration run
//! - `config`: print the resolved configuration as JSON
//! - `rules`: list the resolved rule catalog
//!
//! Exit codes: 0 accept, 1 reject or abort, 2 internal error.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{warn, Level};

use qa_core::{
    resolve, CheckStatus, ConfigOverrides, ReportFormat, RunConfiguration, RunStatus, SuiteKind,
    EXIT_INTERNAL_ERROR,
};
use qa_pipeline::{CancellationHandle, Orchestrator, PipelineRun};

#[derive(Parser)]
#[command(name = "qa-gate")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "QA orchestration and quality gate", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// Environment to resolve (development, production, ci, custom)
    #[arg(short, long, env = "QA_ENV")]
    env: String,

    /// TOML overrides file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the enabled suites and decide the quality gate
    Run {
        #[command(flatten)]
        config: ConfigArgs,

        /// Run only these suites (comma separated)
        #[arg(long, value_delimiter = ',')]
        only: Vec<SuiteKind>,

        /// Report formats to render (comma separated)
        #[arg(long, value_delimiter = ',')]
        format: Vec<ReportFormat>,

        /// Directory for report artifacts
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Maximum number of suites running at once
        #[arg(long)]
        parallel: Option<usize>,
    },

    /// Print the resolved configuration as JSON
    Config {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// List the resolved rule catalog
    Rules {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

/// Overrides contributed by `run` flags.
#[derive(Debug, Default)]
struct RunFlags {
    only: Vec<SuiteKind>,
    format: Vec<ReportFormat>,
    output_dir: Option<PathBuf>,
    parallel: Option<usize>,
    verbose: bool,
}

impl RunFlags {
    fn into_overrides(self) -> ConfigOverrides {
        ConfigOverrides {
            enabled_suites: (!self.only.is_empty()).then_some(self.only),
            report_formats: (!self.format.is_empty()).then_some(self.format),
            report_dir: self.output_dir,
            max_parallel_suites: self.parallel,
            verbose: self.verbose.then_some(true),
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    qa_core::init_tracing(cli.json, level);

    let code = match cli.command {
        Commands::Run {
            config,
            only,
            format,
            output_dir,
            parallel,
        } => {
            let flags = RunFlags {
                only,
                format,
                output_dir,
                parallel,
                verbose: cli.verbose,
            };
            match cmd_run(&config, flags).await {
                Ok(code) => code,
                Err(e) => {
                    eprintln!("error: {e:#}");
                    println!("{}", error_summary_line());
                    EXIT_INTERNAL_ERROR
                }
            }
        }
        Commands::Config { config } => report_error(cmd_config(&config)),
        Commands::Rules { config } => report_error(cmd_rules(&config)),
    };

    ExitCode::from(u8::try_from(code).unwrap_or(2))
}

fn report_error(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e:#}");
            EXIT_INTERNAL_ERROR
        }
    }
}

fn load_overrides(path: Option<&Path>) -> Result<ConfigOverrides> {
    let Some(path) = path else {
        return Ok(ConfigOverrides::default());
    };
    let text =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    ConfigOverrides::from_toml_str(&text).with_context(|| format!("parse {}", path.display()))
}

fn resolve_config(args: &ConfigArgs, cli_layer: ConfigOverrides) -> Result<RunConfiguration> {
    let overrides = load_overrides(args.config.as_deref())?.merge(cli_layer);
    resolve(&args.env, Some(&overrides))
        .with_context(|| format!("resolve configuration for environment '{}'", args.env))
}

/// Execute a full run and return the process exit code.
async fn cmd_run(args: &ConfigArgs, flags: RunFlags) -> Result<i32> {
    let config = resolve_config(args, flags.into_overrides())?;
    let verbose = config.verbose;

    let orchestrator = Orchestrator::new(config);
    let handle = orchestrator.cancellation_handle();
    tokio::spawn(async move {
        let mut interrupts = 0u32;
        while tokio::signal::ctrl_c().await.is_ok() {
            interrupts += 1;
            if let Some(code) = on_interrupt(interrupts, &handle) {
                eprintln!("error: interrupted again, exiting without a report");
                println!("{}", error_summary_line());
                std::process::exit(code);
            }
        }
    });

    let run = orchestrator.run().await;
    print_run(&run, verbose);

    if let Some(e) = &run.artifact_error {
        eprintln!("error: failed to write report artifacts: {e}");
    }
    println!("{}", summary_line(&run));
    Ok(run.exit_code())
}

/// First interrupt cancels the run; any later one asks for an immediate exit.
fn on_interrupt(count: u32, handle: &CancellationHandle) -> Option<i32> {
    if count == 1 {
        warn!("interrupt received, cancelling run (press Ctrl-C again to force exit)");
        handle.cancel();
        None
    } else {
        Some(EXIT_INTERNAL_ERROR)
    }
}

fn print_run(run: &PipelineRun, verbose: bool) {
    let report = &run.report;
    println!("Run ID: {}", report.run_id);
    println!("Environment: {}", report.environment);
    println!("State: {} ({}ms)", run.state, run.duration_ms);
    if report.status == RunStatus::Aborted {
        println!(
            "Aborted: {}",
            report.abort_reason.as_deref().unwrap_or("unknown")
        );
    }
    println!();

    for check in report
        .infra
        .iter()
        .filter(|c| verbose || c.status != CheckStatus::Pass)
    {
        println!("  infra {} {:?}: {}", check.component, check.status, check.message);
    }

    for r in report.results.iter() {
        let status = if r.overall_success { "✓" } else { "✗" };
        print!(
            "  {} {} ({}ms, {}/{} passed",
            status, r.kind, r.duration_ms, r.counts.passed, r.counts.total
        );
        match &r.message {
            Some(m) => println!(", {m})"),
            None => println!(")"),
        }
    }

    if !report.outcomes.is_empty() {
        println!();
        println!("Rules:");
        for o in report.outcomes.iter().filter(|o| verbose || !o.passed) {
            let status = if o.passed { "✓" } else { "✗" };
            println!("  {} [{}] {}: {}", status, o.severity, o.rule, o.message);
            if let Some(detail) = &o.detail {
                println!("      {detail}");
            }
        }
    }

    for (format, err) in &run.rendered.errors {
        println!("Report {format} not rendered: {err}");
    }
    for path in &run.artifacts {
        println!("Wrote {}", path.display());
    }

    println!();
    println!(
        "Gate: {} (score {:.1})",
        report.gate.verdict, report.summary.quality_score
    );
}

fn summary_line(run: &PipelineRun) -> String {
    let s = &run.report.summary;
    format!(
        "total={} passed={} failed={} warnings={} verdict={}",
        s.tests.total,
        s.tests.passed,
        s.tests.failed,
        s.warnings(),
        run.report.gate.verdict
    )
}

fn error_summary_line() -> String {
    "total=0 passed=0 failed=0 warnings=0 verdict=error".to_string()
}

fn cmd_config(args: &ConfigArgs) -> Result<()> {
    let config = resolve_config(args, ConfigOverrides::default())?;
    let json = serde_json::to_string_pretty(&config).context("serialize configuration")?;
    println!("{json}");
    Ok(())
}

fn cmd_rules(args: &ConfigArgs) -> Result<()> {
    let config = resolve_config(args, ConfigOverrides::default())?;
    println!("Rules for {} ({} total):", config.environment, config.rules.len());
    for rule in &config.rules {
        println!(
            "  {:<28} {:<9} {:<12} {}",
            rule.name, rule.severity, rule.category, rule.description
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_parse_lists() {
        let cli = Cli::try_parse_from([
            "qa-gate",
            "run",
            "--env",
            "ci",
            "--only",
            "unit,integration",
            "--format",
            "json,xml",
            "--parallel",
            "3",
        ])
        .expect("parse");
        let Commands::Run {
            config,
            only,
            format,
            parallel,
            ..
        } = cli.command
        else {
            panic!("expected run command");
        };
        assert_eq!(config.env, "ci");
        assert_eq!(only, vec![SuiteKind::Unit, SuiteKind::Integration]);
        assert_eq!(format, vec![ReportFormat::Json, ReportFormat::Xml]);
        assert_eq!(parallel, Some(3));
    }

    #[test]
    fn unknown_format_is_rejected_by_parser() {
        let parsed = Cli::try_parse_from(["qa-gate", "run", "--env", "ci", "--format", "pdf"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn cli_flags_override_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("qa.toml");
        std::fs::write(
            &path,
            "max_parallel_suites = 2\nreport_formats = [\"json\", \"html\"]\n",
        )
        .expect("write overrides");

        let args = ConfigArgs {
            env: "production".to_string(),
            config: Some(path),
        };
        let flags = RunFlags {
            only: vec![SuiteKind::Unit],
            parallel: Some(4),
            ..Default::default()
        };
        let config = resolve_config(&args, flags.into_overrides()).expect("resolve");
        assert_eq!(config.max_parallel_suites, 4);
        assert_eq!(config.report_formats, vec![ReportFormat::Json, ReportFormat::Html]);
        assert_eq!(config.enabled_suites(), vec![SuiteKind::Unit]);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let args = ConfigArgs {
            env: "ci".to_string(),
            config: Some(PathBuf::from("/nonexistent/qa.toml")),
        };
        let err = resolve_config(&args, ConfigOverrides::default()).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/qa.toml"));
    }

    #[test]
    fn unknown_environment_is_an_error() {
        let args = ConfigArgs {
            env: "staging".to_string(),
            config: None,
        };
        let err = resolve_config(&args, ConfigOverrides::default()).unwrap_err();
        assert!(format!("{err:#}").contains("unknown environment: staging"));
    }

    #[test]
    fn second_interrupt_forces_exit() {
        let handle = CancellationHandle::new();
        assert_eq!(on_interrupt(1, &handle), None);
        assert!(handle.is_cancelled());
        assert_eq!(on_interrupt(2, &handle), Some(EXIT_INTERNAL_ERROR));
        assert_eq!(on_interrupt(3, &handle), Some(EXIT_INTERNAL_ERROR));
    }

    #[test]
    fn error_summary_line_shape() {
        assert_eq!(
            error_summary_line(),
            "total=0 passed=0 failed=0 warnings=0 verdict=error"
        );
    }
}
