//! Run configuration resolution.
//!
//! [`resolve`] turns an environment name plus optional [`ConfigOverrides`]
//! into an immutable [`RunConfiguration`]. Built-in defaults exist per
//! environment; overrides are a shallow merge where every field present in
//! the overrides replaces the default wholesale. Per-suite and threshold
//! overrides merge field by field.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{ConfigError, SuiteKind};
use crate::gate::RejectionThreshold;
use crate::report::ReportFormat;
use crate::rules::{build_catalog, default_rules, environment_rules, RuleSpec, ValidationRule};

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Named environment a run is resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Production,
    Ci,
    Custom,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Ci => "ci",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            "ci" => Ok(Self::Ci),
            "custom" => Ok(Self::Custom),
            _ => Err(ConfigError::UnknownEnvironment {
                name: s.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Tunables for a single suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteSettings {
    pub enabled: bool,
    /// Upper bound on one invocation, enforced by the orchestrator.
    pub timeout_secs: u64,
    /// Whether the suite may parallelise internally.
    pub parallel: bool,
    /// Concurrency bound inside the suite (e.g. virtual users).
    pub max_concurrency: Option<u32>,
    pub max_duration_secs: Option<u64>,
    pub iterations: Option<u32>,
    /// Runner command line; empty means no runner is configured.
    pub command: Vec<String>,
}

impl SuiteSettings {
    fn new(enabled: bool, timeout_secs: u64) -> Self {
        Self {
            enabled,
            timeout_secs,
            parallel: false,
            max_concurrency: None,
            max_duration_secs: None,
            iterations: None,
            command: Vec::new(),
        }
    }
}

/// Numeric thresholds referenced by the default rule catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleThresholds {
    /// Minimum unit coverage percentage.
    pub min_coverage: f64,
    /// Minimum integration pass rate percentage.
    pub min_integration_pass_rate: f64,
    pub max_average_response_ms: f64,
    /// Maximum performance error rate as a fraction.
    pub max_error_rate: f64,
    /// Minimum throughput in requests per second.
    pub min_throughput: f64,
    pub min_acceptance_score: f64,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            min_coverage: 80.0,
            min_integration_pass_rate: 95.0,
            max_average_response_ms: 500.0,
            max_error_rate: 0.01,
            min_throughput: 100.0,
            min_acceptance_score: 85.0,
        }
    }
}

/// When a configured webhook is notified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyOn {
    Always,
    #[default]
    Failure,
}

/// Optional run notifications. Absent settings mean no notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotificationSettings {
    pub webhook_url: String,
    #[serde(default)]
    pub on: NotifyOn,
    #[serde(default = "default_notify_timeout")]
    pub timeout_secs: u64,
}

fn default_notify_timeout() -> u64 {
    10
}

/// An infrastructure probe: a command whose exit status reports a component's health.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InfraProbe {
    pub component: String,
    pub command: Vec<String>,
    #[serde(default = "default_true")]
    pub critical: bool,
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_probe_timeout() -> u64 {
    30
}

/// Fully resolved, immutable configuration for one orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunConfiguration {
    pub environment: Environment,
    /// Settings for every suite kind, enabled or not.
    pub suites: BTreeMap<SuiteKind, SuiteSettings>,
    /// How many suites may run at once (1 = sequential).
    pub max_parallel_suites: usize,
    pub thresholds: RuleThresholds,
    pub rejection_threshold: RejectionThreshold,
    /// Formats rendered at the end of the run, in order.
    pub report_formats: Vec<ReportFormat>,
    pub report_dir: Option<PathBuf>,
    pub notifications: Option<NotificationSettings>,
    pub infra_checks: Vec<InfraProbe>,
    pub verbose: bool,
    /// Ordered rule catalog.
    pub rules: Vec<ValidationRule>,
}

impl RunConfiguration {
    pub fn suite(&self, kind: SuiteKind) -> Option<&SuiteSettings> {
        self.suites.get(&kind)
    }

    pub fn is_enabled(&self, kind: SuiteKind) -> bool {
        self.suite(kind).map_or(false, |s| s.enabled)
    }

    /// Enabled suites in pipeline order.
    pub fn enabled_suites(&self) -> Vec<SuiteKind> {
        SuiteKind::ALL
            .into_iter()
            .filter(|k| self.is_enabled(*k))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

/// Field-by-field overrides for one suite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuiteOverrides {
    pub enabled: Option<bool>,
    pub timeout_secs: Option<u64>,
    pub parallel: Option<bool>,
    pub max_concurrency: Option<u32>,
    pub max_duration_secs: Option<u64>,
    pub iterations: Option<u32>,
    pub command: Option<Vec<String>>,
}

impl SuiteOverrides {
    fn apply(&self, settings: &mut SuiteSettings) {
        if let Some(v) = self.enabled {
            settings.enabled = v;
        }
        if let Some(v) = self.timeout_secs {
            settings.timeout_secs = v;
        }
        if let Some(v) = self.parallel {
            settings.parallel = v;
        }
        if let Some(v) = self.max_concurrency {
            settings.max_concurrency = Some(v);
        }
        if let Some(v) = self.max_duration_secs {
            settings.max_duration_secs = Some(v);
        }
        if let Some(v) = self.iterations {
            settings.iterations = Some(v);
        }
        if let Some(v) = &self.command {
            settings.command = v.clone();
        }
    }

    fn merge(self, later: Self) -> Self {
        Self {
            enabled: later.enabled.or(self.enabled),
            timeout_secs: later.timeout_secs.or(self.timeout_secs),
            parallel: later.parallel.or(self.parallel),
            max_concurrency: later.max_concurrency.or(self.max_concurrency),
            max_duration_secs: later.max_duration_secs.or(self.max_duration_secs),
            iterations: later.iterations.or(self.iterations),
            command: later.command.or(self.command),
        }
    }
}

/// Field-by-field overrides for [`RuleThresholds`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThresholdOverrides {
    pub min_coverage: Option<f64>,
    pub min_integration_pass_rate: Option<f64>,
    pub max_average_response_ms: Option<f64>,
    pub max_error_rate: Option<f64>,
    pub min_throughput: Option<f64>,
    pub min_acceptance_score: Option<f64>,
}

impl ThresholdOverrides {
    fn apply(&self, t: &mut RuleThresholds) {
        if let Some(v) = self.min_coverage {
            t.min_coverage = v;
        }
        if let Some(v) = self.min_integration_pass_rate {
            t.min_integration_pass_rate = v;
        }
        if let Some(v) = self.max_average_response_ms {
            t.max_average_response_ms = v;
        }
        if let Some(v) = self.max_error_rate {
            t.max_error_rate = v;
        }
        if let Some(v) = self.min_throughput {
            t.min_throughput = v;
        }
        if let Some(v) = self.min_acceptance_score {
            t.min_acceptance_score = v;
        }
    }

    fn merge(self, later: Self) -> Self {
        Self {
            min_coverage: later.min_coverage.or(self.min_coverage),
            min_integration_pass_rate: later
                .min_integration_pass_rate
                .or(self.min_integration_pass_rate),
            max_average_response_ms: later
                .max_average_response_ms
                .or(self.max_average_response_ms),
            max_error_rate: later.max_error_rate.or(self.max_error_rate),
            min_throughput: later.min_throughput.or(self.min_throughput),
            min_acceptance_score: later.min_acceptance_score.or(self.min_acceptance_score),
        }
    }
}

/// Overrides applied on top of an environment's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    /// When set, exactly these suites are enabled.
    pub enabled_suites: Option<Vec<SuiteKind>>,
    pub suites: BTreeMap<SuiteKind, SuiteOverrides>,
    pub max_parallel_suites: Option<usize>,
    pub thresholds: ThresholdOverrides,
    pub rejection_threshold: Option<RejectionThreshold>,
    pub report_formats: Option<Vec<ReportFormat>>,
    pub report_dir: Option<PathBuf>,
    pub notifications: Option<NotificationSettings>,
    pub infra_checks: Option<Vec<InfraProbe>>,
    pub verbose: Option<bool>,
    /// Declarative rules appended after the environment catalog.
    pub extra_rules: Vec<RuleSpec>,
}

impl ConfigOverrides {
    /// Parse overrides from TOML.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Layer `later` on top of `self`; fields set in `later` win.
    /// Extra rules from both layers are kept, `self` first.
    pub fn merge(self, later: ConfigOverrides) -> ConfigOverrides {
        let mut suites = self.suites;
        for (kind, over) in later.suites {
            let merged = match suites.remove(&kind) {
                Some(existing) => existing.merge(over),
                None => over,
            };
            suites.insert(kind, merged);
        }

        let mut extra_rules = self.extra_rules;
        extra_rules.extend(later.extra_rules);

        ConfigOverrides {
            enabled_suites: later.enabled_suites.or(self.enabled_suites),
            suites,
            max_parallel_suites: later.max_parallel_suites.or(self.max_parallel_suites),
            thresholds: self.thresholds.merge(later.thresholds),
            rejection_threshold: later.rejection_threshold.or(self.rejection_threshold),
            report_formats: later.report_formats.or(self.report_formats),
            report_dir: later.report_dir.or(self.report_dir),
            notifications: later.notifications.or(self.notifications),
            infra_checks: later.infra_checks.or(self.infra_checks),
            verbose: later.verbose.or(self.verbose),
            extra_rules,
        }
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Resolves run configurations, optionally with additional programmatic rules.
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    extra_rules: Vec<ValidationRule>,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule appended to every resolved catalog.
    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.extra_rules.push(rule);
        self
    }

    /// Resolve `environment_name` with optional overrides.
    pub fn resolve(
        &self,
        environment_name: &str,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<RunConfiguration, ConfigError> {
        let environment: Environment = environment_name.parse()?;
        let mut config = defaults_for(environment);

        if let Some(o) = overrides {
            apply_overrides(&mut config, o);
        }
        validate(&config)?;

        let mut rules = default_rules(&config.thresholds);
        rules.extend(environment_rules(environment));
        if let Some(o) = overrides {
            rules.extend(o.extra_rules.iter().cloned().map(ValidationRule::from));
        }
        rules.extend(self.extra_rules.iter().cloned());
        config.rules = build_catalog(rules)?;

        tracing::debug!(
            environment = %environment,
            enabled = ?config.enabled_suites(),
            rules = config.rules.len(),
            "resolved run configuration"
        );
        Ok(config)
    }
}

/// Resolve a configuration with the built-in catalog only.
pub fn resolve(
    environment_name: &str,
    overrides: Option<&ConfigOverrides>,
) -> Result<RunConfiguration, ConfigError> {
    ConfigResolver::default().resolve(environment_name, overrides)
}

fn defaults_for(environment: Environment) -> RunConfiguration {
    let mut unit = SuiteSettings::new(true, 300);
    let mut integration = SuiteSettings::new(true, 600);
    let mut performance = SuiteSettings::new(true, 900);
    let mut acceptance = SuiteSettings::new(true, 1200);

    performance.max_concurrency = Some(50);
    performance.max_duration_secs = Some(60);
    acceptance.iterations = Some(1);

    let (max_parallel_suites, report_formats, verbose) = match environment {
        Environment::Development => {
            unit.parallel = true;
            performance.enabled = false;
            acceptance.enabled = false;
            (2, vec![ReportFormat::Json, ReportFormat::Html], true)
        }
        Environment::Production => (
            1,
            vec![ReportFormat::Json, ReportFormat::Html, ReportFormat::Xml],
            false,
        ),
        Environment::Ci => {
            unit.parallel = true;
            acceptance.enabled = false;
            performance.max_concurrency = Some(20);
            performance.max_duration_secs = Some(30);
            (4, vec![ReportFormat::Json, ReportFormat::Xml], false)
        }
        Environment::Custom => (1, vec![ReportFormat::Json], false),
    };

    let suites = BTreeMap::from([
        (SuiteKind::Unit, unit),
        (SuiteKind::Integration, integration),
        (SuiteKind::Performance, performance),
        (SuiteKind::Acceptance, acceptance),
    ]);

    RunConfiguration {
        environment,
        suites,
        max_parallel_suites,
        thresholds: RuleThresholds::default(),
        rejection_threshold: RejectionThreshold::CriticalOnly,
        report_formats,
        report_dir: None,
        notifications: None,
        infra_checks: Vec::new(),
        verbose,
        rules: Vec::new(),
    }
}

fn apply_overrides(config: &mut RunConfiguration, o: &ConfigOverrides) {
    for (kind, over) in &o.suites {
        if let Some(settings) = config.suites.get_mut(kind) {
            over.apply(settings);
        }
    }
    if let Some(enabled) = &o.enabled_suites {
        for (kind, settings) in config.suites.iter_mut() {
            settings.enabled = enabled.contains(kind);
        }
    }
    if let Some(v) = o.max_parallel_suites {
        config.max_parallel_suites = v;
    }
    o.thresholds.apply(&mut config.thresholds);
    if let Some(v) = o.rejection_threshold {
        config.rejection_threshold = v;
    }
    if let Some(v) = &o.report_formats {
        let mut formats = Vec::new();
        for f in v {
            if !formats.contains(f) {
                formats.push(*f);
            }
        }
        config.report_formats = formats;
    }
    if let Some(v) = &o.report_dir {
        config.report_dir = Some(v.clone());
    }
    if let Some(v) = &o.notifications {
        config.notifications = Some(v.clone());
    }
    if let Some(v) = &o.infra_checks {
        config.infra_checks = v.clone();
    }
    if let Some(v) = o.verbose {
        config.verbose = v;
    }
}

fn validate(config: &RunConfiguration) -> Result<(), ConfigError> {
    if config.max_parallel_suites == 0 {
        return Err(invalid("max_parallel_suites", "must be at least 1"));
    }
    for (kind, settings) in &config.suites {
        if settings.enabled && settings.timeout_secs == 0 {
            return Err(invalid(
                &format!("suites.{kind}.timeout_secs"),
                "must be at least 1",
            ));
        }
    }
    if config.report_formats.is_empty() {
        return Err(invalid("report_formats", "at least one format is required"));
    }
    let t = &config.thresholds;
    if !(0.0..=1.0).contains(&t.max_error_rate) {
        return Err(invalid("thresholds.max_error_rate", "must be a fraction in [0, 1]"));
    }
    for (field, value) in [
        ("thresholds.min_coverage", t.min_coverage),
        ("thresholds.min_integration_pass_rate", t.min_integration_pass_rate),
        ("thresholds.min_acceptance_score", t.min_acceptance_score),
    ] {
        if !(0.0..=100.0).contains(&value) {
            return Err(invalid(field, "must be a percentage in [0, 100]"));
        }
    }
    if let Some(n) = &config.notifications {
        if n.webhook_url.trim().is_empty() {
            return Err(invalid("notifications.webhook_url", "must not be empty"));
        }
    }
    for probe in &config.infra_checks {
        if probe.command.is_empty() {
            return Err(invalid(
                &format!("infra_checks.{}.command", probe.component),
                "must not be empty",
            ));
        }
    }
    Ok(())
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidSetting {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
