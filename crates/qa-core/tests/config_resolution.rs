use qa_core::{
    resolve, ConfigError, ConfigOverrides, ConfigResolver, Environment, NotifyOn,
    RejectionThreshold, ReportFormat, RuleCategory, RuleVerdict, Severity, SuiteKind,
    ValidationRule,
};

#[test]
fn every_environment_resolves_with_unique_rule_names() {
    for env in ["development", "production", "ci", "custom"] {
        let config = resolve(env, None).expect("resolve");
        let mut names: Vec<_> = config.rules.iter().map(|r| r.name.as_str()).collect();
        let before = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), before, "{env} catalog has duplicate names");
    }
}

#[test]
fn production_catalog_appends_environment_rules() {
    let config = resolve("production", None).expect("resolve");
    let names: Vec<_> = config.rules.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names.len(), 10);
    assert_eq!(&names[8..], &["security-scenarios-pass", "suite-execution-health"]);
}

#[test]
fn full_override_file_applies() {
    let toml = r#"
        enabled_suites = ["unit", "acceptance"]
        max_parallel_suites = 2
        rejection_threshold = "critical_or_major"
        report_formats = ["xml"]
        report_dir = "target/qa"
        verbose = true

        [suites.acceptance]
        command = ["./run-acceptance.sh"]
        iterations = 3

        [thresholds]
        min_acceptance_score = 70.0

        [notifications]
        webhook_url = "http://hooks.internal/qa"
        on = "always"

        [[infra_checks]]
        component = "database"
        command = ["pg_isready"]

        [[infra_checks]]
        component = "cache"
        command = ["redis-cli", "ping"]
        critical = false

        [[extra_rules]]
        name = "acceptance-smoke"
        category = "usability"
        severity = "critical"
        check = { type = "all_scenarios_pass", tag = "smoke" }
    "#;
    let overrides = ConfigOverrides::from_toml_str(toml).expect("parse");
    let config = resolve("custom", Some(&overrides)).expect("resolve");

    assert_eq!(config.environment, Environment::Custom);
    assert_eq!(
        config.enabled_suites(),
        vec![SuiteKind::Unit, SuiteKind::Acceptance]
    );
    assert_eq!(config.rejection_threshold, RejectionThreshold::CriticalOrMajor);
    assert_eq!(config.report_formats, vec![ReportFormat::Xml]);
    assert!(config.verbose);

    let acceptance = config.suite(SuiteKind::Acceptance).expect("acceptance settings");
    assert_eq!(acceptance.iterations, Some(3));
    assert_eq!(acceptance.command, vec!["./run-acceptance.sh".to_string()]);
    assert_eq!(config.thresholds.min_acceptance_score, 70.0);

    let notify = config.notifications.as_ref().expect("notifications");
    assert_eq!(notify.on, NotifyOn::Always);
    assert_eq!(notify.timeout_secs, 10);

    assert_eq!(config.infra_checks.len(), 2);
    assert!(config.infra_checks[0].critical);
    assert!(!config.infra_checks[1].critical);

    let last = config.rules.last().expect("rules");
    assert_eq!(last.name, "acceptance-smoke");
    assert_eq!(last.severity, Severity::Critical);
}

#[test]
fn extra_rule_colliding_with_catalog_is_rejected() {
    let overrides = ConfigOverrides::from_toml_str(
        r#"
        [[extra_rules]]
        name = "acceptance-score"
        category = "usability"
        severity = "minor"
        check = { type = "min_acceptance_score", min = 50.0 }
        "#,
    )
    .expect("parse");
    let err = resolve("production", Some(&overrides)).unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateRuleName { name } if name == "acceptance-score"));
}

#[test]
fn empty_format_list_is_invalid() {
    let overrides = ConfigOverrides {
        report_formats: Some(Vec::new()),
        ..Default::default()
    };
    let err = resolve("ci", Some(&overrides)).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidSetting { field, .. } if field == "report_formats"));
}

#[test]
fn zero_timeout_only_matters_for_enabled_suites() {
    let disabled = ConfigOverrides::from_toml_str(
        r#"
        [suites.acceptance]
        timeout_secs = 0
        "#,
    )
    .expect("parse");
    // acceptance is disabled in ci
    assert!(resolve("ci", Some(&disabled)).is_ok());

    let err = resolve("production", Some(&disabled)).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidSetting { field, .. } if field == "suites.acceptance.timeout_secs"));
}

#[test]
fn programmatic_rules_are_appended_last() {
    let resolver = ConfigResolver::new().with_rule(
        ValidationRule::custom("release-window", RuleCategory::Other, Severity::Minor, |_| {
            Ok(RuleVerdict::pass("inside release window"))
        })
        .with_description("deploys only during the release window"),
    );
    let config = resolver.resolve("development", None).expect("resolve");
    let last = config.rules.last().expect("rules");
    assert_eq!(last.name, "release-window");
    assert_eq!(last.description, "deploys only during the release window");
}

#[test]
fn resolved_configuration_serializes() {
    let config = resolve("ci", None).expect("resolve");
    let json = serde_json::to_value(&config).expect("serialize");
    assert_eq!(json["environment"], "ci");
    assert_eq!(json["rejection_threshold"], "critical_only");
    assert_eq!(json["suites"]["unit"]["enabled"], true);
    assert_eq!(json["rules"][0]["name"], "unit-coverage-min");
    assert_eq!(json["rules"][0]["predicate"]["type"], "min_coverage");
}
