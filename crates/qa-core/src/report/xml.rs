//! Machine-readable XML report.

use crate::domain::ReportRenderError;
use crate::report::{escape_markup as esc, QAReport, ReportFormat, ReportRenderer};

#[derive(Debug, Clone, Copy, Default)]
pub struct XmlRenderer;

impl ReportRenderer for XmlRenderer {
    fn format(&self) -> ReportFormat {
        ReportFormat::Xml
    }

    fn render(&self, report: &QAReport) -> Result<String, ReportRenderError> {
        Ok(render_xml(report))
    }
}

fn render_xml(report: &QAReport) -> String {
    let s = &report.summary;
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(&format!(
        "<qa-report schema-version=\"{}\" run-id=\"{}\" environment=\"{}\" generated-at=\"{}\" status=\"{}\" verdict=\"{}\" exit-code=\"{}\">\n",
        esc(&report.schema_version),
        report.run_id,
        report.environment,
        report.generated_at.to_rfc3339(),
        report.status.as_str(),
        report.gate.verdict,
        report.gate.exit_code
    ));
    if let Some(reason) = &report.abort_reason {
        out.push_str(&format!("  <abort-reason>{}</abort-reason>\n", esc(reason)));
    }

    out.push_str("  <infra>\n");
    for check in &report.infra {
        out.push_str(&format!(
            "    <check component=\"{}\" status=\"{}\" critical=\"{}\">{}</check>\n",
            esc(&check.component),
            serde_token(&check.status),
            check.critical,
            esc(&check.message)
        ));
    }
    out.push_str("  </infra>\n");

    out.push_str("  <suites>\n");
    for r in report.results.iter() {
        out.push_str(&format!(
            "    <suite kind=\"{}\" outcome=\"{}\" success=\"{}\" total=\"{}\" passed=\"{}\" failed=\"{}\" skipped=\"{}\" duration-ms=\"{}\"",
            r.kind,
            serde_token(&r.outcome),
            r.overall_success,
            r.counts.total,
            r.counts.passed,
            r.counts.failed,
            r.counts.skipped,
            r.duration_ms
        ));
        match &r.message {
            Some(m) => out.push_str(&format!(">{}</suite>\n", esc(m))),
            None => out.push_str("/>\n"),
        }
    }
    out.push_str("  </suites>\n");

    out.push_str("  <rules>\n");
    for o in &report.outcomes {
        out.push_str(&format!(
            "    <rule name=\"{}\" category=\"{}\" severity=\"{}\" passed=\"{}\">{}</rule>\n",
            esc(&o.rule),
            o.category,
            o.severity,
            o.passed,
            esc(&o.message)
        ));
    }
    out.push_str("  </rules>\n");

    out.push_str(&format!(
        "  <summary suites=\"{}\" suites-succeeded=\"{}\" tests=\"{}\" tests-passed=\"{}\" tests-failed=\"{}\" rules=\"{}\" rules-blocking=\"{}\" rules-warned=\"{}\" quality-score=\"{:.1}\"/>\n",
        s.suites_total,
        s.suites_succeeded,
        s.tests.total,
        s.tests.passed,
        s.tests.failed,
        s.rules_total,
        s.rules_blocking,
        s.rules_warned,
        s.quality_score
    ));
    out.push_str("</qa-report>\n");
    out
}

/// The snake_case serde name of a unit enum variant.
fn serde_token<T: serde::Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(s)) => s,
        _ => String::new(),
    }
}
