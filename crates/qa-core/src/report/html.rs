//! Human-readable HTML report.
//!
//! Suite-level summary only: per-scenario acceptance detail lives in the
//! JSON form.

use crate::domain::{CheckStatus, ReportRenderError};
use crate::report::{escape_markup as esc, QAReport, ReportFormat, ReportRenderer, RunStatus};

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl ReportRenderer for HtmlRenderer {
    fn format(&self) -> ReportFormat {
        ReportFormat::Html
    }

    fn render(&self, report: &QAReport) -> Result<String, ReportRenderError> {
        Ok(render_html(report))
    }
}

fn render_html(report: &QAReport) -> String {
    let s = &report.summary;
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str(&format!(
        "<title>QA report {} ({})</title>\n",
        report.run_id, report.environment
    ));
    out.push_str("</head>\n<body>\n");
    out.push_str(&format!(
        "<h1>QA report: <span class=\"verdict-{v}\">{v}</span></h1>\n",
        v = report.gate.verdict
    ));
    out.push_str("<ul class=\"meta\">\n");
    out.push_str(&format!("<li>run: {}</li>\n", report.run_id));
    out.push_str(&format!("<li>environment: {}</li>\n", report.environment));
    out.push_str(&format!(
        "<li>generated: {}</li>\n",
        report.generated_at.to_rfc3339()
    ));
    out.push_str(&format!("<li>status: {}</li>\n", report.status.as_str()));
    if report.status == RunStatus::Aborted {
        out.push_str(&format!(
            "<li class=\"abort\">abort reason: {}</li>\n",
            esc(report.abort_reason.as_deref().unwrap_or("unknown"))
        ));
    }
    out.push_str(&format!(
        "<li>quality score: {:.1}</li>\n",
        s.quality_score
    ));
    out.push_str("</ul>\n");

    if !report.infra.is_empty() {
        out.push_str("<h2>Infrastructure</h2>\n<table>\n");
        out.push_str("<tr><th>component</th><th>status</th><th>message</th></tr>\n");
        for check in &report.infra {
            let status = match check.status {
                CheckStatus::Pass => "pass",
                CheckStatus::Fail => "fail",
                CheckStatus::Warning => "warning",
            };
            out.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                esc(&check.component),
                status,
                esc(&check.message)
            ));
        }
        out.push_str("</table>\n");
    }

    out.push_str("<h2>Suites</h2>\n<table>\n");
    out.push_str(
        "<tr><th>suite</th><th>success</th><th>total</th><th>passed</th><th>failed</th><th>skipped</th><th>duration (ms)</th><th>message</th></tr>\n",
    );
    for r in report.results.iter() {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            r.kind,
            if r.overall_success { "yes" } else { "no" },
            r.counts.total,
            r.counts.passed,
            r.counts.failed,
            r.counts.skipped,
            r.duration_ms,
            esc(r.message.as_deref().unwrap_or(""))
        ));
    }
    out.push_str("</table>\n");

    out.push_str("<h2>Rules</h2>\n<table>\n");
    out.push_str("<tr><th>rule</th><th>category</th><th>severity</th><th>result</th><th>message</th></tr>\n");
    for o in &report.outcomes {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            esc(&o.rule),
            o.category,
            o.severity,
            if o.passed { "pass" } else { "fail" },
            esc(&o.message)
        ));
    }
    out.push_str("</table>\n");

    out.push_str(&format!(
        "<p class=\"summary\">suites {}/{} succeeded; rules {} passed, {} blocking, {} warned</p>\n",
        s.suites_succeeded, s.suites_total, s.rules_passed, s.rules_blocking, s.rules_warned
    ));
    out.push_str("</body>\n</html>\n");
    out
}
