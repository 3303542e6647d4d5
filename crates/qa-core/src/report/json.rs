use crate::domain::ReportRenderError;
use crate::report::{QAReport, ReportFormat, ReportRenderer};

/// Canonical pretty-printed JSON form of a report.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl ReportRenderer for JsonRenderer {
    fn format(&self) -> ReportFormat {
        ReportFormat::Json
    }

    fn render(&self, report: &QAReport) -> Result<String, ReportRenderError> {
        Ok(serde_json::to_string_pretty(report)?)
    }
}
