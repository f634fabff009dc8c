use crate::error::OsintResult;
use crate::osint::model::SearchResult;
use crate::reporting::format::{ExportFormat, ReportGenerator};

/// Pretty-printed serde rendering
#[derive(Debug, Default)]
pub struct JsonReportGenerator;

impl JsonReportGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl ReportGenerator for JsonReportGenerator {
    fn render(&self, result: &SearchResult) -> OsintResult<String> {
        Ok(serde_json::to_string_pretty(result)?)
    }

    fn supported_format(&self) -> ExportFormat {
        ExportFormat::Json
    }
}
