use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Deserialize};

use crate::error::{OsintError, OsintResult};
use crate::osint::model::SearchResult;

/// Export format
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Text,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Json => "json",
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "txt" | "text" => Some(ExportFormat::Text),
            "json" => Some(ExportFormat::Json),
            _ => None,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Text => f.write_str("text"),
            ExportFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = OsintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s)
            .ok_or_else(|| OsintError::InvalidInput(format!("Unsupported export format: {}", s)))
    }
}

/// Renders a search result into one export format
pub trait ReportGenerator: Send + Sync {
    fn render(&self, result: &SearchResult) -> OsintResult<String>;

    fn supported_format(&self) -> ExportFormat;
}
