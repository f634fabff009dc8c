use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, info};

use super::format::{ExportFormat, ReportGenerator};
use super::formats::{JsonReportGenerator, TextReportGenerator};
use crate::error::{OsintError, OsintResult};
use crate::osint::model::SearchResult;
use crate::utils::sanitize_filename;

/// Writes rendered results to disk
pub struct ExportManager {
    generators: HashMap<ExportFormat, Box<dyn ReportGenerator>>,
    export_dir: PathBuf,
}

impl ExportManager {
    pub fn new(export_dir: PathBuf) -> Self {
        let mut manager = Self {
            generators: HashMap::new(),
            export_dir,
        };

        manager.register_generator(Box::new(TextReportGenerator::new()));
        manager.register_generator(Box::new(JsonReportGenerator::new()));

        manager
    }

    pub fn register_generator(&mut self, generator: Box<dyn ReportGenerator>) {
        let format = generator.supported_format();
        debug!("Registering export generator for format: {}", format);
        self.generators.insert(format, generator);
    }

    /// `<exports>/osint/<target>_<YYYYmmdd_HHMMSS>.<ext>`
    pub fn default_path(&self, result: &SearchResult, format: ExportFormat) -> PathBuf {
        let filename = format!(
            "{}_{}.{}",
            sanitize_filename(result.target()),
            Local::now().format("%Y%m%d_%H%M%S"),
            format.extension()
        );

        self.export_dir.join("osint").join(filename)
    }

    pub fn render(&self, result: &SearchResult, format: ExportFormat) -> OsintResult<String> {
        let generator = self.generators
            .get(&format)
            .ok_or_else(|| OsintError::InvalidInput(format!("No generator found for format {}", format)))?;

        generator.render(result)
    }

    /// Write `result` to `path` (or the default path) and return where it landed
    pub async fn export(
        &self,
        result: &SearchResult,
        path: Option<&Path>,
        format: ExportFormat,
    ) -> OsintResult<PathBuf> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => self.default_path(result, format),
        };

        let export_error = |message: String| OsintError::ExportError {
            path: path.clone(),
            message,
        };

        let content = self.render(result, format).map_err(|e| export_error(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| export_error(format!("Failed to create directory: {}", e)))?;
        }

        tokio::fs::write(&path, content)
            .await
            .map_err(|e| export_error(e.to_string()))?;

        info!("Exported {} result for {} to {}", format, result.target(), path.display());
        Ok(path)
    }
}
