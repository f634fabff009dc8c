mod format;
mod generator;
pub mod formats;

pub use format::{ExportFormat, ReportGenerator};
pub use generator::ExportManager;
