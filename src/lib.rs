pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod osint;
pub mod reporting;
pub mod target;
pub mod utils;

// Re-export main types for easier access
pub use cli::App;
pub use config::Config;
pub use error::{OsintError, OsintResult};
pub use history::{HistoryRecord, HistoryStore, JsonlHistoryStore, MemoryHistoryStore};
pub use osint::{SearchOrchestrator, SearchResult, SourceResult, Sources};
pub use reporting::{ExportFormat, ExportManager};
pub use target::{classify, TargetType};
