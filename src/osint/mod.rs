pub mod model;
pub mod orchestrator;
pub mod sources;

pub use model::{SearchResult, SourceResult};
pub use orchestrator::{SearchOrchestrator, Sources};
