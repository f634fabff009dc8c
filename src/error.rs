use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OsintError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("DNS error: {0}")]
    DnsError(String),

    #[error("WHOIS error: {0}")]
    WhoisError(String),

    #[error("Timeout error: {operation} exceeded {seconds} seconds")]
    TimeoutError {
        operation: String,
        seconds: u64,
    },

    #[error("{message}")]
    ProviderError {
        source_name: String,
        message: String,
    },

    #[error("File error: {path:?} - {message}")]
    FileError {
        path: PathBuf,
        message: String,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("History error: {0}")]
    HistoryError(String),

    #[error("Export failed: {path:?} - {message}")]
    ExportError {
        path: PathBuf,
        message: String,
    },

    #[error("Unexpected error: {0}")]
    UnexpectedError(String),
}

impl From<anyhow::Error> for OsintError {
    fn from(error: anyhow::Error) -> Self {
        OsintError::UnexpectedError(error.to_string())
    }
}

impl From<serde_json::Error> for OsintError {
    fn from(error: serde_json::Error) -> Self {
        OsintError::SerializationError(error.to_string())
    }
}

pub type OsintResult<T> = std::result::Result<T, OsintError>;
