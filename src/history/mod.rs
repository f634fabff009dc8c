// src/history/mod.rs
//! Append-only log of completed searches

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Serialize, Deserialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[cfg(test)]
use mockall::automock;

use crate::error::{OsintError, OsintResult};
use crate::osint::model::SearchResult;
use crate::target::TargetType;
use crate::utils::timestamp_now;

/// One persisted search. Never updated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: u64,
    pub target: String,
    pub target_type: TargetType,
    pub timestamp: String,
    pub results: SearchResult,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist a result and return its id. Ids increase with every append.
    async fn append(&self, target: &str, target_type: TargetType, result: &SearchResult) -> OsintResult<u64>;

    /// Up to `limit` records, most recent first
    async fn recent(&self, limit: usize) -> OsintResult<Vec<HistoryRecord>>;

    async fn get(&self, id: u64) -> OsintResult<Option<HistoryRecord>>;
}

fn new_record(id: u64, target: &str, target_type: TargetType, result: &SearchResult) -> HistoryRecord {
    HistoryRecord {
        id,
        target: target.to_string(),
        target_type,
        timestamp: result
            .timestamp()
            .map(str::to_string)
            .unwrap_or_else(timestamp_now),
        results: result.clone(),
    }
}

fn newest_first(mut records: Vec<HistoryRecord>, limit: usize) -> Vec<HistoryRecord> {
    records.sort_by(|a, b| b.id.cmp(&a.id));
    records.truncate(limit);
    records
}

/// JSON-lines file store. Ids continue from the highest id already in the file.
pub struct JsonlHistoryStore {
    path: PathBuf,
    next_id: Mutex<u64>,
}

impl JsonlHistoryStore {
    pub async fn open(path: impl Into<PathBuf>) -> OsintResult<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| OsintError::FileError {
                path: parent.to_path_buf(),
                message: format!("Failed to create history directory: {}", e),
            })?;
        }

        let records = Self::read_records(&path).await?;
        let next_id = records.iter().map(|r| r.id).max().map_or(1, |id| id + 1);

        info!("History store at {} ({} records)", path.display(), records.len());

        Ok(Self {
            path,
            next_id: Mutex::new(next_id),
        })
    }

    async fn read_records(path: &Path) -> OsintResult<Vec<HistoryRecord>> {
        if !path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| OsintError::FileError {
            path: path.to_path_buf(),
            message: format!("Failed to read history: {}", e),
        })?;

        let mut records = Vec::new();
        for (line_no, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping malformed history line {}: {}", line_no + 1, e),
            }
        }

        Ok(records)
    }
}

#[async_trait]
impl HistoryStore for JsonlHistoryStore {
    async fn append(&self, target: &str, target_type: TargetType, result: &SearchResult) -> OsintResult<u64> {
        // Held across the write so ids land in the file in order
        let mut next_id = self.next_id.lock().await;
        let record = new_record(*next_id, target, target_type, result);

        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| OsintError::HistoryError(format!("Failed to open {}: {}", self.path.display(), e)))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| OsintError::HistoryError(format!("Failed to write {}: {}", self.path.display(), e)))?;
        file.flush()
            .await
            .map_err(|e| OsintError::HistoryError(e.to_string()))?;

        *next_id += 1;
        debug!("Appended history record {} for {}", record.id, target);

        Ok(record.id)
    }

    async fn recent(&self, limit: usize) -> OsintResult<Vec<HistoryRecord>> {
        let records = Self::read_records(&self.path).await?;
        Ok(newest_first(records, limit))
    }

    async fn get(&self, id: u64) -> OsintResult<Option<HistoryRecord>> {
        let records = Self::read_records(&self.path).await?;
        Ok(records.into_iter().find(|r| r.id == id))
    }
}

/// Process-local store
#[derive(Default)]
pub struct MemoryHistoryStore {
    records: RwLock<Vec<HistoryRecord>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append(&self, target: &str, target_type: TargetType, result: &SearchResult) -> OsintResult<u64> {
        let mut records = self.records.write();
        let id = records.last().map_or(1, |r| r.id + 1);
        records.push(new_record(id, target, target_type, result));
        Ok(id)
    }

    async fn recent(&self, limit: usize) -> OsintResult<Vec<HistoryRecord>> {
        Ok(newest_first(self.records.read().clone(), limit))
    }

    async fn get(&self, id: u64) -> OsintResult<Option<HistoryRecord>> {
        Ok(self.records.read().iter().find(|r| r.id == id).cloned())
    }
}
