//! Evaluation history.
//!
//! Entries are kept newest first and capped at a fixed limit. The file
//! store supports both JSON (human-readable) and bincode (compact binary),
//! chosen by file extension.

use crate::error::{JudgeError, Result};
use crate::record::EvaluationRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Default number of entries kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

static ENTRY_SEQ: AtomicU64 = AtomicU64::new(0);

/// One stored comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub date: DateTime<Utc>,
    pub question: String,
    pub judge_model: String,
    pub records: Vec<EvaluationRecord>,
}

impl HistoryEntry {
    /// Stamp a new entry with a fresh id and the current time.
    pub fn new(
        question: impl Into<String>,
        judge_model: impl Into<String>,
        records: Vec<EvaluationRecord>,
    ) -> Self {
        let date = Utc::now();
        let seq = ENTRY_SEQ.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!("{}-{}", date.timestamp_millis(), seq),
            date,
            question: question.into(),
            judge_model: judge_model.into(),
            records,
        }
    }

    /// Record with the highest total, first one on ties.
    pub fn winner(&self) -> Option<&EvaluationRecord> {
        self.records
            .iter()
            .reduce(|best, r| if r.total_score > best.total_score { r } else { best })
    }
}

/// Repository of past evaluations.
pub trait HistoryStore {
    /// Insert at the front, dropping the oldest entries beyond the limit.
    fn append(&self, entry: HistoryEntry) -> Result<()>;

    /// All entries, newest first.
    fn list(&self) -> Result<Vec<HistoryEntry>>;

    fn get(&self, id: &str) -> Result<HistoryEntry> {
        self.list()?
            .into_iter()
            .find(|e| e.id == id)
            .ok_or_else(|| JudgeError::HistoryEntryNotFound(id.to_string()))
    }

    fn delete(&self, id: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

/// Save format for history files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    /// JSON format (human-readable, larger).
    Json,
    /// Bincode format (binary, compact).
    Bincode,
}

impl SaveFormat {
    /// Determine format from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => SaveFormat::Json,
            Some("bin") | Some("bincode") => SaveFormat::Bincode,
            _ => SaveFormat::Json, // Default to JSON
        }
    }
}

/// History kept in a single file, rewritten on every change.
pub struct FileHistoryStore {
    path: PathBuf,
    limit: usize,
}

impl FileHistoryStore {
    pub fn new(path: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            path: path.into(),
            limit: limit.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        load_entries(&self.path, SaveFormat::from_path(&self.path))
    }

    fn save(&self, entries: &[HistoryEntry]) -> Result<()> {
        save_entries(entries, &self.path, SaveFormat::from_path(&self.path))
    }
}

impl HistoryStore for FileHistoryStore {
    fn append(&self, entry: HistoryEntry) -> Result<()> {
        let mut entries = self.load()?;
        debug!(id = %entry.id, path = %self.path.display(), "Appending history entry");
        entries.insert(0, entry);
        entries.truncate(self.limit);
        self.save(&entries)
    }

    fn list(&self) -> Result<Vec<HistoryEntry>> {
        self.load()
    }

    fn delete(&self, id: &str) -> Result<()> {
        let mut entries = self.load()?;
        let before = entries.len();
        entries.retain(|e| e.id != id);
        if entries.len() == before {
            return Err(JudgeError::HistoryEntryNotFound(id.to_string()));
        }
        self.save(&entries)
    }

    fn clear(&self) -> Result<()> {
        self.save(&[])
    }
}

/// History held in memory only.
pub struct InMemoryHistoryStore {
    entries: Mutex<Vec<HistoryEntry>>,
    limit: usize,
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl InMemoryHistoryStore {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            limit: limit.max(1),
        }
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, Vec<HistoryEntry>> {
        // A panic while holding the lock cannot leave the Vec half-written.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl HistoryStore for InMemoryHistoryStore {
    fn append(&self, entry: HistoryEntry) -> Result<()> {
        let mut entries = self.entries();
        entries.insert(0, entry);
        entries.truncate(self.limit);
        Ok(())
    }

    fn list(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.entries().clone())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        if entries.len() == before {
            return Err(JudgeError::HistoryEntryNotFound(id.to_string()));
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries().clear();
        Ok(())
    }
}

/// Write entries to `path` as pretty JSON, whatever its extension.
pub fn export_json(entries: &[HistoryEntry], path: &Path) -> Result<()> {
    save_entries(entries, path, SaveFormat::Json)
}

fn save_entries(entries: &[HistoryEntry], path: &Path, format: SaveFormat) -> Result<()> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| JudgeError::io(parent, e))?;
        }
    }

    let data = match format {
        SaveFormat::Json => serde_json::to_string_pretty(entries)
            .map_err(|e| JudgeError::Serialization(e.to_string()))?
            .into_bytes(),
        SaveFormat::Bincode => {
            let config = bincode::config::standard();
            bincode::serde::encode_to_vec(entries, config)
                .map_err(|e| JudgeError::Serialization(e.to_string()))?
        }
    };

    fs::write(path, &data).map_err(|e| JudgeError::io(path, e))?;

    Ok(())
}

fn load_entries(path: &Path, format: SaveFormat) -> Result<Vec<HistoryEntry>> {
    let data = fs::read(path).map_err(|e| JudgeError::io(path, e))?;

    let entries = match format {
        SaveFormat::Json => serde_json::from_slice(&data)
            .map_err(|e| JudgeError::Serialization(e.to_string()))?,
        SaveFormat::Bincode => {
            let config = bincode::config::standard();
            let (entries, _): (Vec<HistoryEntry>, usize) =
                bincode::serde::decode_from_slice(&data, config)
                    .map_err(|e| JudgeError::Serialization(e.to_string()))?;
            entries
        }
    };

    Ok(entries)
}
