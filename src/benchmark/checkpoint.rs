//! Per-item checkpoint store (spec.md §4.10, §5): an append-friendly
//! JSON-lines file that lets a run resume after interruption. Writes are
//! idempotent, keyed by `(suite_version, item_id, run_id)` (spec.md §5)
//! — recording the same key twice replaces the earlier record rather
//! than duplicating it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BenchmarkError;

/// One item's recorded outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub suite_version: String,
    pub run_id: String,
    pub item_id: String,
    pub score: f64,
    pub passed: bool,
    pub cost_usd: f64,
    pub latency_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl CheckpointRecord {
    fn key(&self) -> (String, String, String) {
        (self.suite_version.clone(), self.item_id.clone(), self.run_id.clone())
    }
}

/// A resumable, file-backed checkpoint store.
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads every record currently on disk, last-write-wins per key.
    /// Missing file is an empty store, not an error — the first run
    /// against a fresh `--outdir` has nothing to resume from.
    pub fn load(&self) -> Result<Vec<CheckpointRecord>, BenchmarkError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        let mut by_key: BTreeMap<(String, String, String), CheckpointRecord> = BTreeMap::new();
        for (lineno, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: CheckpointRecord = serde_json::from_str(line).map_err(|e| {
                BenchmarkError::Checkpoint(format!("{}:{}: {e}", self.path.display(), lineno + 1))
            })?;
            by_key.insert(record.key(), record);
        }
        Ok(by_key.into_values().collect())
    }

    /// Which `(run_id, item_id)` pairs already have a recorded outcome
    /// for `suite_version` — a resumed run skips these.
    pub fn completed_items(&self, suite_version: &str, run_id: &str) -> Result<std::collections::HashSet<String>, BenchmarkError> {
        Ok(self
            .load()?
            .into_iter()
            .filter(|r| r.suite_version == suite_version && r.run_id == run_id)
            .map(|r| r.item_id)
            .collect())
    }

    /// Appends `record`, then compacts the file so any earlier record
    /// with the same key is dropped (spec.md §5 "append-or-replace-per-
    /// item semantics; writes are idempotent").
    pub fn record(&self, record: CheckpointRecord) -> Result<(), BenchmarkError> {
        let mut existing = self.load().unwrap_or_default();
        existing.retain(|r| r.key() != record.key());
        existing.push(record);
        self.rewrite(&existing)
    }

    fn rewrite(&self, records: &[CheckpointRecord]) -> Result<(), BenchmarkError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut buf = String::new();
        for record in records {
            buf.push_str(&serde_json::to_string(record).map_err(|e| BenchmarkError::Checkpoint(e.to_string()))?);
            buf.push('\n');
        }
        std::fs::write(&self.path, buf)?;
        Ok(())
    }
}
