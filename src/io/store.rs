//! Persistence for spots and the activity ledger
//!
//! The orchestrator is agnostic to the backend: `MemoryStore` keeps
//! everything in process, `FileStore` writes a spots snapshot (JSON) plus an
//! append-only activity ledger (JSONL, one object per line).

use crate::domain::types::{ActivityEntry, Spot};
use anyhow::Context;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[async_trait]
pub trait ParkingStore: Send + Sync {
    async fn load_spots(&self) -> anyhow::Result<Vec<Spot>>;
    async fn save_spots(&self, spots: &[Spot]) -> anyhow::Result<()>;
    async fn append_log(&self, entry: &ActivityEntry) -> anyhow::Result<()>;
    async fn load_recent_logs(&self, n: usize) -> anyhow::Result<Vec<ActivityEntry>>;
}

/// Process-local store, the default
#[derive(Default)]
pub struct MemoryStore {
    spots: Mutex<Vec<Spot>>,
    logs: Mutex<Vec<ActivityEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ParkingStore for MemoryStore {
    async fn load_spots(&self) -> anyhow::Result<Vec<Spot>> {
        Ok(self.spots.lock().clone())
    }

    async fn save_spots(&self, spots: &[Spot]) -> anyhow::Result<()> {
        *self.spots.lock() = spots.to_vec();
        Ok(())
    }

    async fn append_log(&self, entry: &ActivityEntry) -> anyhow::Result<()> {
        self.logs.lock().push(entry.clone());
        Ok(())
    }

    async fn load_recent_logs(&self, n: usize) -> anyhow::Result<Vec<ActivityEntry>> {
        let logs = self.logs.lock();
        let start = logs.len().saturating_sub(n);
        Ok(logs[start..].to_vec())
    }
}

/// File-backed store: `<dir>/spots.json` + `<dir>/activity.jsonl`
pub struct FileStore {
    spots_path: PathBuf,
    ledger_path: PathBuf,
}

impl FileStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        let dir = data_dir.as_ref();
        info!(data_dir = %dir.display(), "file_store_initialized");
        Self {
            spots_path: dir.join("spots.json"),
            ledger_path: dir.join("activity.jsonl"),
        }
    }

    fn ensure_parent(path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ParkingStore for FileStore {
    async fn load_spots(&self) -> anyhow::Result<Vec<Spot>> {
        if !self.spots_path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.spots_path)
            .with_context(|| format!("Failed to read {}", self.spots_path.display()))?;
        let spots: Vec<Spot> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", self.spots_path.display()))?;
        Ok(spots)
    }

    async fn save_spots(&self, spots: &[Spot]) -> anyhow::Result<()> {
        Self::ensure_parent(&self.spots_path)?;
        let json = serde_json::to_string(spots)?;
        std::fs::write(&self.spots_path, json)
            .with_context(|| format!("Failed to write {}", self.spots_path.display()))?;
        debug!(path = %self.spots_path.display(), count = %spots.len(), "spots_saved");
        Ok(())
    }

    async fn append_log(&self, entry: &ActivityEntry) -> anyhow::Result<()> {
        Self::ensure_parent(&self.ledger_path)?;
        let line = serde_json::to_string(entry)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.ledger_path)
            .with_context(|| format!("Failed to open {}", self.ledger_path.display()))?;
        writeln!(file, "{}", line)?;
        debug!(path = %self.ledger_path.display(), bytes = %line.len(), "ledger_appended");
        Ok(())
    }

    async fn load_recent_logs(&self, n: usize) -> anyhow::Result<Vec<ActivityEntry>> {
        if !self.ledger_path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.ledger_path)
            .with_context(|| format!("Failed to read {}", self.ledger_path.display()))?;

        let lines: Vec<&str> = content.lines().collect();
        let start = lines.len().saturating_sub(n);
        let mut entries = Vec::with_capacity(lines.len() - start);
        for line in &lines[start..] {
            let entry: ActivityEntry =
                serde_json::from_str(line).with_context(|| "Malformed ledger line")?;
            entries.push(entry);
        }
        Ok(entries)
    }
}
