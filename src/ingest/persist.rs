// src/ingest/persist.rs
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::ingest::error::PersistError;
use crate::ingest::types::Record;

#[async_trait::async_trait]
pub trait RecordSink: Send + Sync {
    /// Store the whole aggregate in one go, or not at all.
    async fn store(&self, records: &[Record]) -> Result<(), PersistError>;

    /// Human-readable destination for logs.
    fn describe(&self) -> String;
}

/// Write `records` as a pretty-printed JSON array to `dest`.
///
/// Missing parent directories are created. The JSON goes to a temp file in
/// the destination directory and is renamed over `dest`, so readers see the
/// old file or the new one, never a prefix. The temp file is removed if any
/// step before the rename fails.
pub fn persist(records: &[Record], dest: &Path) -> Result<(), PersistError> {
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|source| PersistError::CreateDir {
        path: dir.clone(),
        source,
    })?;

    let json = serde_json::to_vec_pretty(records)?;

    let write_err = |source| PersistError::Write {
        path: dest.to_path_buf(),
        source,
    };
    let mut tmp = tempfile::Builder::new()
        .prefix(".ingest-")
        .suffix(".json.tmp")
        .tempfile_in(&dir)
        .map_err(write_err)?;
    tmp.write_all(&json).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(dest).map_err(|e| write_err(e.error))?;

    tracing::info!(
        target: "ingest",
        count = records.len(),
        path = %dest.display(),
        "saved articles"
    );
    Ok(())
}

/// JSON file destination used by the binary.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl RecordSink for JsonFileSink {
    async fn store(&self, records: &[Record]) -> Result<(), PersistError> {
        // Blocking task runs to completion even if this future is dropped,
        // so a cancelled run still ends with either the full file or none.
        let records = records.to_vec();
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || persist(&records, &path))
            .await
            .map_err(|e| PersistError::Aborted(e.to_string()))?
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// --- Test helper ---
pub struct MemorySink {
    pub calls: Mutex<Vec<Vec<Record>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(vec![]),
        }
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RecordSink for MemorySink {
    async fn store(&self, records: &[Record]) -> Result<(), PersistError> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(records.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
