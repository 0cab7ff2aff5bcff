//! File ledger persisted as a single JSON document
//!
//! The whole mapping is rewritten on every mutation. All access goes through
//! one mutex, so a reader never sees a half-applied change and the file on disk
//! is always written from a consistent snapshot.

use crate::common::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// One entry per ingested file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub filename: String,
    pub size: u64,
    /// Ids of the nodes that acknowledged a copy; may be empty
    #[serde(rename = "replicated")]
    pub replicas: Vec<String>,
    /// Absent when the ledger entry carried an empty or unparsable timestamp
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc)))
}

impl FileRecord {
    pub fn new(id: String, filename: String, size: u64, replicas: Vec<String>) -> Self {
        Self {
            id,
            filename,
            size,
            replicas,
            created_at: Some(Utc::now()),
        }
    }

    pub fn is_replicated(&self) -> bool {
        !self.replicas.is_empty()
    }

    pub fn has_replica(&self, node_id: &str) -> bool {
        self.replicas.iter().any(|r| r == node_id)
    }
}

/// Metadata store
pub struct MetadataStore {
    path: PathBuf,
    files: Mutex<BTreeMap<String, FileRecord>>,
}

impl MetadataStore {
    /// Open the ledger at `path`, loading whatever it already holds.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let files = Self::load(&path);
        tracing::info!("Loaded {} file records from {}", files.len(), path.display());
        Self {
            path,
            files: Mutex::new(files),
        }
    }

    /// Read the durable document. Absent or malformed storage yields an empty
    /// ledger; a single unreadable entry is skipped without affecting the rest.
    fn load(path: &Path) -> BTreeMap<String, FileRecord> {
        let raw = match std::fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                tracing::warn!("Cannot read metadata {}: {}, starting empty", path.display(), e);
                return BTreeMap::new();
            }
        };

        let entries: BTreeMap<String, serde_json::Value> = match serde_json::from_slice(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    "Malformed metadata {}: {}, starting empty",
                    path.display(),
                    e
                );
                return BTreeMap::new();
            }
        };

        entries
            .into_iter()
            .filter_map(|(id, entry)| match serde_json::from_value::<FileRecord>(entry) {
                Ok(record) => Some((id, record)),
                Err(e) => {
                    tracing::warn!("Skipping malformed metadata entry {}: {}", id, e);
                    None
                }
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, FileRecord>> {
        // a panic while holding the lock cannot leave the map half-updated,
        // every mutation is a single insert/remove
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Rewrite the whole document. Failures are logged and swallowed: the
    /// in-memory map stays authoritative until restart.
    fn persist(&self, files: &BTreeMap<String, FileRecord>) {
        if let Err(e) = self.write_snapshot(files) {
            tracing::error!("Failed to persist metadata to {}: {}", self.path.display(), e);
        }
    }

    fn write_snapshot(&self, files: &BTreeMap<String, FileRecord>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(files)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".swap");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Insert or overwrite the record at `record.id`
    pub fn put(&self, record: FileRecord) {
        let mut files = self.lock();
        files.insert(record.id.clone(), record);
        self.persist(&files);
    }

    /// Look up a record; absence is a normal outcome
    pub fn get(&self, id: &str) -> Option<FileRecord> {
        self.lock().get(id).cloned()
    }

    /// Remove a record if present. Returns whether it existed.
    pub fn delete(&self, id: &str) -> bool {
        let mut files = self.lock();
        let existed = files.remove(id).is_some();
        self.persist(&files);
        existed
    }

    /// Snapshot of the full mapping
    pub fn list(&self) -> BTreeMap<String, FileRecord> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
