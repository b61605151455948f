//! Backup snapshots: the full record set, still encrypted, as one JSON file.
//!
//! ```json
//! [
//!   { "id": 1, "category": "Seed", "label": "cold wallet", "tag": "", "data": "eyJhcmdvbjJfcGFyYW1z..." }
//! ]
//! ```
//!
//! Every snapshot rewrites the whole file (temp+rename). Reading is lenient
//! and does no decryption; [`crate::import::merge`] decides what to admit.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use svault_core::{Category, SecretRecord, VaultError, VaultResult};

use crate::fsutil::atomic_write;

/// One backup record, or one import candidate read from a backup file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEntry {
    /// Missing ids are assigned fresh on import
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub category: Category,
    #[serde(default = "default_label")]
    pub label: String,
    #[serde(default)]
    pub tag: String,
    /// Envelope blob; a candidate without one is never admitted
    #[serde(default)]
    pub data: Option<String>,
}

fn default_label() -> String {
    "Unnamed".into()
}

impl From<&SecretRecord> for BackupEntry {
    fn from(record: &SecretRecord) -> Self {
        Self {
            id: Some(record.id),
            category: record.category,
            label: record.label.clone(),
            tag: record.tag.clone(),
            data: Some(record.data.clone()),
        }
    }
}

/// The backup file rewritten after each mutating vault operation.
#[derive(Debug, Clone)]
pub struct BackupStore {
    path: PathBuf,
}

impl BackupStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the backup file with `records` in the given order.
    pub fn snapshot(&self, records: &[SecretRecord]) -> VaultResult<()> {
        write_snapshot(&self.path, records)?;
        tracing::debug!(
            path = %self.path.display(),
            records = records.len(),
            "backup snapshot written"
        );
        Ok(())
    }

    /// Parse the backup file into candidates. A missing file has none.
    pub fn restore(&self) -> VaultResult<Vec<BackupEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        read_candidates(&self.path)
    }
}

/// Write a snapshot of `records` to an arbitrary path.
pub fn write_snapshot(path: &Path, records: &[SecretRecord]) -> VaultResult<()> {
    let entries: Vec<BackupEntry> = records.iter().map(BackupEntry::from).collect();
    let json = serde_json::to_vec_pretty(&entries)
        .map_err(|e| VaultError::Storage(format!("serializing backup: {e}")))?;
    atomic_write(path, &json)?;
    Ok(())
}

/// Read a backup file into candidates without validating their blobs.
pub fn read_candidates(path: &Path) -> VaultResult<Vec<BackupEntry>> {
    let content = std::fs::read(path)?;
    parse_candidates(&content)
        .map_err(|e| VaultError::Format(format!("{}: {e}", path.display())))
}

/// Parse backup JSON (an array of entries).
pub fn parse_candidates(content: &[u8]) -> Result<Vec<BackupEntry>, serde_json::Error> {
    serde_json::from_slice(content)
}
