//! Audit trail of vault actions. Append-only; never consulted for decisions.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use svault_core::timefmt::now_epoch;
use svault_core::{Category, SecretRecord, VaultResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub action: String,
    #[serde(default)]
    pub secret_id: Option<u64>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub label: Option<String>,
    /// Unix timestamp (seconds)
    pub timestamp: u64,
}

impl AuditEvent {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            secret_id: None,
            category: None,
            label: None,
            timestamp: now_epoch(),
        }
    }

    pub fn for_secret(action: impl Into<String>, record: &SecretRecord) -> Self {
        Self {
            secret_id: Some(record.id),
            category: Some(record.category),
            label: Some(record.label.clone()),
            ..Self::new(action)
        }
    }
}

/// One-way sink for audit events.
pub trait AuditLog {
    fn append(&mut self, event: &AuditEvent) -> VaultResult<()>;
    /// All events, oldest first.
    fn entries(&self) -> VaultResult<Vec<AuditEvent>>;
}

/// JSON-lines audit file, one event per line.
#[derive(Debug, Clone)]
pub struct JsonlAuditLog {
    path: PathBuf,
}

impl JsonlAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditLog for JsonlAuditLog {
    fn append(&mut self, event: &AuditEvent) -> VaultResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_string(event).map_err(anyhow::Error::from)?;
        line.push('\n');

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    fn entries(&self) -> VaultResult<Vec<AuditEvent>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let events = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(event) => Some(event),
                Err(e) => {
                    tracing::warn!(
                        "skipping unreadable audit line in {}: {e}",
                        self.path.display()
                    );
                    None
                }
            })
            .collect();
        Ok(events)
    }
}

#[derive(Debug, Default)]
pub struct MemoryAuditLog {
    events: Vec<AuditEvent>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actions(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.action.as_str()).collect()
    }
}

impl AuditLog for MemoryAuditLog {
    fn append(&mut self, event: &AuditEvent) -> VaultResult<()> {
        self.events.push(event.clone());
        Ok(())
    }

    fn entries(&self) -> VaultResult<Vec<AuditEvent>> {
        Ok(self.events.clone())
    }
}
