//! Live record store.
//!
//! Two backends implement [`SecretRepository`]:
//!   - **JSON** ([`JsonRepository`]): the whole store in memory, every commit
//!     written atomically via temp+rename. A failed write leaves both the file
//!     and the in-memory state as they were.
//!   - **Memory** ([`MemoryRepository`]): no persistence, for tests and tooling.
//!
//! Batches are all-or-nothing: every batch is validated in full before
//! anything is applied.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use svault_core::timefmt::now_epoch;
use svault_core::{Category, SecretRecord, VaultError, VaultResult};

use crate::fsutil::atomic_write;

/// Largest id a record may carry, so `id + 1` always fits.
pub const MAX_ID: u64 = u64::MAX - 1;

/// An encrypted record that has not been assigned an id yet.
#[derive(Debug, Clone)]
pub struct EncryptedDraft {
    pub category: Category,
    pub label: String,
    pub tag: String,
    pub data: String,
}

/// Replacement blobs (and optionally a new verifier) committed together.
#[derive(Debug, Clone, Default)]
pub struct UpdateBatch {
    pub verifier: Option<String>,
    pub blobs: Vec<(u64, String)>,
}

/// Narrow persistence interface used by the vault operations.
pub trait SecretRepository {
    /// Look up a record by id.
    fn get(&self, id: u64) -> Option<&SecretRecord>;
    /// All records in insertion order.
    fn list_all(&self) -> &[SecretRecord];
    /// The id the next `create` will assign.
    fn next_id(&self) -> u64;
    /// Persist a new record under a fresh id.
    fn create(&mut self, draft: EncryptedDraft) -> VaultResult<SecretRecord>;
    /// Remove a record, returning it.
    fn delete(&mut self, id: u64) -> VaultResult<SecretRecord>;
    /// Insert records with caller-chosen ids. Fails without changes if any id
    /// is already present, repeated within the batch, or above [`MAX_ID`].
    fn insert_batch(&mut self, records: Vec<SecretRecord>) -> VaultResult<()>;
    /// Replace blobs (and the verifier, if given). Fails without changes if
    /// any id is unknown.
    fn update_batch(&mut self, batch: UpdateBatch) -> VaultResult<()>;
    /// Stored master password verifier (PHC string), if set up.
    fn verifier(&self) -> Option<&str>;
    fn set_verifier(&mut self, phc: String) -> VaultResult<()>;

    fn contains(&self, id: u64) -> bool {
        self.get(id).is_some()
    }

    fn len(&self) -> usize {
        self.list_all().len()
    }

    fn is_empty(&self) -> bool {
        self.list_all().is_empty()
    }
}

/// On-disk shape of the store file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreState {
    #[serde(default)]
    pub verifier: Option<String>,
    #[serde(default)]
    pub next_id: u64,
    #[serde(default)]
    pub secrets: Vec<SecretRecord>,
}

impl StoreState {
    fn get(&self, id: u64) -> Option<&SecretRecord> {
        self.secrets.iter().find(|s| s.id == id)
    }

    fn next_id(&self) -> u64 {
        let after_max = self
            .secrets
            .iter()
            .map(|s| s.id.saturating_add(1))
            .max()
            .unwrap_or(1);
        self.next_id.max(after_max).max(1)
    }

    fn apply_create(&mut self, draft: EncryptedDraft) -> VaultResult<SecretRecord> {
        let id = self.next_id();
        if id > MAX_ID {
            return Err(VaultError::Storage("record id space exhausted".into()));
        }
        let record = SecretRecord {
            id,
            category: draft.category,
            label: draft.label,
            tag: draft.tag,
            data: draft.data,
            created_at: now_epoch(),
        };
        self.next_id = record.id + 1;
        self.secrets.push(record.clone());
        Ok(record)
    }

    fn apply_delete(&mut self, id: u64) -> VaultResult<SecretRecord> {
        let pos = self
            .secrets
            .iter()
            .position(|s| s.id == id)
            .ok_or(VaultError::NotFound(id))?;
        Ok(self.secrets.remove(pos))
    }

    fn apply_insert_batch(&mut self, records: Vec<SecretRecord>) -> VaultResult<()> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if record.id > MAX_ID {
                return Err(VaultError::validation(format!(
                    "record id {} is out of range",
                    record.id
                )));
            }
            if self.get(record.id).is_some() || !seen.insert(record.id) {
                return Err(VaultError::Storage(format!(
                    "batch insert: id {} already exists",
                    record.id
                )));
            }
        }
        let next = self.next_id();
        let batch_next = records.iter().map(|r| r.id + 1).max().unwrap_or(next);
        self.next_id = next.max(batch_next);
        self.secrets.extend(records);
        Ok(())
    }

    fn apply_update_batch(&mut self, batch: UpdateBatch) -> VaultResult<()> {
        if let Some(missing) = batch.blobs.iter().find(|(id, _)| self.get(*id).is_none()) {
            return Err(VaultError::NotFound(missing.0));
        }
        for (id, data) in batch.blobs {
            if let Some(record) = self.secrets.iter_mut().find(|s| s.id == id) {
                record.data = data;
            }
        }
        if let Some(phc) = batch.verifier {
            self.verifier = Some(phc);
        }
        Ok(())
    }
}

// ── JSON file backend ─────────────────────────────────────────────────────────

/// File-backed store. Each mutating call is one atomic commit.
pub struct JsonRepository {
    path: PathBuf,
    state: StoreState,
}

impl JsonRepository {
    /// Load or create a store at the given path.
    /// If the file doesn't exist, starts empty (nothing is written until the
    /// first commit).
    pub fn open(path: &Path) -> VaultResult<Self> {
        let state = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content).map_err(|e| {
                VaultError::Format(format!("parsing store {}: {e}", path.display()))
            })?
        } else {
            StoreState::default()
        };

        tracing::debug!(
            path = %path.display(),
            records = state.secrets.len(),
            "opened vault store"
        );

        Ok(Self {
            path: path.to_path_buf(),
            state,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy of the state and persist it; the copy only
    /// replaces the live state once the file write has succeeded.
    fn commit<T>(
        &mut self,
        change: impl FnOnce(&mut StoreState) -> VaultResult<T>,
    ) -> VaultResult<T> {
        let mut next = self.state.clone();
        let out = change(&mut next)?;

        let json = serde_json::to_vec_pretty(&next)
            .map_err(|e| VaultError::Storage(format!("serializing store: {e}")))?;
        atomic_write(&self.path, &json).map_err(|e| {
            VaultError::Storage(format!("writing store {}: {e}", self.path.display()))
        })?;

        self.state = next;
        Ok(out)
    }
}

impl SecretRepository for JsonRepository {
    fn get(&self, id: u64) -> Option<&SecretRecord> {
        self.state.get(id)
    }
    fn list_all(&self) -> &[SecretRecord] {
        &self.state.secrets
    }
    fn next_id(&self) -> u64 {
        self.state.next_id()
    }
    fn create(&mut self, draft: EncryptedDraft) -> VaultResult<SecretRecord> {
        self.commit(|s| s.apply_create(draft))
    }
    fn delete(&mut self, id: u64) -> VaultResult<SecretRecord> {
        self.commit(|s| s.apply_delete(id))
    }
    fn insert_batch(&mut self, records: Vec<SecretRecord>) -> VaultResult<()> {
        self.commit(|s| s.apply_insert_batch(records))
    }
    fn update_batch(&mut self, batch: UpdateBatch) -> VaultResult<()> {
        self.commit(|s| s.apply_update_batch(batch))
    }
    fn verifier(&self) -> Option<&str> {
        self.state.verifier.as_deref()
    }
    fn set_verifier(&mut self, phc: String) -> VaultResult<()> {
        self.commit(|s| {
            s.verifier = Some(phc);
            Ok(())
        })
    }
}

// ── In-memory backend ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: StoreState,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretRepository for MemoryRepository {
    fn get(&self, id: u64) -> Option<&SecretRecord> {
        self.state.get(id)
    }
    fn list_all(&self) -> &[SecretRecord] {
        &self.state.secrets
    }
    fn next_id(&self) -> u64 {
        self.state.next_id()
    }
    fn create(&mut self, draft: EncryptedDraft) -> VaultResult<SecretRecord> {
        self.state.apply_create(draft)
    }
    fn delete(&mut self, id: u64) -> VaultResult<SecretRecord> {
        self.state.apply_delete(id)
    }
    fn insert_batch(&mut self, records: Vec<SecretRecord>) -> VaultResult<()> {
        self.state.apply_insert_batch(records)
    }
    fn update_batch(&mut self, batch: UpdateBatch) -> VaultResult<()> {
        self.state.apply_update_batch(batch)
    }
    fn verifier(&self) -> Option<&str> {
        self.state.verifier.as_deref()
    }
    fn set_verifier(&mut self, phc: String) -> VaultResult<()> {
        self.state.verifier = Some(phc);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(label: &str) -> EncryptedDraft {
        EncryptedDraft {
            category: Category::Seed,
            label: label.into(),
            tag: String::new(),
            data: format!("blob-{label}"),
        }
    }

    fn record(id: u64) -> SecretRecord {
        SecretRecord {
            id,
            category: Category::Other,
            label: format!("imported-{id}"),
            tag: "t".into(),
            data: format!("blob-{id}"),
            created_at: 1000,
        }
    }

    #[test]
    fn test_create_assigns_increasing_ids() {
        let mut repo = MemoryRepository::new();
        let a = repo.create(draft("a")).unwrap();
        let b = repo.create(draft("b")).unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(repo.len(), 2);
        assert_eq!(repo.get(2).unwrap().label, "b");
    }

    #[test]
    fn test_ids_not_reused_after_delete() {
        let mut repo = MemoryRepository::new();
        repo.create(draft("a")).unwrap();
        let b = repo.create(draft("b")).unwrap();
        repo.delete(b.id).unwrap();

        let c = repo.create(draft("c")).unwrap();
        assert_eq!(c.id, 3);
    }

    #[test]
    fn test_delete_unknown_is_not_found() {
        let mut repo = MemoryRepository::new();
        assert!(matches!(repo.delete(9), Err(VaultError::NotFound(9))));
    }

    #[test]
    fn test_insert_batch_preserves_ids_and_order() {
        let mut repo = MemoryRepository::new();
        repo.create(draft("local")).unwrap();
        repo.insert_batch(vec![record(40), record(7)]).unwrap();

        let ids: Vec<u64> = repo.list_all().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 40, 7]);
        assert_eq!(repo.next_id(), 41);
    }

    #[test]
    fn test_insert_batch_is_all_or_nothing() {
        let mut repo = MemoryRepository::new();
        repo.insert_batch(vec![record(1)]).unwrap();

        let err = repo.insert_batch(vec![record(2), record(1)]).unwrap_err();
        assert!(matches!(err, VaultError::Storage(_)));
        assert!(!repo.contains(2), "no partial insert");

        assert!(repo.insert_batch(vec![record(5), record(5)]).is_err());
        assert!(!repo.contains(5));
    }

    #[test]
    fn test_insert_batch_rejects_max_id() {
        let mut repo = MemoryRepository::new();
        let err = repo.insert_batch(vec![record(3), record(u64::MAX)]).unwrap_err();
        assert!(matches!(err, VaultError::Validation(_)));
        assert!(repo.is_empty());

        repo.insert_batch(vec![record(MAX_ID)]).unwrap();
        assert_eq!(repo.next_id(), u64::MAX);
        assert!(matches!(repo.create(draft("x")), Err(VaultError::Storage(_))));
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn test_update_batch_is_all_or_nothing() {
        let mut repo = MemoryRepository::new();
        repo.insert_batch(vec![record(1), record(2)]).unwrap();

        let err = repo
            .update_batch(UpdateBatch {
                verifier: Some("new".into()),
                blobs: vec![(1, "x".into()), (3, "y".into())],
            })
            .unwrap_err();
        assert!(matches!(err, VaultError::NotFound(3)));
        assert_eq!(repo.get(1).unwrap().data, "blob-1");
        assert!(repo.verifier().is_none());

        repo.update_batch(UpdateBatch {
            verifier: Some("new".into()),
            blobs: vec![(1, "x".into()), (2, "y".into())],
        })
        .unwrap();
        assert_eq!(repo.get(1).unwrap().data, "x");
        assert_eq!(repo.get(2).unwrap().data, "y");
        assert_eq!(repo.verifier(), Some("new"));
    }

    #[test]
    fn test_json_repository_persists_across_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");

        {
            let mut repo = JsonRepository::open(&path).unwrap();
            assert!(repo.is_empty());
            repo.set_verifier("$argon2id$fake".into()).unwrap();
            repo.create(draft("a")).unwrap();
            repo.insert_batch(vec![record(10)]).unwrap();
            repo.delete(1).unwrap();
        }

        let repo = JsonRepository::open(&path).unwrap();
        assert_eq!(repo.verifier(), Some("$argon2id$fake"));
        assert_eq!(repo.len(), 1);
        assert_eq!(repo.get(10).unwrap().label, "imported-10");
        assert_eq!(repo.next_id(), 11);
    }

    #[test]
    fn test_json_repository_rolls_back_on_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        let mut repo = JsonRepository::open(&path).unwrap();
        repo.insert_batch(vec![record(1)]).unwrap();

        // A directory in place of the store file makes the rename fail
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), "x").unwrap();

        let err = repo.insert_batch(vec![record(2), record(3)]).unwrap_err();
        assert!(matches!(err, VaultError::Storage(_)));
        assert_eq!(repo.len(), 1, "in-memory state must be unchanged");
        assert!(!repo.contains(2));

        assert!(repo.update_batch(UpdateBatch {
            verifier: None,
            blobs: vec![(1, "changed".into())],
        })
        .is_err());
        assert_eq!(repo.get(1).unwrap().data, "blob-1");
    }

    #[test]
    fn test_json_repository_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(JsonRepository::open(&path), Err(VaultError::Format(_))));
    }
}
