//! The vault facade.
//!
//! Each mutating operation runs commit → snapshot → audit, in that order.
//! Only the commit can fail the operation: a snapshot failure is logged at
//! error level (the store is already durable) and an audit failure at warn.

use secrecy::{ExposeSecret, SecretString};
use std::path::Path;
use svault_core::config::VaultConfig;
use svault_core::{Category, NewSecret, SecretRecord, VaultError, VaultResult};
use svault_crypto::KdfParams;
use tracing::{error, info, warn};

use crate::audit::{AuditEvent, AuditLog, JsonlAuditLog};
use crate::auth::{self, Session};
use crate::backup::{self, BackupStore};
use crate::import::{self, MergeReport};
use crate::repository::{EncryptedDraft, JsonRepository, SecretRepository};
use crate::rotate::{self, RotationPolicy, RotationReport};

/// Result of a successful login.
#[derive(Debug)]
pub struct LoginOutcome {
    pub session: Session,
    /// Records re-admitted from the backup file
    pub restored: usize,
}

/// Plaintext of a viewed secret, or why it could not be produced.
#[derive(Debug)]
pub enum Reveal {
    Plaintext(SecretString),
    Failed(VaultError),
}

#[derive(Debug)]
pub struct Revealed {
    pub record: SecretRecord,
    pub content: Reveal,
}

pub struct Vault<R = JsonRepository, A = JsonlAuditLog> {
    repo: R,
    backup: BackupStore,
    audit: A,
    kdf: KdfParams,
    restore_on_login: bool,
}

impl Vault {
    /// Open the file-backed vault described by `config`.
    pub fn open(config: &VaultConfig) -> VaultResult<Self> {
        let repo = JsonRepository::open(&config.vault.store_path())?;
        Ok(Vault::new(
            repo,
            BackupStore::new(config.vault.backup_path()),
            JsonlAuditLog::new(config.vault.audit_path()),
            config.crypto.kdf_params(),
        )
        .with_restore_on_login(config.vault.restore_on_login))
    }
}

impl<R: SecretRepository, A: AuditLog> Vault<R, A> {
    pub fn new(repo: R, backup: BackupStore, audit: A, kdf: KdfParams) -> Self {
        Self {
            repo,
            backup,
            audit,
            kdf,
            restore_on_login: true,
        }
    }

    pub fn with_restore_on_login(mut self, enabled: bool) -> Self {
        self.restore_on_login = enabled;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn audit_log(&self) -> &A {
        &self.audit
    }

    pub fn backup_store(&self) -> &BackupStore {
        &self.backup
    }

    pub fn is_initialized(&self) -> bool {
        self.repo.verifier().is_some()
    }

    /// First-run enrollment of the master password.
    pub fn setup(&mut self, password: &SecretString) -> VaultResult<()> {
        auth::enroll(&mut self.repo, password, &self.kdf)?;
        info!("vault initialized");
        Ok(())
    }

    /// Verify the master password, then re-admit anything in the backup file
    /// that the live store lacks.
    pub fn login(&mut self, password: &SecretString) -> VaultResult<LoginOutcome> {
        let session = match auth::unlock(&self.repo, password) {
            Ok(session) => session,
            Err(e) => {
                if e.is_authentication() {
                    self.notify(AuditEvent::new("Login failed: incorrect password"));
                }
                return Err(e);
            }
        };
        self.notify(AuditEvent::new("Login successful"));

        let restored = if self.restore_on_login {
            self.restore_from_backup(&session)
        } else {
            0
        };
        Ok(LoginOutcome { session, restored })
    }

    fn restore_from_backup(&mut self, session: &Session) -> usize {
        let candidates = match self.backup.restore() {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(path = %self.backup.path().display(), "backup not restored: {e}");
                return 0;
            }
        };
        if candidates.is_empty() {
            return 0;
        }
        match import::merge(&mut self.repo, candidates, session) {
            Ok(report) => {
                if report.accepted > 0 {
                    info!(accepted = report.accepted, "restored secrets from backup");
                    self.snapshot();
                }
                report.accepted
            }
            Err(e) => {
                warn!("backup restore failed: {e}");
                0
            }
        }
    }

    /// Encrypt and store a new secret.
    pub fn upload(&mut self, session: &Session, secret: NewSecret) -> VaultResult<SecretRecord> {
        secret.validate()?;
        let data = svault_crypto::encrypt_with(
            secret.content.expose_secret(),
            session.credential(),
            &self.kdf,
        )?;
        let record = self.repo.create(EncryptedDraft {
            category: secret.category,
            label: secret.label.trim().to_string(),
            tag: secret.tag.trim().to_string(),
            data,
        })?;

        self.snapshot();
        self.notify(AuditEvent::for_secret("Secret uploaded", &record));
        Ok(record)
    }

    /// Records in insertion order, optionally restricted to one category.
    pub fn list(&self, _session: &Session, category: Option<Category>) -> Vec<&SecretRecord> {
        self.repo
            .list_all()
            .iter()
            .filter(|r| category.is_none_or(|c| r.category == c))
            .collect()
    }

    pub fn get(&self, _session: &Session, id: u64) -> VaultResult<&SecretRecord> {
        self.repo.get(id).ok_or(VaultError::NotFound(id))
    }

    /// Decrypt one record. A decryption failure is reported in the result,
    /// not as an error.
    pub fn reveal(&mut self, session: &Session, id: u64) -> VaultResult<Revealed> {
        let record = self.get(session, id)?.clone();
        let content = match svault_crypto::decrypt(&record.data, session.credential()) {
            Ok(plaintext) => {
                self.notify(AuditEvent::for_secret("Secret viewed", &record));
                Reveal::Plaintext(plaintext)
            }
            Err(e) => {
                warn!(id, "secret could not be decrypted: {e}");
                Reveal::Failed(e.into())
            }
        };
        Ok(Revealed { record, content })
    }

    pub fn delete(&mut self, _session: &Session, id: u64) -> VaultResult<SecretRecord> {
        let record = self.repo.delete(id)?;
        self.snapshot();
        self.notify(AuditEvent::for_secret("Secret deleted", &record));
        Ok(record)
    }

    /// Merge a backup file into the store.
    pub fn import_file(&mut self, session: &Session, path: &Path) -> VaultResult<MergeReport> {
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if !is_json {
            return Err(VaultError::validation(format!(
                "import source must be a .json file: {}",
                path.display()
            )));
        }

        let candidates = backup::read_candidates(path)?;
        let report = import::merge(&mut self.repo, candidates, session)?;
        if report.accepted > 0 {
            self.snapshot();
        }
        self.notify(AuditEvent::new(format!(
            "Imported {} secrets from backup",
            report.accepted
        )));
        Ok(report)
    }

    /// Write a backup-format snapshot of every record to `path`.
    pub fn export(&self, _session: &Session, path: &Path) -> VaultResult<usize> {
        let records = self.repo.list_all();
        backup::write_snapshot(path, records)?;
        info!(path = %path.display(), records = records.len(), "exported secrets");
        Ok(records.len())
    }

    /// Rotate the master password. `new` and `confirm` must match.
    pub fn change_password(
        &mut self,
        session: &mut Session,
        old: &SecretString,
        new: &SecretString,
        confirm: &SecretString,
        policy: RotationPolicy,
    ) -> VaultResult<RotationReport> {
        if new.expose_secret() != confirm.expose_secret() {
            return Err(VaultError::validation("new passwords do not match"));
        }
        let report = rotate::rotate(&mut self.repo, session, old, new, &self.kdf, policy)?;

        self.snapshot();
        self.notify(AuditEvent::new("Master password changed"));
        Ok(report)
    }

    /// Audit entries, newest first.
    pub fn logs(&self) -> VaultResult<Vec<AuditEvent>> {
        let mut entries = self.audit.entries()?;
        entries.reverse();
        Ok(entries)
    }

    fn snapshot(&self) {
        if let Err(e) = self.backup.snapshot(self.repo.list_all()) {
            error!(path = %self.backup.path().display(), "backup snapshot failed: {e}");
        }
    }

    fn notify(&mut self, event: AuditEvent) {
        info!(action = %event.action, id = ?event.secret_id, "vault event");
        if let Err(e) = self.audit.append(&event) {
            warn!("audit append failed: {e}");
        }
    }
}
