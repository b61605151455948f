//! Master password rotation.
//!
//! Every blob is decrypted under the old password and re-encrypted under the
//! new one, then the new verifier and all blobs are committed in a single
//! batch. The session credential changes only after that commit succeeds.

use rayon::prelude::*;
use secrecy::{ExposeSecret, SecretString};
use svault_core::{VaultError, VaultResult};
use svault_crypto::{hash_password, KdfParams};

use crate::auth::{verify, Session};
use crate::repository::{SecretRepository, UpdateBatch};

/// What to do with records that do not decrypt under the old password.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RotationPolicy {
    /// Abort before writing anything and report the failing ids.
    #[default]
    AllOrNothing,
    /// Rotate everything else; leave failing records under the old password.
    SkipAndReport,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationReport {
    pub rotated: usize,
    /// Records still encrypted under the old password
    pub skipped: Vec<u64>,
}

pub fn rotate<R: SecretRepository + ?Sized>(
    repo: &mut R,
    session: &mut Session,
    old: &SecretString,
    new: &SecretString,
    params: &KdfParams,
    policy: RotationPolicy,
) -> VaultResult<RotationReport> {
    if new.expose_secret().trim().is_empty() {
        return Err(VaultError::validation("new password is required"));
    }
    verify(repo, old)?;
    let verifier = hash_password(new, params)?;

    let results: Vec<(u64, VaultResult<Reencrypted>)> = repo
        .list_all()
        .par_iter()
        .map(|record| (record.id, reencrypt(&record.data, old, new, params)))
        .collect();

    let mut blobs = Vec::with_capacity(results.len());
    let mut skipped = Vec::new();
    for (id, result) in results {
        match result? {
            Reencrypted::Blob(blob) => blobs.push((id, blob)),
            Reencrypted::Undecryptable(e) => {
                tracing::warn!(id, "secret does not decrypt under the current password: {e}");
                skipped.push(id);
            }
        }
    }

    if !skipped.is_empty() && policy == RotationPolicy::AllOrNothing {
        return Err(VaultError::RotationAborted { failed: skipped });
    }

    let rotated = blobs.len();
    repo.update_batch(UpdateBatch {
        verifier: Some(verifier),
        blobs,
    })?;
    session.replace_credential(new.clone());

    tracing::info!(rotated, skipped = skipped.len(), "master password rotated");
    Ok(RotationReport { rotated, skipped })
}

enum Reencrypted {
    Blob(String),
    Undecryptable(svault_crypto::CryptoError),
}

/// Decode failures are per-record; only an encrypt failure is fatal.
fn reencrypt(
    blob: &str,
    old: &SecretString,
    new: &SecretString,
    params: &KdfParams,
) -> VaultResult<Reencrypted> {
    let plaintext = match svault_crypto::decrypt(blob, old) {
        Ok(plaintext) => plaintext,
        Err(e) => return Ok(Reencrypted::Undecryptable(e)),
    };
    let blob = svault_crypto::encrypt_with(plaintext.expose_secret(), new, params)?;
    Ok(Reencrypted::Blob(blob))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{enroll, unlock};
    use crate::repository::{EncryptedDraft, MemoryRepository};
    use svault_core::Category;

    fn fast_params() -> KdfParams {
        KdfParams::argon2id(1024, 1, 1)
    }

    fn pw(s: &str) -> SecretString {
        SecretString::from(s)
    }

    fn add(repo: &mut MemoryRepository, content: &str, password: &str) -> u64 {
        let data = svault_crypto::encrypt_with(content, &pw(password), &fast_params()).unwrap();
        repo.create(EncryptedDraft {
            category: Category::Other,
            label: content.into(),
            tag: String::new(),
            data,
        })
        .unwrap()
        .id
    }

    fn setup() -> (MemoryRepository, Session) {
        let mut repo = MemoryRepository::new();
        enroll(&mut repo, &pw("old"), &fast_params()).unwrap();
        let session = unlock(&repo, &pw("old")).unwrap();
        (repo, session)
    }

    #[test]
    fn test_rotation_reencrypts_everything() {
        let (mut repo, mut session) = setup();
        let a = add(&mut repo, "alpha", "old");
        let b = add(&mut repo, "beta", "old");

        let report = rotate(
            &mut repo,
            &mut session,
            &pw("old"),
            &pw("new"),
            &fast_params(),
            RotationPolicy::default(),
        )
        .unwrap();

        assert_eq!(report.rotated, 2);
        assert!(report.skipped.is_empty());
        assert_eq!(session.credential().expose_secret(), "new");
        for (id, content) in [(a, "alpha"), (b, "beta")] {
            let blob = &repo.get(id).unwrap().data;
            assert_eq!(svault_crypto::decrypt(blob, &pw("new")).unwrap().expose_secret(), content);
            assert!(svault_crypto::decrypt(blob, &pw("old")).unwrap_err().is_authentication());
        }
        assert!(verify(&repo, &pw("new")).is_ok());
        assert!(verify(&repo, &pw("old")).is_err());
    }

    #[test]
    fn test_wrong_old_password_changes_nothing() {
        let (mut repo, mut session) = setup();
        let a = add(&mut repo, "alpha", "old");
        let before = repo.get(a).unwrap().data.clone();

        let err = rotate(
            &mut repo,
            &mut session,
            &pw("guess"),
            &pw("new"),
            &fast_params(),
            RotationPolicy::default(),
        )
        .unwrap_err();

        assert!(err.is_authentication());
        assert_eq!(repo.get(a).unwrap().data, before);
        assert_eq!(session.credential().expose_secret(), "old");
    }

    #[test]
    fn test_blank_new_password_is_validation_error() {
        let (mut repo, mut session) = setup();
        let err = rotate(
            &mut repo,
            &mut session,
            &pw("old"),
            &pw(""),
            &fast_params(),
            RotationPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(err, VaultError::Validation(_)));
    }

    #[test]
    fn test_undecryptable_record_aborts_by_default() {
        let (mut repo, mut session) = setup();
        let good = add(&mut repo, "alpha", "old");
        let foreign = add(&mut repo, "beta", "elsewhere");
        let before = repo.get(good).unwrap().data.clone();

        let err = rotate(
            &mut repo,
            &mut session,
            &pw("old"),
            &pw("new"),
            &fast_params(),
            RotationPolicy::AllOrNothing,
        )
        .unwrap_err();

        match err {
            VaultError::RotationAborted { failed } => assert_eq!(failed, vec![foreign]),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(repo.get(good).unwrap().data, before);
        assert!(verify(&repo, &pw("old")).is_ok());
        assert_eq!(session.credential().expose_secret(), "old");
    }

    #[test]
    fn test_skip_and_report_leaves_failures_in_place() {
        let (mut repo, mut session) = setup();
        let good = add(&mut repo, "alpha", "old");
        let foreign = add(&mut repo, "beta", "elsewhere");
        let foreign_blob = repo.get(foreign).unwrap().data.clone();

        let report = rotate(
            &mut repo,
            &mut session,
            &pw("old"),
            &pw("new"),
            &fast_params(),
            RotationPolicy::SkipAndReport,
        )
        .unwrap();

        assert_eq!(report.rotated, 1);
        assert_eq!(report.skipped, vec![foreign]);
        assert_eq!(repo.get(foreign).unwrap().data, foreign_blob);
        assert!(svault_crypto::decrypt(&repo.get(good).unwrap().data, &pw("new")).is_ok());
    }

    #[test]
    fn test_rotation_of_empty_vault_updates_verifier() {
        let (mut repo, mut session) = setup();
        let report = rotate(
            &mut repo,
            &mut session,
            &pw("old"),
            &pw("new"),
            &fast_params(),
            RotationPolicy::default(),
        )
        .unwrap();

        assert_eq!(report, RotationReport::default());
        assert!(verify(&repo, &pw("new")).is_ok());
    }
}
