//! Idempotent import merge gated on decryptability.
//!
//! Candidates whose id is already live are skipped without being decrypted.
//! The rest must decrypt under the session credential to be admitted;
//! admitted records are stored verbatim with their original ids. When one id
//! appears several times, the first candidate that decrypts wins and the
//! ones after it are skipped unopened.

use rayon::prelude::*;
use std::collections::HashMap;
use svault_core::timefmt::now_epoch;
use svault_core::{SecretRecord, VaultResult};

use crate::auth::Session;
use crate::backup::BackupEntry;
use crate::repository::{SecretRepository, MAX_ID};

/// Outcome of one merge. `rejected` never aborts the batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub accepted: usize,
    pub skipped_existing: usize,
    pub rejected: usize,
}

impl MergeReport {
    pub fn total(&self) -> usize {
        self.accepted + self.skipped_existing + self.rejected
    }
}

/// Merge `candidates` into `repo` in one all-or-nothing commit.
pub fn merge<R: SecretRepository + ?Sized>(
    repo: &mut R,
    candidates: Vec<BackupEntry>,
    session: &Session,
) -> VaultResult<MergeReport> {
    let credential = session.credential();
    let mut report = MergeReport::default();

    // Settle live and out-of-range ids up front; group the rest by id in
    // first-seen order. Id-less candidates form groups of one.
    let mut groups: Vec<Vec<BackupEntry>> = Vec::new();
    let mut group_of: HashMap<u64, usize> = HashMap::new();
    for candidate in candidates {
        match candidate.id {
            Some(id) if repo.contains(id) => report.skipped_existing += 1,
            Some(id) if id > MAX_ID => {
                tracing::debug!(id, "import candidate rejected: id out of range");
                report.rejected += 1;
            }
            Some(id) => match group_of.get(&id) {
                Some(&g) => groups[g].push(candidate),
                None => {
                    group_of.insert(id, groups.len());
                    groups.push(vec![candidate]);
                }
            },
            None => groups.push(vec![candidate]),
        }
    }

    // Groups are independent; within a group, stop at the first authentic one.
    let winners: Vec<Option<usize>> = groups
        .par_iter()
        .map(|group| {
            group.iter().position(|c| match c.data.as_deref() {
                Some(blob) => svault_crypto::decrypt(blob, credential).is_ok(),
                None => false,
            })
        })
        .collect();

    let mut staged: Vec<SecretRecord> = Vec::new();
    let mut unassigned: Vec<BackupEntry> = Vec::new();
    for (group, winner) in groups.into_iter().zip(winners) {
        let Some(pos) = winner else {
            tracing::debug!(id = ?group[0].id, "import candidate rejected: not decryptable");
            report.rejected += group.len();
            continue;
        };
        report.rejected += pos;
        report.skipped_existing += group.len() - pos - 1;
        if let Some(candidate) = group.into_iter().nth(pos) {
            match candidate.id {
                Some(id) => staged.push(into_record(id, candidate)),
                None => unassigned.push(candidate),
            }
        }
    }

    // Id-less candidates get fresh ids after every explicit one.
    let mut next = staged
        .iter()
        .map(|r| r.id + 1)
        .max()
        .unwrap_or(0)
        .max(repo.next_id());
    for candidate in unassigned {
        if next > MAX_ID {
            tracing::debug!("import candidate rejected: no free id");
            report.rejected += 1;
            continue;
        }
        staged.push(into_record(next, candidate));
        next += 1;
    }

    report.accepted = staged.len();
    if !staged.is_empty() {
        repo.insert_batch(staged)?;
    }

    tracing::debug!(
        accepted = report.accepted,
        skipped = report.skipped_existing,
        rejected = report.rejected,
        "import merge complete"
    );
    Ok(report)
}

fn into_record(id: u64, candidate: BackupEntry) -> SecretRecord {
    SecretRecord {
        id,
        category: candidate.category,
        label: candidate.label,
        tag: candidate.tag,
        data: candidate.data.unwrap_or_default(),
        created_at: now_epoch(),
    }
}
