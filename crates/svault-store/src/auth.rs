//! Master password gate and the per-login session context.
//!
//! The session is an explicit value handed to every operation that needs the
//! master credential. There is no process-wide "current password".

use secrecy::{ExposeSecret, SecretString};
use svault_core::{VaultError, VaultResult};
use svault_crypto::{hash_password, verify_password, KdfParams};

use crate::repository::SecretRepository;

/// Proof of a successful login, holding the master credential in memory only.
pub struct Session {
    credential: SecretString,
}

impl Session {
    pub fn credential(&self) -> &SecretString {
        &self.credential
    }

    pub(crate) fn replace_credential(&mut self, credential: SecretString) {
        self.credential = credential;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("credential", &"[REDACTED]")
            .finish()
    }
}

/// Store the first verifier. Refuses blank passwords and re-initialization.
pub fn enroll<R: SecretRepository + ?Sized>(
    repo: &mut R,
    password: &SecretString,
    params: &KdfParams,
) -> VaultResult<()> {
    if repo.verifier().is_some() {
        return Err(VaultError::AlreadyInitialized);
    }
    if password.expose_secret().trim().is_empty() {
        return Err(VaultError::validation("password is required"));
    }
    let phc = hash_password(password, params)?;
    repo.set_verifier(phc)
}

/// Check `password` against the stored verifier.
pub fn verify<R: SecretRepository + ?Sized>(repo: &R, password: &SecretString) -> VaultResult<()> {
    let phc = repo.verifier().ok_or(VaultError::NotInitialized)?;
    verify_password(password, phc).map_err(|e| match e {
        svault_crypto::CryptoError::Authentication => {
            VaultError::Authentication("incorrect password".into())
        }
        other => other.into(),
    })
}

/// Verify and open a session.
pub fn unlock<R: SecretRepository + ?Sized>(
    repo: &R,
    password: &SecretString,
) -> VaultResult<Session> {
    verify(repo, password)?;
    Ok(Session {
        credential: password.clone(),
    })
}
