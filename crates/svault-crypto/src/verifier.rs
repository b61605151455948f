//! Master password verifier (Argon2 PHC string)

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};

use crate::kdf::KdfParams;
use crate::{CryptoError, CryptoResult, SALT_SIZE};

/// Hash the master password into a self-describing PHC string
/// (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`).
pub fn hash_password(password: &SecretString, params: &KdfParams) -> CryptoResult<String> {
    let mut salt = [0u8; SALT_SIZE];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt_string = SaltString::encode_b64(&salt)
        .map_err(|e| CryptoError::Kdf(format!("verifier salt: {e}")))?;

    let argon2 = params.argon2().map_err(CryptoError::Kdf)?;
    let hash = argon2
        .hash_password(password.expose_secret().as_bytes(), &salt_string)
        .map_err(|e| CryptoError::Kdf(format!("verifier hash: {e}")))?;

    Ok(hash.to_string())
}

/// Check a password against a stored PHC string. The cost parameters come
/// from the string itself.
pub fn verify_password(password: &SecretString, phc: &str) -> CryptoResult<()> {
    let parsed = PasswordHash::new(phc)
        .map_err(|e| CryptoError::Format(format!("password verifier: {e}")))?;

    Argon2::default()
        .verify_password(password.expose_secret().as_bytes(), &parsed)
        .map_err(|_| CryptoError::Authentication)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_params() -> KdfParams {
        KdfParams::argon2id(1024, 1, 1)
    }

    #[test]
    fn test_verify_accepts_correct_password() {
        let pw = SecretString::from("correct horse");
        let phc = hash_password(&pw, &fast_params()).unwrap();

        assert!(phc.starts_with("$argon2id$v=19$m=1024,t=1,p=1$"), "{phc}");
        verify_password(&pw, &phc).unwrap();
    }

    #[test]
    fn test_verify_rejects_wrong_password() {
        let phc = hash_password(&SecretString::from("correct horse"), &fast_params()).unwrap();
        let err = verify_password(&SecretString::from("battery staple"), &phc).unwrap_err();
        assert!(err.is_authentication());
    }

    #[test]
    fn test_hashes_are_salted() {
        let pw = SecretString::from("same");
        let a = hash_password(&pw, &fast_params()).unwrap();
        let b = hash_password(&pw, &fast_params()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_verifier() {
        let err = verify_password(&SecretString::from("pw"), "not-a-phc-string").unwrap_err();
        assert!(err.is_format());
    }
}
