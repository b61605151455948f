//! Key derivation: Argon2 password → key-encryption key

use argon2::{Algorithm, Argon2, Params, Version};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::{CryptoError, CryptoResult, KEY_SIZE};

/// A 256-bit key-encryption key derived from the master password.
///
/// Zeroized on drop to prevent secrets lingering in memory.
pub struct KeyEncryptionKey {
    bytes: [u8; KEY_SIZE],
}

impl KeyEncryptionKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for KeyEncryptionKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for KeyEncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyEncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Argon2 variant, serialized with the short names used inside envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KdfAlgorithm {
    #[serde(rename = "ID")]
    Argon2id,
    #[serde(rename = "I")]
    Argon2i,
    #[serde(rename = "D")]
    Argon2d,
}

impl From<KdfAlgorithm> for Algorithm {
    fn from(alg: KdfAlgorithm) -> Self {
        match alg {
            KdfAlgorithm::Argon2id => Algorithm::Argon2id,
            KdfAlgorithm::Argon2i => Algorithm::Argon2i,
            KdfAlgorithm::Argon2d => Algorithm::Argon2d,
        }
    }
}

/// Upper bound on memory cost (4 GiB in KiB) accepted from any envelope.
pub const MAX_MEM_COST_KIB: u32 = 4 * 1024 * 1024;

/// Upper bound on time cost accepted from any envelope.
pub const MAX_TIME_COST: u32 = 256;

/// Upper bound on parallelism accepted from any envelope.
pub const MAX_PARALLELISM: u32 = 64;

/// Argon2 cost parameters.
///
/// These travel inside every envelope (field order here is the wire order),
/// so old blobs stay decodable after the defaults change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Output length in bytes (must be 32)
    pub hash_len: u32,
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    #[serde(rename = "memory_cost")]
    pub mem_cost_kib: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    #[serde(rename = "type")]
    pub algorithm: KdfAlgorithm,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            hash_len: KEY_SIZE as u32,
            mem_cost_kib: 65536,
            parallelism: 4,
            time_cost: 3,
            algorithm: KdfAlgorithm::Argon2id,
        }
    }
}

impl KdfParams {
    /// Argon2id with caller-chosen costs and a 32-byte output.
    pub fn argon2id(mem_cost_kib: u32, time_cost: u32, parallelism: u32) -> Self {
        Self {
            mem_cost_kib,
            time_cost,
            parallelism,
            ..Self::default()
        }
    }

    /// Build the Argon2 context, rejecting parameters the KDF or the AEAD
    /// key size cannot accept.
    pub(crate) fn argon2(&self) -> Result<Argon2<'static>, String> {
        if self.hash_len as usize != KEY_SIZE {
            return Err(format!(
                "hash_len {} does not match the {KEY_SIZE}-byte key size",
                self.hash_len
            ));
        }
        if self.mem_cost_kib > MAX_MEM_COST_KIB
            || self.time_cost > MAX_TIME_COST
            || self.parallelism > MAX_PARALLELISM
        {
            return Err(format!(
                "Argon2 costs m={} t={} p={} exceed the limits",
                self.mem_cost_kib, self.time_cost, self.parallelism
            ));
        }
        let params = Params::new(
            self.mem_cost_kib,
            self.time_cost,
            self.parallelism,
            Some(KEY_SIZE),
        )
        .map_err(|e| format!("invalid Argon2 params: {e}"))?;

        Ok(Argon2::new(self.algorithm.into(), Version::V0x13, params))
    }
}

/// Derive a 256-bit key-encryption key from a password and salt.
///
/// Deterministic for identical inputs. Deliberately expensive: callers on a
/// latency-sensitive path should run this on a blocking thread.
pub fn derive_key(
    password: &SecretString,
    salt: &[u8],
    params: &KdfParams,
) -> CryptoResult<KeyEncryptionKey> {
    let argon2 = params.argon2().map_err(CryptoError::Kdf)?;

    let mut key = [0u8; KEY_SIZE];
    argon2
        .hash_password_into(password.expose_secret().as_bytes(), salt, &mut key)
        .map_err(|e| CryptoError::Kdf(format!("Argon2 KDF failed: {e}")))?;

    Ok(KeyEncryptionKey::from_bytes(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_params() -> KdfParams {
        KdfParams::argon2id(1024, 1, 1)
    }

    #[test]
    fn test_kdf_deterministic() {
        let password = SecretString::from("correct horse");
        let salt = [1u8; 16];

        let key1 = derive_key(&password, &salt, &fast_params()).unwrap();
        let key2 = derive_key(&password, &salt, &fast_params()).unwrap();

        assert_eq!(key1.as_bytes(), key2.as_bytes(), "KDF must be deterministic");
    }

    #[test]
    fn test_kdf_different_passwords() {
        let salt = [1u8; 16];
        let key1 = derive_key(&SecretString::from("password-a"), &salt, &fast_params()).unwrap();
        let key2 = derive_key(&SecretString::from("password-b"), &salt, &fast_params()).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_kdf_different_salts() {
        let password = SecretString::from("same-password");
        let key1 = derive_key(&password, &[1u8; 16], &fast_params()).unwrap();
        let key2 = derive_key(&password, &[2u8; 16], &fast_params()).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_kdf_params_change_output() {
        let password = SecretString::from("same-password");
        let salt = [7u8; 16];
        let key1 = derive_key(&password, &salt, &fast_params()).unwrap();
        let key2 = derive_key(&password, &salt, &KdfParams::argon2id(1024, 2, 1)).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_default_params() {
        let params = KdfParams::default();
        assert_eq!(params.time_cost, 3);
        assert_eq!(params.mem_cost_kib, 65536);
        assert_eq!(params.parallelism, 4);
        assert_eq!(params.hash_len, 32);
        assert_eq!(params.algorithm, KdfAlgorithm::Argon2id);
    }

    #[test]
    fn test_rejects_wrong_hash_len() {
        let params = KdfParams {
            hash_len: 16,
            ..fast_params()
        };
        let err = derive_key(&SecretString::from("pw"), &[0u8; 16], &params).unwrap_err();
        assert!(matches!(err, CryptoError::Kdf(_)));
    }

    #[test]
    fn test_rejects_zero_parallelism() {
        let params = KdfParams::argon2id(1024, 1, 0);
        assert!(derive_key(&SecretString::from("pw"), &[0u8; 16], &params).is_err());
    }

    #[test]
    fn test_cost_ceilings() {
        assert!(KdfParams::argon2id(MAX_MEM_COST_KIB, MAX_TIME_COST, MAX_PARALLELISM)
            .argon2()
            .is_ok());

        for params in [
            KdfParams::argon2id(MAX_MEM_COST_KIB + 1, 1, 1),
            KdfParams::argon2id(1024, MAX_TIME_COST + 1, 1),
            KdfParams::argon2id(1024, 1, MAX_PARALLELISM + 1),
        ] {
            let err = derive_key(&SecretString::from("pw"), &[0u8; 16], &params).unwrap_err();
            assert!(err.to_string().contains("exceed the limits"), "{err}");
        }
    }

    #[test]
    fn test_params_serialize_in_wire_order() {
        let json = serde_json::to_string(&KdfParams::default()).unwrap();
        assert_eq!(
            json,
            r#"{"hash_len":32,"memory_cost":65536,"parallelism":4,"time_cost":3,"type":"ID"}"#
        );
    }
}
