//! Data keys and the AES-256-GCM primitives used by both envelope layers

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

use crate::kdf::KeyEncryptionKey;
use crate::{CryptoError, CryptoResult, KEY_SIZE, NONCE_SIZE};

/// A one-time 256-bit data-encryption key. Zeroized on drop.
pub struct DataKey {
    bytes: [u8; KEY_SIZE],
}

impl DataKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for DataKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Generate a random 256-bit data-encryption key.
pub fn generate_data_key() -> DataKey {
    let mut bytes = [0u8; KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut bytes);
    DataKey::from_bytes(bytes)
}

/// Generate a random 96-bit AES-GCM nonce.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}

/// AES-256-GCM seal. Output is `ciphertext || 16-byte tag`.
pub(crate) fn seal(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
) -> CryptoResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(key.into());
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| CryptoError::Encrypt(format!("AES-GCM seal: {e}")))
}

/// AES-256-GCM open. Any tag mismatch is an authentication failure.
pub(crate) fn open(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    ciphertext: &[u8],
) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let cipher = Aes256Gcm::new(key.into());
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::Authentication)
}

/// Wrap (encrypt) a data key under the key-encryption key.
///
/// Returns the fresh nonce and `wrapped DEK || tag` (48 bytes).
pub fn wrap_key(
    kek: &KeyEncryptionKey,
    data_key: &DataKey,
) -> CryptoResult<([u8; NONCE_SIZE], Vec<u8>)> {
    let nonce = generate_nonce();
    let wrapped = seal(kek.as_bytes(), &nonce, data_key.as_bytes())?;
    Ok((nonce, wrapped))
}

/// Unwrap (decrypt) a data key with the key-encryption key.
pub fn unwrap_key(
    kek: &KeyEncryptionKey,
    nonce: &[u8; NONCE_SIZE],
    wrapped: &[u8],
) -> CryptoResult<DataKey> {
    let plaintext = open(kek.as_bytes(), nonce, wrapped)?;

    if plaintext.len() != KEY_SIZE {
        return Err(CryptoError::Format(format!(
            "unwrapped key has wrong size: {} bytes (expected {KEY_SIZE})",
            plaintext.len()
        )));
    }

    let mut key_bytes = [0u8; KEY_SIZE];
    key_bytes.copy_from_slice(&plaintext);
    Ok(DataKey::from_bytes(key_bytes))
}
