//! Two-layer envelope: plaintext sealed under a one-time DEK, DEK sealed
//! under an Argon2-derived KEK.
//!
//! Each call to [`EnvelopeBlob::seal`] mints a fresh salt, two fresh nonces
//! and a fresh DEK, so sealing the same plaintext twice never yields the
//! same blob. The tag on `wrapped_key` is the only password check: a wrong
//! password fails there, before `cipher_data` is touched.

use rand::RngCore;
use secrecy::SecretString;
use zeroize::Zeroizing;

use crate::kdf::{derive_key, KdfParams};
use crate::keys::{generate_data_key, generate_nonce, open, seal, unwrap_key, wrap_key};
use crate::{format, CryptoError, CryptoResult, NONCE_SIZE, SALT_SIZE};

/// The only envelope revision this crate reads or writes.
pub const ENVELOPE_VERSION: u32 = 2;

/// KDF identifier recorded in every envelope.
pub const KDF_ID: &str = "argon2id";

/// Decoded envelope fields. Binary fields are raw bytes here; the base64url
/// form only exists in [`format`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeBlob {
    pub version: u32,
    pub kdf: String,
    pub master_salt: Vec<u8>,
    pub master_nonce: [u8; NONCE_SIZE],
    /// DEK sealed under the KEK (`encrypted_secret_key` on the wire)
    pub wrapped_key: Vec<u8>,
    /// Nonce for `cipher_data` (`secret_nonce` on the wire)
    pub data_nonce: [u8; NONCE_SIZE],
    /// Plaintext sealed under the DEK (`encrypted_secret` on the wire)
    pub cipher_data: Vec<u8>,
    pub kdf_params: KdfParams,
}

impl EnvelopeBlob {
    /// Seal `plaintext` under `password`, deriving the KEK with `params`.
    pub fn seal(
        plaintext: &[u8],
        password: &SecretString,
        params: &KdfParams,
    ) -> CryptoResult<Self> {
        let data_key = generate_data_key();
        let data_nonce = generate_nonce();
        let cipher_data = seal(data_key.as_bytes(), &data_nonce, plaintext)?;

        let mut master_salt = vec![0u8; SALT_SIZE];
        rand::thread_rng().fill_bytes(&mut master_salt);
        let kek = derive_key(password, &master_salt, params)?;

        let (master_nonce, wrapped_key) = wrap_key(&kek, &data_key)?;

        Ok(Self {
            version: ENVELOPE_VERSION,
            kdf: KDF_ID.to_string(),
            master_salt,
            master_nonce,
            wrapped_key,
            data_nonce,
            cipher_data,
            kdf_params: params.clone(),
        })
    }

    /// Recover the plaintext bytes, re-deriving the KEK from the embedded
    /// salt and params.
    pub fn open(&self, password: &SecretString) -> CryptoResult<Zeroizing<Vec<u8>>> {
        if self.version != ENVELOPE_VERSION {
            return Err(CryptoError::Format(format!(
                "unsupported envelope version {}",
                self.version
            )));
        }

        let kek = derive_key(password, &self.master_salt, &self.kdf_params)?;
        let data_key = unwrap_key(&kek, &self.master_nonce, &self.wrapped_key)?;
        open(data_key.as_bytes(), &self.data_nonce, &self.cipher_data)
    }
}

/// Encrypt a text secret under the master password with default KDF costs.
pub fn encrypt(plaintext: &str, password: &SecretString) -> CryptoResult<String> {
    encrypt_with(plaintext, password, &KdfParams::default())
}

/// Encrypt a text secret with explicit KDF costs for the new blob.
pub fn encrypt_with(
    plaintext: &str,
    password: &SecretString,
    params: &KdfParams,
) -> CryptoResult<String> {
    let blob = EnvelopeBlob::seal(plaintext.as_bytes(), password, params)?;
    format::encode(&blob)
}

/// Decrypt an encoded envelope back to its text secret.
pub fn decrypt(encoded: &str, password: &SecretString) -> CryptoResult<SecretString> {
    let blob = format::decode(encoded)?;
    let plaintext = blob.open(password)?;
    let text = std::str::from_utf8(&plaintext)
        .map_err(|_| CryptoError::Format("decrypted secret is not valid UTF-8".into()))?;
    Ok(SecretString::from(text.to_string()))
}
