use thiserror::Error;

pub type CryptoResult<T> = Result<T, CryptoError>;

/// Failure kinds of the envelope codec.
///
/// AEAD cannot tell a wrong password from tampered ciphertext, so both
/// surface as [`CryptoError::Authentication`].
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("malformed envelope: {0}")]
    Format(String),

    #[error("authentication failed: wrong password or corrupted data")]
    Authentication,

    #[error("key derivation failed: {0}")]
    Kdf(String),

    #[error("encryption failed: {0}")]
    Encrypt(String),
}

impl CryptoError {
    pub fn is_authentication(&self) -> bool {
        matches!(self, CryptoError::Authentication)
    }

    pub fn is_format(&self) -> bool {
        matches!(self, CryptoError::Format(_))
    }
}
