use svault_crypto::CryptoError;
use thiserror::Error;

pub type VaultResult<T> = Result<T, VaultError>;

#[derive(Debug, Error)]
pub enum VaultError {
    /// Malformed envelope, backup or store content, or an unknown envelope version
    #[error("format error: {0}")]
    Format(String),

    /// AEAD tag mismatch or password verifier mismatch
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Missing or inconsistent caller input
    #[error("validation error: {0}")]
    Validation(String),

    #[error("secret {0} not found")]
    NotFound(u64),

    #[error("vault is already initialized")]
    AlreadyInitialized,

    #[error("vault is not initialized (run setup first)")]
    NotInitialized,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("crypto error: {0}")]
    Crypto(String),

    /// Password rotation refused because these records would not decrypt
    #[error("rotation aborted: {} secret(s) failed to decrypt: {failed:?}", failed.len())]
    RotationAborted { failed: Vec<u64> },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VaultError {
    pub fn validation(msg: impl Into<String>) -> Self {
        VaultError::Validation(msg.into())
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, VaultError::Authentication(_))
    }

    pub fn is_format(&self) -> bool {
        matches!(self, VaultError::Format(_))
    }
}

impl From<CryptoError> for VaultError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Format(msg) => VaultError::Format(msg),
            e @ CryptoError::Authentication => VaultError::Authentication(e.to_string()),
            e @ (CryptoError::Kdf(_) | CryptoError::Encrypt(_)) => {
                VaultError::Crypto(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_errors_keep_their_kind() {
        assert!(VaultError::from(CryptoError::Authentication).is_authentication());
        assert!(VaultError::from(CryptoError::Format("bad".into())).is_format());
        assert!(matches!(
            VaultError::from(CryptoError::Kdf("params".into())),
            VaultError::Crypto(_)
        ));
    }
}
