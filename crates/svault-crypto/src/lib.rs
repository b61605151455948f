//! svault-crypto: envelope encryption for individual vault secrets
//!
//! Every secret is sealed under its own one-time data key (DEK), and that
//! DEK is sealed under a key-encryption key (KEK) derived from the master
//! password. Both layers are AES-256-GCM.
//!
//! ```text
//! master password ──Argon2id(salt, params)──▶ KEK (256-bit, per blob)
//!                                              └── wraps DEK (random 256-bit, per blob)
//!                                                   └── seals plaintext secret
//! ```
//!
//! The resulting [`EnvelopeBlob`] carries everything needed to reverse the
//! process except the password, and is serialized to a single base64url
//! string by [`format`].

pub mod envelope;
pub mod error;
pub mod format;
pub mod kdf;
pub mod keys;
pub mod verifier;

pub use envelope::{decrypt, encrypt, encrypt_with, EnvelopeBlob, ENVELOPE_VERSION, KDF_ID};
pub use error::{CryptoError, CryptoResult};
pub use kdf::{
    derive_key, KdfAlgorithm, KdfParams, KeyEncryptionKey, MAX_MEM_COST_KIB, MAX_PARALLELISM,
    MAX_TIME_COST,
};
pub use keys::{generate_data_key, unwrap_key, wrap_key, DataKey};
pub use verifier::{hash_password, verify_password};

/// Size of every symmetric key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of the per-blob KDF salt
pub const SALT_SIZE: usize = 16;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;
