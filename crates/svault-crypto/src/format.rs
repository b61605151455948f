//! Envelope wire format
//!
//! ```text
//! base64url_nopad( JSON {
//!     "argon2_params": {"hash_len","memory_cost","parallelism","time_cost","type"},
//!     "encrypted_secret":     b64u(cipher_data),
//!     "encrypted_secret_key": b64u(wrapped_key),
//!     "kdf":                  "argon2id",
//!     "master_nonce":         b64u(12 bytes),
//!     "master_salt":          b64u(16 bytes),
//!     "secret_nonce":         b64u(12 bytes),
//!     "v":                    2
//! })
//! ```
//!
//! Keys are emitted in lexicographic order with compact separators, so equal
//! field values always encode to identical strings. Padding is never written
//! but tolerated on decode.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::envelope::{EnvelopeBlob, ENVELOPE_VERSION, KDF_ID};
use crate::kdf::KdfParams;
use crate::{CryptoError, CryptoResult, NONCE_SIZE, SALT_SIZE};

const B64U: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Field order is the canonical key order; do not reorder.
#[derive(Debug, Serialize, Deserialize)]
struct WireEnvelope {
    argon2_params: KdfParams,
    encrypted_secret: String,
    encrypted_secret_key: String,
    kdf: String,
    master_nonce: String,
    master_salt: String,
    secret_nonce: String,
    v: u32,
}

/// Read just the version so unknown revisions are refused before their
/// other fields are interpreted.
#[derive(Deserialize)]
struct VersionTag {
    v: u32,
}

/// Serialize an envelope to its opaque string form.
pub fn encode(blob: &EnvelopeBlob) -> CryptoResult<String> {
    let wire = WireEnvelope {
        argon2_params: blob.kdf_params.clone(),
        encrypted_secret: B64U.encode(&blob.cipher_data),
        encrypted_secret_key: B64U.encode(&blob.wrapped_key),
        kdf: blob.kdf.clone(),
        master_nonce: B64U.encode(blob.master_nonce),
        master_salt: B64U.encode(&blob.master_salt),
        secret_nonce: B64U.encode(blob.data_nonce),
        v: blob.version,
    };

    let json = serde_json::to_vec(&wire)
        .map_err(|e| CryptoError::Encrypt(format!("envelope serialization: {e}")))?;
    Ok(B64U.encode(json))
}

/// Parse an opaque envelope string. Performs no key derivation.
pub fn decode(encoded: &str) -> CryptoResult<EnvelopeBlob> {
    let json = B64U
        .decode(encoded.trim())
        .map_err(|e| CryptoError::Format(format!("envelope base64: {e}")))?;

    let tag: VersionTag = serde_json::from_slice(&json)
        .map_err(|e| CryptoError::Format(format!("envelope JSON: {e}")))?;
    if tag.v != ENVELOPE_VERSION {
        return Err(CryptoError::Format(format!(
            "unsupported envelope version {}",
            tag.v
        )));
    }

    let wire: WireEnvelope = serde_json::from_slice(&json)
        .map_err(|e| CryptoError::Format(format!("envelope fields: {e}")))?;

    if wire.kdf != KDF_ID {
        return Err(CryptoError::Format(format!("unsupported kdf '{}'", wire.kdf)));
    }
    wire.argon2_params.argon2().map_err(CryptoError::Format)?;

    Ok(EnvelopeBlob {
        version: wire.v,
        kdf: wire.kdf,
        master_salt: fixed_field::<SALT_SIZE>("master_salt", &wire.master_salt)?.to_vec(),
        master_nonce: fixed_field("master_nonce", &wire.master_nonce)?,
        wrapped_key: field("encrypted_secret_key", &wire.encrypted_secret_key)?,
        data_nonce: fixed_field("secret_nonce", &wire.secret_nonce)?,
        cipher_data: field("encrypted_secret", &wire.encrypted_secret)?,
        kdf_params: wire.argon2_params,
    })
}

fn field(name: &str, value: &str) -> CryptoResult<Vec<u8>> {
    B64U.decode(value).map_err(|e| CryptoError::Format(format!("{name}: {e}")))
}

fn fixed_field<const N: usize>(name: &str, value: &str) -> CryptoResult<[u8; N]> {
    let bytes = field(name, value)?;
    bytes.as_slice().try_into().map_err(|_| {
        CryptoError::Format(format!("{name}: expected {N} bytes, got {}", bytes.len()))
    })
}
