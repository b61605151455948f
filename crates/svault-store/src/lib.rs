//! svault-store: the live record store and every operation that mutates it
//!
//! - [`repository`]: `SecretRepository` trait with JSON-file and in-memory backends
//! - [`backup`]: full-replace backup snapshots and lenient candidate parsing
//! - [`import`]: id-keyed merge gated on decryptability under the session password
//! - [`rotate`]: master password rotation (decrypt → re-encrypt every record)
//! - [`vault`]: the facade that sequences commit → snapshot → audit per operation

pub mod audit;
pub mod auth;
pub mod backup;
pub mod fsutil;
pub mod import;
pub mod repository;
pub mod rotate;
pub mod vault;

pub use audit::{AuditEvent, AuditLog, JsonlAuditLog, MemoryAuditLog};
pub use auth::Session;
pub use backup::{BackupEntry, BackupStore};
pub use import::{merge, MergeReport};
pub use repository::{
    EncryptedDraft, JsonRepository, MemoryRepository, SecretRepository, UpdateBatch,
};
pub use rotate::{rotate, RotationPolicy, RotationReport};
pub use vault::{LoginOutcome, Reveal, Revealed, Vault};
