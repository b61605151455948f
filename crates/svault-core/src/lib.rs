pub mod config;
pub mod error;
pub mod timefmt;
pub mod types;

pub use error::{VaultError, VaultResult};
pub use types::{Category, NewSecret, SecretRecord};
