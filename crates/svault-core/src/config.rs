use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use svault_crypto::KdfParams;

use crate::{VaultError, VaultResult};

/// Top-level configuration (loaded from svault.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub vault: StorageConfig,
    pub crypto: CryptoConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the store, backup and audit files (default: ~/.svault)
    pub data_dir: PathBuf,
    /// Live store file, relative to data_dir unless absolute
    pub store_file: PathBuf,
    /// Backup snapshot rewritten after every mutation
    pub backup_file: PathBuf,
    /// Append-only audit log (JSON lines)
    pub audit_file: PathBuf,
    /// Re-admit records from the backup file on every login
    pub restore_on_login: bool,
}

/// Argon2id costs for newly written envelopes and verifiers. Existing blobs
/// always decode with the params embedded in them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB)
    pub argon2_mem_cost_kib: u32,
    /// Argon2id time cost (iterations, default: 3)
    pub argon2_time_cost: u32,
    /// Argon2id parallelism (default: 4)
    pub argon2_parallelism: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (default: warn)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("~/.svault"),
            store_file: PathBuf::from("vault.json"),
            backup_file: PathBuf::from("backup.json"),
            audit_file: PathBuf::from("audit.jsonl"),
            restore_on_login: true,
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            argon2_mem_cost_kib: 65536,
            argon2_time_cost: 3,
            argon2_parallelism: 4,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "text".into(),
        }
    }
}

impl CryptoConfig {
    pub fn kdf_params(&self) -> KdfParams {
        KdfParams::argon2id(
            self.argon2_mem_cost_kib,
            self.argon2_time_cost,
            self.argon2_parallelism,
        )
    }
}

impl StorageConfig {
    pub fn data_dir(&self) -> PathBuf {
        expand_tilde(&self.data_dir)
    }

    pub fn store_path(&self) -> PathBuf {
        self.resolve(&self.store_file)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.resolve(&self.backup_file)
    }

    pub fn audit_path(&self) -> PathBuf {
        self.resolve(&self.audit_file)
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        let file = expand_tilde(file);
        if file.is_absolute() {
            file
        } else {
            self.data_dir().join(file)
        }
    }
}

impl VaultConfig {
    /// Parse a TOML document; missing sections and keys take defaults.
    pub fn from_toml(content: &str) -> VaultResult<Self> {
        toml::from_str(content).map_err(|e| VaultError::Config(e.to_string()))
    }

    /// Load from `path`, or fall back to defaults when the file is absent.
    pub fn load(path: &Path) -> VaultResult<Self> {
        if !path.exists() {
            tracing::debug!("config file not found: {} (using defaults)", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| VaultError::Config(format!("parsing {}: {e}", path.display())))
    }
}

/// Expand a leading `~` to $HOME.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}
