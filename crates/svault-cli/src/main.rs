//! svault: local secret vault CLI
//!
//! Commands:
//!   init                 - create the vault and set the master password
//!   add                  - encrypt and store a new secret
//!   list [--category]    - list stored secrets (metadata only)
//!   show <id>            - decrypt and print one secret
//!   delete <id>          - remove a secret
//!   import <file.json>   - merge a backup file into the vault
//!   export <file.json>   - write a backup file of every secret
//!   passwd               - change the master password (re-encrypts everything)
//!   logs                 - show the audit log, newest first
//!   config show          - display current configuration
//!
//! The master password is read from SVAULT_PASSWORD or prompted for.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::{ExposeSecret, SecretString};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use svault_core::config::{expand_tilde, VaultConfig};
use svault_core::timefmt::{format_date, format_date_time, local};
use svault_core::{Category, NewSecret};
use svault_store::{Reveal, RotationPolicy, Session, Vault};

const PASSWORD_ENV: &str = "SVAULT_PASSWORD";
const NEW_PASSWORD_ENV: &str = "SVAULT_NEW_PASSWORD";

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "svault",
    version,
    about = "Local secret vault",
    long_about = "svault: store seeds, private keys and other secrets encrypted under a master password"
)]
struct Cli {
    /// Path to svault.toml configuration file
    #[arg(long, short = 'c', env = "SVAULT_CONFIG", default_value = "~/.svault/svault.toml")]
    config: PathBuf,

    /// Log level (overrides config; RUST_LOG overrides both)
    #[arg(long, env = "SVAULT_LOG")]
    log: Option<String>,

    /// Log format (overrides config)
    #[arg(long, env = "SVAULT_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    fn from_config(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the vault and set the master password
    Init,

    /// Encrypt and store a new secret
    ///
    /// The secret itself is prompted for without echo, or read from stdin
    /// with --stdin (e.g. a multi-line seed phrase).
    Add {
        /// Seed, Private Key or Other
        #[arg(long, short = 't', default_value = "Other")]
        category: Category,
        /// Display label
        #[arg(long, short = 'l')]
        label: String,
        /// Free-form tag
        #[arg(long, default_value = "")]
        tag: String,
        /// Read the secret from stdin instead of prompting
        #[arg(long)]
        stdin: bool,
    },

    /// List stored secrets
    List {
        /// Only show one category (default: all categories)
        #[arg(long, short = 't')]
        category: Option<Category>,
    },

    /// Decrypt and print one secret
    Show {
        id: u64,
    },

    /// Delete a secret
    Delete {
        id: u64,
    },

    /// Merge a backup file into the vault
    ///
    /// Records already present are skipped; records that do not decrypt
    /// under the current master password are rejected.
    Import {
        /// Backup file (.json)
        file: PathBuf,
    },

    /// Write every secret (still encrypted) to a backup file
    Export {
        file: PathBuf,
    },

    /// Change the master password and re-encrypt every secret
    Passwd {
        /// Rotate what decrypts and leave the rest under the old password
        #[arg(long)]
        skip_undecryptable: bool,
    },

    /// Show the audit log, newest first
    Logs,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let config = load_config(&config_path).await?;

    let level = cli.log.as_deref().unwrap_or(&config.logging.level);
    let format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| LogFormat::from_config(&config.logging.format));
    init_logging(level, &format);
    tracing::debug!(config = %config_path.display(), "configuration loaded");

    match cli.command {
        Commands::Init => cmd_init(&config).await,
        Commands::Add { category, label, tag, stdin } => {
            cmd_add(&config, category, label, tag, stdin).await
        }
        Commands::List { category } => cmd_list(&config, category).await,
        Commands::Show { id } => cmd_show(&config, id).await,
        Commands::Delete { id } => cmd_delete(&config, id).await,
        Commands::Import { file } => cmd_import(&config, file).await,
        Commands::Export { file } => cmd_export(&config, file).await,
        Commands::Passwd { skip_undecryptable } => cmd_passwd(&config, skip_undecryptable).await,
        Commands::Logs => cmd_logs(&config).await,
        Commands::Config { action: ConfigAction::Show } => cmd_config_show(&config, &config_path),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

async fn load_config(path: &Path) -> Result<VaultConfig> {
    if path.exists() {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading config: {}", path.display()))?;
        VaultConfig::from_toml(&content)
            .with_context(|| format!("parsing config: {}", path.display()))
    } else {
        Ok(VaultConfig::default())
    }
}

// ── Password input ────────────────────────────────────────────────────────────

fn read_password(env: &str, prompt: &str) -> Result<SecretString> {
    if let Ok(value) = std::env::var(env) {
        return Ok(SecretString::from(value));
    }
    let value = rpassword::prompt_password(prompt).context("reading password")?;
    Ok(SecretString::from(value))
}

/// A new password, entered twice unless supplied by environment.
fn read_new_password(env: &str) -> Result<(SecretString, SecretString)> {
    if let Ok(value) = std::env::var(env) {
        return Ok((SecretString::from(value.clone()), SecretString::from(value)));
    }
    let new = rpassword::prompt_password("New master password: ").context("reading password")?;
    let confirm =
        rpassword::prompt_password("Confirm new master password: ").context("reading password")?;
    Ok((SecretString::from(new), SecretString::from(confirm)))
}

fn read_secret(from_stdin: bool) -> Result<SecretString> {
    let value = if from_stdin {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading secret from stdin")?;
        buf.trim_end_matches(['\r', '\n']).to_string()
    } else {
        rpassword::prompt_password("Secret: ").context("reading secret")?
    };
    Ok(SecretString::from(value))
}

// ── Progress helpers ──────────────────────────────────────────────────────────

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Vault operations block on key derivation.
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("vault task failed")?
}

/// Unlock the vault and run `f` with the session, behind a spinner.
async fn with_session<T, F>(config: &VaultConfig, prefix: &str, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut Vault, &mut Session) -> Result<T> + Send + 'static,
{
    let password = read_password(PASSWORD_ENV, "Master password: ")?;
    let config = config.clone();

    let pb = make_spinner(prefix);
    pb.set_message("unlocking vault...");
    let result = run_blocking(move || {
        let mut vault = Vault::open(&config).context("opening vault")?;
        if !vault.is_initialized() {
            anyhow::bail!("vault is not initialized (run `svault init` first)");
        }
        let outcome = vault.login(&password)?;
        let mut session = outcome.session;
        let out = f(&mut vault, &mut session)?;
        Ok((outcome.restored, out))
    })
    .await;
    pb.finish_and_clear();

    let (restored, out) = result?;
    if restored > 0 {
        eprintln!("restored {restored} secret(s) from backup");
    }
    Ok(out)
}

// ── `svault init` ─────────────────────────────────────────────────────────────

async fn cmd_init(config: &VaultConfig) -> Result<()> {
    let (password, confirm) = read_new_password(PASSWORD_ENV)?;
    if password.expose_secret() != confirm.expose_secret() {
        anyhow::bail!("passwords do not match");
    }
    let config = config.clone();

    let pb = make_spinner("init");
    pb.set_message("hashing master password...");
    let result = run_blocking(move || {
        let mut vault = Vault::open(&config).context("opening vault")?;
        vault.setup(&password)?;
        Ok(config.vault.data_dir())
    })
    .await;
    pb.finish_and_clear();

    let data_dir = result?;
    println!("vault initialized in {}", data_dir.display());
    Ok(())
}

// ── `svault add` ──────────────────────────────────────────────────────────────

async fn cmd_add(
    config: &VaultConfig,
    category: Category,
    label: String,
    tag: String,
    from_stdin: bool,
) -> Result<()> {
    let content = read_secret(from_stdin)?;
    let secret = NewSecret::new(category, label, tag, content);
    secret.validate()?;

    let record = with_session(config, "add", move |vault, session| {
        Ok(vault.upload(session, secret)?)
    })
    .await?;

    println!("stored secret {} ({}: {})", record.id, record.category, record.label);
    Ok(())
}

// ── `svault list` ─────────────────────────────────────────────────────────────

async fn cmd_list(config: &VaultConfig, category: Option<Category>) -> Result<()> {
    let records = with_session(config, "list", move |vault, session| {
        Ok(vault
            .list(session, category)
            .into_iter()
            .cloned()
            .collect::<Vec<_>>())
    })
    .await?;

    if records.is_empty() {
        println!("no secrets stored");
        return Ok(());
    }

    println!("{:<6} {:<12} {:<24} {:<12} CREATED", "ID", "CATEGORY", "LABEL", "TAG");
    for r in &records {
        println!(
            "{:<6} {:<12} {:<24} {:<12} {}",
            r.id,
            r.category,
            r.label,
            r.tag,
            format_date(&local(r.created_at))
        );
    }
    println!("\n{} secret(s)", records.len());
    Ok(())
}

// ── `svault show` ─────────────────────────────────────────────────────────────

async fn cmd_show(config: &VaultConfig, id: u64) -> Result<()> {
    let revealed = with_session(config, "show", move |vault, session| {
        Ok(vault.reveal(session, id)?)
    })
    .await?;

    let record = &revealed.record;
    println!("id:       {}", record.id);
    println!("category: {}", record.category);
    println!("label:    {}", record.label);
    if !record.tag.is_empty() {
        println!("tag:      {}", record.tag);
    }
    println!("created:  {}", format_date_time(&local(record.created_at)));

    match revealed.content {
        Reveal::Plaintext(secret) => {
            println!();
            println!("{}", secret.expose_secret());
            Ok(())
        }
        Reveal::Failed(e) => anyhow::bail!("decryption failed: {e}"),
    }
}

// ── `svault delete` ───────────────────────────────────────────────────────────

async fn cmd_delete(config: &VaultConfig, id: u64) -> Result<()> {
    let record = with_session(config, "delete", move |vault, session| {
        Ok(vault.delete(session, id)?)
    })
    .await?;

    println!("deleted secret {} ({})", record.id, record.label);
    Ok(())
}

// ── `svault import` / `svault export` ─────────────────────────────────────────

async fn cmd_import(config: &VaultConfig, file: PathBuf) -> Result<()> {
    let path = expand_tilde(&file);
    let display = path.display().to_string();
    let report = with_session(config, "import", move |vault, session| {
        vault
            .import_file(session, &path)
            .with_context(|| format!("importing {display}"))
    })
    .await?;

    println!(
        "imported {} secret(s): {} already present, {} rejected",
        report.accepted, report.skipped_existing, report.rejected
    );
    if report.rejected > 0 {
        eprintln!("rejected records are missing data or do not decrypt under this master password");
    }
    Ok(())
}

async fn cmd_export(config: &VaultConfig, file: PathBuf) -> Result<()> {
    let path = expand_tilde(&file);
    let target = path.clone();
    let count = with_session(config, "export", move |vault, session| {
        vault
            .export(session, &target)
            .with_context(|| format!("exporting to {}", target.display()))
    })
    .await?;

    println!("exported {count} secret(s) to {}", path.display());
    Ok(())
}

// ── `svault passwd` ───────────────────────────────────────────────────────────

async fn cmd_passwd(config: &VaultConfig, skip_undecryptable: bool) -> Result<()> {
    let old = read_password(PASSWORD_ENV, "Current master password: ")?;
    let (new, confirm) = read_new_password(NEW_PASSWORD_ENV)?;
    let policy = if skip_undecryptable {
        RotationPolicy::SkipAndReport
    } else {
        RotationPolicy::AllOrNothing
    };
    let config = config.clone();

    let pb = make_spinner("passwd");
    pb.set_message("re-encrypting secrets...");
    let result = run_blocking(move || {
        let mut vault = Vault::open(&config).context("opening vault")?;
        let mut session = vault.login(&old)?.session;
        Ok(vault.change_password(&mut session, &old, &new, &confirm, policy)?)
    })
    .await;
    pb.finish_and_clear();

    let report = result?;
    println!("master password changed; {} secret(s) re-encrypted", report.rotated);
    if !report.skipped.is_empty() {
        eprintln!(
            "warning: {} secret(s) still under the old password: {:?}",
            report.skipped.len(),
            report.skipped
        );
    }
    Ok(())
}

// ── `svault logs` ─────────────────────────────────────────────────────────────

async fn cmd_logs(config: &VaultConfig) -> Result<()> {
    let entries = with_session(config, "logs", |vault, _session| Ok(vault.logs()?)).await?;

    for event in entries {
        let when = format_date_time(&local(event.timestamp));
        match (event.secret_id, event.label) {
            (Some(id), Some(label)) => println!("{when}  {} (#{id} {label})", event.action),
            _ => println!("{when}  {}", event.action),
        }
    }
    Ok(())
}

// ── `svault config show` ──────────────────────────────────────────────────────

fn cmd_config_show(config: &VaultConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}
