use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use encryption::{Algorithm, SessionSecret};
use pipeline::{ComparisonReport, FileEncryptionOrchestrator, OrchestratorConfig};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Once;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let format = std::env::var("VAULT_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

        // Logs go to stderr so stdout stays machine-readable.
        if format.eq_ignore_ascii_case("json") {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter.clone())
                .with_target(true)
                .with_writer(io::stderr)
                .json()
                .flatten_event(true)
                .init();
        } else {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(true)
                .with_writer(io::stderr)
                .compact()
                .init();
        }
    });
}

#[derive(Parser)]
#[command(name = "vaultctl")]
#[command(about = "Tri-cipher file vault control utility", long_about = None)]
struct Cli {
    /// TOML orchestrator config. Falls back to VAULT_* environment variables.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the storage root from the config.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a fresh base64 session secret
    Keygen,
    /// Encrypt a file under all three algorithms and print the comparison report
    Encrypt {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
        /// Identifier the blobs and keys are bound to
        #[arg(long)]
        id: String,
        #[arg(long, env = "VAULT_SESSION_SECRET", hide_env_values = true)]
        secret: String,
    },
    /// Decrypt one algorithm's blob
    Decrypt {
        /// aes, 3des or rc4
        #[arg(short, long)]
        algorithm: Algorithm,
        #[arg(long)]
        id: String,
        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, env = "VAULT_SESSION_SECRET", hide_env_values = true)]
        secret: String,
    },
    /// Remove all three blobs for an identifier
    Delete {
        #[arg(long)]
        id: String,
    },
    /// Show which blobs exist for an identifier
    Status {
        #[arg(long)]
        id: String,
    },
    /// Encrypt a single field value without touching storage
    Field {
        #[arg(long)]
        file_id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        value: String,
        #[arg(long, env = "VAULT_SESSION_SECRET", hide_env_values = true)]
        secret: String,
    },
}

fn load_config(cli: &Cli) -> Result<OrchestratorConfig> {
    let mut config = match &cli.config {
        Some(path) => OrchestratorConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => OrchestratorConfig::from_env().context("invalid VAULT_* environment")?,
    };
    if let Some(root) = &cli.root {
        config.storage_root = root.clone();
    }
    Ok(config)
}

fn parse_secret(encoded: &str) -> Result<SessionSecret> {
    SessionSecret::from_base64(encoded.trim()).map_err(|e| anyhow!("bad session secret: {e}"))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

async fn run(command: Commands, orch: FileEncryptionOrchestrator) -> Result<()> {
    match command {
        Commands::Keygen => println!("{}", SessionSecret::generate().to_base64()),
        Commands::Encrypt { input, id, secret } => {
            let secret = parse_secret(&secret)?;
            let data = fs::read(&input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let stored = orch
                .encrypt_file_with_derived_keys(&data, &id, &secret)
                .await?;
            print_json(&ComparisonReport::new(id, data.len(), &stored))?;
        }
        Commands::Decrypt {
            algorithm,
            id,
            output,
            secret,
        } => {
            let secret = parse_secret(&secret)?;
            let key = orch
                .key_manager()
                .derive_file_key(&secret, &id, algorithm)?;
            let plain = orch.decrypt_file(algorithm, &id, key.as_bytes()).await?;
            match output {
                Some(path) => {
                    fs::write(&path, plain.plaintext())
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    tracing::info!(%algorithm, path = %path.display(), "plaintext written");
                }
                None => io::stdout().write_all(plain.plaintext())?,
            }
        }
        Commands::Delete { id } => {
            let removed = orch.delete_files(&id).await;
            print_json(&removed)?;
        }
        Commands::Status { id } => {
            let present = orch.check_files_exist(&id).await;
            print_json(&present)?;
        }
        Commands::Field {
            file_id,
            name,
            value,
            secret,
        } => {
            let secret = parse_secret(&secret)?;
            let fields = orch
                .encrypt_field(value.as_bytes(), &file_id, &name, &secret)
                .await?;
            print_json(&fields)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = load_config(&cli)?;
    if config.storage_root.as_os_str().is_empty() {
        bail!("storage root must not be empty");
    }
    let orch = FileEncryptionOrchestrator::from_config(config);

    let rt = Runtime::new()?;
    rt.block_on(run(cli.command, orch))
}
