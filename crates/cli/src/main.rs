//! Command-line interface for keyfs.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use keyfs_core::{ClientConfig, Namespace};
use keyfs_transfer::{EncodeOptions, KeyFs, Progress, TransferEngine};
use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Older deployments configured the ceiling through this variable.
const LEGACY_CONCURRENCY_ENV: &str = "S3_CONCURRENCY";

#[derive(Parser)]
#[command(name = "keyfs")]
#[command(about = "Store a file in the names of empty S3 objects")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Debug)]
struct GlobalArgs {
    /// Config file path
    #[arg(long, global = true, env = "KEYFS_CONFIG")]
    config: Option<PathBuf>,

    /// Maximum transfers in flight (overrides config)
    #[arg(long, global = true)]
    concurrency: Option<usize>,

    /// Do not print progress
    #[arg(long, short, global = true, default_value_t = false)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encode a local file into keys under an s3:// location
    Encode {
        /// File to encode
        input: PathBuf,
        /// Target location, e.g. s3://bucket/prefix
        location: String,
        /// Write even if the location already holds objects
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Rebuild a file from the keys under an s3:// location
    Restore {
        /// Source location, e.g. s3://bucket/prefix
        location: String,
        /// Where to write the restored file
        output: PathBuf,
    },
    /// Delete every object under an s3:// location
    Delete {
        /// Location to clear, e.g. s3://bucket/prefix
        location: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let Cli { global, command } = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = load_config(global.config.as_deref())?;
    if let Some(concurrency) = global.concurrency.filter(|n| *n > 0) {
        config.concurrency = concurrency;
    }
    tracing::debug!(?config, "loaded configuration");

    let show_progress = !global.quiet && std::io::stderr().is_terminal();

    match command {
        Commands::Encode {
            input,
            location,
            force,
        } => {
            let namespace = parse_location(&location)?;
            let keyfs = build_keyfs(&namespace, &config, show_progress)?;
            let summary = keyfs
                .encode(&input, &namespace, EncodeOptions { force })
                .await
                .with_context(|| format!("failed to encode {} into {namespace}", input.display()))?;
            println!(
                "Encoded {} bytes into {} keys under {namespace} ({} bytes per key)",
                summary.bytes, summary.chunks, summary.chunk_size
            );
        }
        Commands::Restore { location, output } => {
            let namespace = parse_location(&location)?;
            let keyfs = build_keyfs(&namespace, &config, show_progress)?;
            let summary = keyfs
                .restore(&namespace, &output)
                .await
                .with_context(|| format!("failed to restore {namespace} into {}", output.display()))?;
            println!(
                "Restored {} bytes from {} keys into {}",
                summary.bytes,
                summary.chunks,
                output.display()
            );
            if summary.skipped_foreign > 0 {
                println!("Skipped {} unrecognized keys", summary.skipped_foreign);
            }
        }
        Commands::Delete { location } => {
            let namespace = parse_location(&location)?;
            let keyfs = build_keyfs(&namespace, &config, show_progress)?;
            let summary = keyfs
                .delete(&namespace)
                .await
                .with_context(|| format!("failed to delete {namespace}"))?;
            println!(
                "Deleted {} objects under {namespace} in {} batches",
                summary.deleted, summary.batches
            );
        }
    }

    Ok(())
}

fn parse_location(location: &str) -> Result<Namespace> {
    Namespace::parse(location).context("invalid location")
}

fn build_keyfs(namespace: &Namespace, config: &ClientConfig, show_progress: bool) -> Result<KeyFs> {
    let store = keyfs_storage::from_config(namespace, &config.s3)
        .context("failed to configure S3 backend")?;

    let mut engine = TransferEngine::new(config.concurrency);
    if show_progress {
        engine = engine.with_progress(Arc::new(render_progress));
    }

    Ok(KeyFs::new(store, engine)
        .with_page_size(config.effective_page_size())
        .with_max_key_length(config.max_key_length))
}

fn render_progress(progress: Progress) {
    let mut stderr = std::io::stderr().lock();
    let label = progress.kind.label();
    let _ = match progress.total {
        Some(total) => write!(stderr, "\r{label}: {}/{total}", progress.completed),
        None => write!(stderr, "\r{label}: {}", progress.completed),
    };
    if progress.total == Some(progress.completed) {
        let _ = writeln!(stderr);
    }
    let _ = stderr.flush();
}

fn default_config_path() -> Option<PathBuf> {
    let base = match std::env::var_os("XDG_CONFIG_HOME") {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(std::env::var_os("HOME")?).join(".config"),
    };
    Some(base.join("keyfs").join("config.toml"))
}

/// Layer the config file, the legacy concurrency variable and `KEYFS_*`
/// variables, later sources winning.
fn config_figment(explicit: Option<&Path>) -> Result<Figment> {
    let mut figment = Figment::new();

    match explicit {
        Some(path) => {
            anyhow::ensure!(path.exists(), "config file {} not found", path.display());
            figment = figment.merge(Toml::file(path));
        }
        None => {
            if let Some(path) = default_config_path().filter(|p| p.exists()) {
                figment = figment.merge(Toml::file(path));
            }
        }
    }

    Ok(figment
        .merge(
            Env::raw()
                .only(&[LEGACY_CONCURRENCY_ENV])
                .map(|_| "concurrency".into()),
        )
        .merge(Env::prefixed("KEYFS_").split("__")))
}

fn load_config(explicit: Option<&Path>) -> Result<ClientConfig> {
    let config: ClientConfig = config_figment(explicit)?
        .extract()
        .context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    Ok(config)
}
