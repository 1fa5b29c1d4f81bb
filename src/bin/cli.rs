//! birdwatch CLI
//!
//! Local execution entry point, intended to run from cron or a systemd
//! timer: one invocation is one watch cycle.

use std::path::PathBuf;
use std::sync::Arc;

use birdwatch::{
    error::Result,
    models::Config,
    pipeline,
    storage::{CheckpointStore, LocalStorage},
};
use clap::{Parser, Subcommand};

/// birdwatch - Profile Watcher
#[derive(Parser, Debug)]
#[command(
    name = "birdwatch",
    version,
    about = "Watches profiles through mirror instances and posts new activity to a webhook"
)]

struct Cli {
    /// Path to storage directory containing watch.toml and state files
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one watch cycle for the configured handles
    Watch {
        /// Watch a single handle instead of the configured list
        #[arg(long)]
        handle: Option<String>,

        /// Fetch and reconcile, but deliver nothing and keep checkpoints
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate configuration
    Validate,

    /// Show persisted checkpoints
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("birdwatch starting...");

    // Load configuration; environment variables beat the file.
    let config_path = cli.storage_dir.join("watch.toml");
    let mut config = Config::load_or_default(&config_path);
    config.apply_env_overrides();

    let storage = LocalStorage::new(&cli.storage_dir);

    match cli.command {
        Command::Watch { handle, dry_run } => {
            if let Some(handle) = handle {
                config.watch.handles = vec![handle];
            }
            config.validate()?;

            let config = Arc::new(config);
            let outcomes = pipeline::run_all(Arc::clone(&config), &storage, dry_run).await?;

            let delivered: usize = outcomes.iter().map(|outcome| outcome.delivered).sum();
            log::info!(
                "Watch complete: {} handles checked, {} new posts delivered",
                outcomes.len(),
                delivered
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!(
                "✓ Config OK ({} handles, {} mirrors)",
                config.watch.handles.len(),
                config.fetch.mirrors.len()
            );
        }

        Command::Info => {
            log::info!("Storage directory: {}", cli.storage_dir.display());

            if config.watch.handles.is_empty() {
                log::info!("No handles configured.");
            }
            for handle in &config.watch.handles {
                let checkpoint = storage.load(handle).await?;
                match (&checkpoint.last_id, &checkpoint.updated_at) {
                    (Some(id), Some(at)) => log::info!("@{handle}: last post {id}, updated {at}"),
                    (Some(id), None) => log::info!("@{handle}: last post {id}"),
                    _ => log::info!("@{handle}: no checkpoint yet"),
                }
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
