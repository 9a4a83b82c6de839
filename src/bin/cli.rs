//! sheetpress CLI
//!
//! Serves snapshots over HTTP, or runs one-off maintenance commands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sheetpress::{
    error::Result,
    models::{ProjectConfig, Settings},
    pipeline,
    runtime::Runtime,
    server,
    services::Credentials,
    storage::SnapshotStore,
};

/// sheetpress - Spreadsheet Snapshot Publisher
#[derive(Parser, Debug)]
#[command(
    name = "sheetpress",
    version,
    about = "Publishes spreadsheet ranges as live and dated JSON snapshots"
)]

struct Cli {
    /// Directory relative paths in the environment are resolved against
    #[arg(short, long, default_value = ".")]
    base_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server with the startup and daily archival cycles
    Serve {
        /// Listen address (default: BIND_ADDR or 0.0.0.0:5000)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Run one archival cycle and exit
    Archive,

    /// Validate project configuration and credentials
    Validate,

    /// Show live snapshot and archive info
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

    let mut settings = Settings::from_env(&cli.base_dir)?;
    if let Command::Serve { bind: Some(bind) } = &cli.command {
        settings.bind_addr = bind.clone();
    }
    log::debug!("Resolved settings: {:?}", settings.config_path);

    let runtime = Runtime::build(settings)?;

    match cli.command {
        Command::Serve { .. } => {
            runtime.prepare().await?;
            log::info!("sheetpress starting...");

            let scheduler = pipeline::spawn_scheduler(
                runtime.archiver.clone(),
                runtime.schedule(),
                runtime.clock.clone(),
            );
            let result = server::serve(runtime.router(), &runtime.settings.bind_addr).await;
            scheduler.abort();
            result?;
        }

        Command::Archive => {
            runtime.prepare().await?;
            let report = runtime.archiver.run_cycle().await?;
            log::info!(
                "Archived {} ({} datasets, {} records)",
                report.date,
                report.dataset_count,
                report.record_count
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            let config = match ProjectConfig::load(&runtime.settings.config_path) {
                Ok(config) => config,
                Err(e) => {
                    log::error!("Config validation failed: {}", e);
                    return Err(e);
                }
            };
            log::info!(
                "✓ Config OK: sheet {} with {} datasets",
                config.sheet_id,
                config.datasets.len()
            );
            for dataset in &config.datasets {
                log::info!(
                    "    {} <- {} ({} fields)",
                    dataset.name,
                    dataset.range,
                    dataset.fields.len()
                );
            }

            match Credentials::load(runtime.settings.credentials_path.as_deref()) {
                Ok(_) => log::info!("✓ Credentials OK"),
                Err(e) => log::warn!("Credentials unusable, extraction will fail: {}", e),
            }

            log::info!("All validations passed!");
        }

        Command::Info => {
            log::info!("Live snapshot: {}", runtime.storage.live_path().display());
            match runtime.storage.load_live().await? {
                Some(doc) => {
                    log::info!("Generated at: {}", doc.meta.generated_at_utc.to_rfc3339());
                    for (name, records) in &doc.datasets {
                        log::info!("    {}: {} records", name, records.len());
                    }
                }
                None => log::info!("No live snapshot yet."),
            }

            let manifest = runtime.storage.load_manifest().await?;
            match (manifest.first(), manifest.last()) {
                (Some(first), Some(last)) => log::info!(
                    "History: {} snapshots from {} to {}",
                    manifest.len(),
                    first,
                    last
                ),
                _ => log::info!("History: empty"),
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
