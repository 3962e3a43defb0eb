mod classify;
mod config;
mod enrich;
mod import;
mod manifest;
mod pdf;
mod store;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use store::ManifestStore;
use tracing::info;

#[derive(Parser)]
#[command(name = "manifest-import")]
#[command(about = "Import shipment-manifest PDFs and enrich stored bags with SLA data")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = "manifest_import.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a manifest PDF and reconcile its bags into the store
    Import {
        /// Manifest PDF to import
        pdf: PathBuf,
    },
    /// Fetch SLA values for bags still awaiting one
    Enrich,
    /// Show store connectivity and record counts
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_env_filter("info")
        .init();

    let cli = Cli::parse();
    let cfg = config::Config::load(&cli.config)?;

    match cli.command {
        Commands::Import { pdf } => {
            info!(file = %pdf.display(), "Importing manifest");
            let bytes = std::fs::read(&pdf)?;
            let text = pdf::extract_text(&bytes)?;

            let mut store = ManifestStore::open(&cfg.store.db_path)?;
            import::import_document(&mut store, &text, None, &cfg.office.expected_code)?;
        }
        Commands::Enrich => {
            let store = ManifestStore::open(&cfg.store.db_path)?;
            enrich::run_pass(&store, &cfg.tracking).await?;
        }
        Commands::Status => {
            let store = ManifestStore::open(&cfg.store.db_path)?;
            let (total, awaiting, enriched) = store.counts()?;
            info!(
                db_path = %cfg.store.db_path,
                total = total,
                awaiting_sla = awaiting,
                enriched = enriched,
                "Store statistics"
            );
        }
    }

    Ok(())
}
