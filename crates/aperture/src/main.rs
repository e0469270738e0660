//! Aperture CLI - image ingestion pipeline.
//!
//! Aperture validates uploaded images, derives multi-size thumbnails,
//! extracts metadata, and persists an accumulated record per image that
//! can be queried back by filename.
//!
//! # Usage
//!
//! ```bash
//! # Ingest a single image through the full pipeline
//! aperture process ./cat.jpg
//!
//! # Query the persisted record
//! aperture status cat.jpg
//!
//! # View configuration
//! aperture config show
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Aperture - validate, thumbnail, extract, persist and query images.
#[derive(Parser, Debug)]
#[command(name = "aperture")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest an image through the full pipeline
    Process(cli::process::ProcessArgs),

    /// Query the persisted record for an ingested image
    Status(cli::status::StatusArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging from config, with CLI verbose override.
    // Note: logging isn't initialized yet, so use eprintln for config warnings.
    let config = match aperture_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `aperture config path`."
            );
            aperture_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Aperture v{}", aperture_core::VERSION);

    // Dispatch to the appropriate command handler
    match cli.command {
        Commands::Process(args) => cli::process::execute(args, &config).await,
        Commands::Status(args) => cli::status::execute(args, &config).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
