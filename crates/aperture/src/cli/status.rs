//! The `aperture status` command: query the persisted record by filename.

use clap::Args;
use std::sync::Arc;

use aperture_core::store::FileKvStore;
use aperture_core::{Config, StatusResolver};

/// Arguments for the `status` command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Client-facing image identifier (the filename as uploaded)
    #[arg(required = true)]
    pub filename: String,
}

/// Execute the status command.
pub async fn execute(args: StatusArgs, config: &Config) -> anyhow::Result<()> {
    let records = Arc::new(FileKvStore::new(config.data_dir().join("records.json")));
    let resolver = StatusResolver::new(records, config.query.clone());

    let response = resolver.respond(Some(&args.filename)).await;
    tracing::debug!(status = response.status, "query complete");

    println!("{}", serde_json::to_string_pretty(&response.body)?);

    // Not-found is a valid negative answer; only a store failure is an
    // actual command failure
    if response.status >= 500 {
        anyhow::bail!("status query failed with status {}", response.status);
    }
    Ok(())
}
