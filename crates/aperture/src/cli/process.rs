//! The `aperture process` command: ingest one image through the pipeline.
//!
//! Stages the file into the local object store the way the ingress bucket
//! would receive it, then runs validate → thumbnails → metadata → persist
//! against the filesystem-backed stores under the configured data
//! directory. The resulting record is printed to stdout.

use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aperture_core::labels::{HttpLabelDetector, LabelDetector};
use aperture_core::store::{FileKvStore, LocalObjectStore, ObjectStore};
use aperture_core::{Config, PipelineRunner};

/// Arguments for the `process` command.
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Image file to ingest
    #[arg(required = true)]
    pub input: PathBuf,

    /// Pretty-print the resulting record
    #[arg(long)]
    pub pretty: bool,
}

/// Execute the process command.
pub async fn execute(args: ProcessArgs, config: &Config) -> anyhow::Result<()> {
    let data_dir = config.data_dir();
    let objects = Arc::new(LocalObjectStore::new(data_dir.join("objects")));
    let records = Arc::new(FileKvStore::new(data_dir.join("records.json")));

    let detector: Option<Arc<dyn LabelDetector>> = if config.labels.enabled {
        Some(Arc::new(HttpLabelDetector::new(
            &config.labels.endpoint,
            Duration::from_millis(config.labels.timeout_ms),
        )))
    } else {
        None
    };

    let file_name = args
        .input
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("input path has no file name: {}", args.input.display()))?;

    // Stage the upload under the ingestion prefix, as the ingress bucket
    // would hold it
    let key = format!(
        "{}/{}",
        config.query.key_prefix.trim_end_matches('/'),
        file_name
    );
    let bytes = std::fs::read(&args.input)?;
    objects
        .put(
            &config.storage.upload_bucket,
            &key,
            bytes,
            "application/octet-stream",
        )
        .await?;
    tracing::info!(bucket = %config.storage.upload_bucket, key = %key, "upload staged");

    let runner = PipelineRunner::new(config, objects, records, detector);
    let trigger = serde_json::json!({
        "s3_bucket": config.storage.upload_bucket,
        "s3_key": key,
    });
    let state = runner.run(&trigger).await?;

    let output = if args.pretty {
        serde_json::to_string_pretty(&state)?
    } else {
        serde_json::to_string(&state)?
    };
    println!("{output}");
    Ok(())
}
