//! Single-run pipeline sequencing.
//!
//! Wires the four write-path stages together for one trigger. This is a
//! convenience for local runs and tests: the production orchestrator
//! sequences stage invocations itself and owns retry, failure routing and
//! dead-lettering. The runner does none of that; the first stage error
//! stops the run and propagates.

use serde_json::Value;
use std::sync::Arc;

use crate::config::Config;
use crate::error::PipelineError;
use crate::labels::LabelDetector;
use crate::store::{KvStore, ObjectStore};
use crate::types::PipelineState;

use super::metadata::MetadataExtractor;
use super::persist::ResultPersister;
use super::thumbnail::ThumbnailDeriver;
use super::validate::Validator;

/// Runs a trigger through validate → thumbnails → metadata → persist.
pub struct PipelineRunner {
    validator: Validator,
    thumbnailer: ThumbnailDeriver,
    extractor: MetadataExtractor,
    persister: ResultPersister,
}

impl PipelineRunner {
    /// Wire up all stages against the given stores and optional detector.
    pub fn new(
        config: &Config,
        objects: Arc<dyn ObjectStore>,
        records: Arc<dyn KvStore>,
        detector: Option<Arc<dyn LabelDetector>>,
    ) -> Self {
        Self {
            validator: Validator::new(config.validation.clone()),
            thumbnailer: ThumbnailDeriver::new(Arc::clone(&objects), config.thumbnails.clone()),
            extractor: MetadataExtractor::new(objects, detector, config.labels.clone()),
            persister: ResultPersister::new(records),
        }
    }

    /// Process one trigger payload to a persisted record.
    pub async fn run(&self, payload: &Value) -> Result<PipelineState, PipelineError> {
        let start = std::time::Instant::now();

        let mut state = self.validator.validate(payload)?;
        tracing::debug!(key = %state.key, "validated");

        self.thumbnailer.run(&mut state).await?;
        tracing::debug!(key = %state.key, count = state.thumbnails.len(), "thumbnails derived");

        self.extractor.run(&mut state).await?;
        tracing::debug!(key = %state.key, "metadata extracted");

        self.persister.run(&mut state).await?;
        tracing::info!(key = %state.key, elapsed = ?start.elapsed(), "pipeline run complete");

        Ok(state)
    }
}
