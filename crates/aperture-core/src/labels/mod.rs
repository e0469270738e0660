//! Label detection service client.
//!
//! Detection is optional and best-effort: the metadata stage only calls it
//! when the config switch is on, and a failed call is recorded on the
//! state as `extraction_error` rather than failing the stage.

mod http;

pub use http::HttpLabelDetector;

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::types::Label;

/// Trait implemented by label detection backends.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (the metadata stage holds an `Arc<dyn LabelDetector>`).
#[async_trait]
pub trait LabelDetector: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Detect up to `max_labels` labels with confidence ≥ `min_confidence`
    /// (0–100) for the image at the given source location.
    async fn detect_labels(
        &self,
        bucket: &str,
        key: &str,
        max_labels: u32,
        min_confidence: f64,
    ) -> Result<Vec<Label>, PipelineError>;
}
