//! Metadata extraction stage.
//!
//! Intrinsic attributes (dimensions, format, color mode, size, content
//! hash, EXIF) are the required result: failing to decode the image fails
//! the stage. Label detection is best-effort: when the service call goes
//! sideways the failure is recorded on the metadata as `extraction_error`
//! and the stage still succeeds.

use image::ColorType;
use std::sync::Arc;

use crate::config::LabelConfig;
use crate::error::PipelineError;
use crate::labels::LabelDetector;
use crate::store::ObjectStore;
use crate::types::{ImageMetadata, PipelineState, StageStatus};

use super::decode::{decode_image, format_to_string};
use super::exif;

/// Extracts metadata from the source image, optionally enriched with
/// detected labels.
pub struct MetadataExtractor {
    store: Arc<dyn ObjectStore>,
    detector: Option<Arc<dyn LabelDetector>>,
    config: LabelConfig,
}

impl MetadataExtractor {
    /// Create a new extractor. The detector is only consulted when label
    /// detection is enabled in the config.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        detector: Option<Arc<dyn LabelDetector>>,
        config: LabelConfig,
    ) -> Self {
        Self {
            store,
            detector,
            config,
        }
    }

    /// Extract metadata for the state's source object.
    pub async fn run(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        if state.key.is_empty() {
            return Err(PipelineError::MissingIdentity);
        }

        let bytes = self
            .store
            .get(&state.bucket, &state.key)
            .await
            .map_err(|e| PipelineError::ObjectStoreReadFailed {
                key: state.key.clone(),
                message: e.to_string(),
            })?;

        // Hash and EXIF read the raw bytes; decode consumes them
        let content_hash = blake3::hash(&bytes).to_hex().to_string();
        let exif = exif::extract(&bytes);
        let decoded = decode_image(bytes, &state.key).await?;

        let mut metadata = ImageMetadata {
            filename: state.file_name().to_string(),
            filesize_bytes: decoded.byte_len,
            format: format_to_string(decoded.format),
            width_pixels: decoded.width,
            height_pixels: decoded.height,
            mode: color_mode(decoded.image.color()),
            content_hash,
            exif,
            labels: None,
            extraction_error: None,
        };

        if self.config.enabled {
            match &self.detector {
                Some(detector) => {
                    match detector
                        .detect_labels(
                            &state.bucket,
                            &state.key,
                            self.config.max_labels,
                            self.config.min_confidence,
                        )
                        .await
                    {
                        Ok(labels) => {
                            tracing::debug!(
                                key = %state.key,
                                count = labels.len(),
                                backend = detector.name(),
                                "labels detected"
                            );
                            metadata.labels = Some(labels);
                        }
                        Err(e) => {
                            tracing::warn!(key = %state.key, error = %e, "label detection failed");
                            metadata.extraction_error = Some(e.to_string());
                        }
                    }
                }
                None => {
                    tracing::warn!("label detection enabled but no detector is wired up");
                    metadata.extraction_error =
                        Some("label detection enabled but no detector configured".to_string());
                }
            }
        }

        state.metadata = Some(metadata);
        state.metadata_status = Some(StageStatus::Success);
        Ok(())
    }
}

/// Color mode name for a decoded image.
fn color_mode(color: ColorType) -> String {
    match color {
        ColorType::L8 => "L".to_string(),
        ColorType::La8 => "LA".to_string(),
        ColorType::Rgb8 => "RGB".to_string(),
        ColorType::Rgba8 => "RGBA".to_string(),
        ColorType::L16 => "L16".to_string(),
        ColorType::La16 => "LA16".to_string(),
        ColorType::Rgb16 => "RGB16".to_string(),
        ColorType::Rgba16 => "RGBA16".to_string(),
        ColorType::Rgb32F => "RGB32F".to_string(),
        ColorType::Rgba32F => "RGBA32F".to_string(),
        _ => "UNKNOWN".to_string(),
    }
}
