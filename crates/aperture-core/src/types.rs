//! Core data types for the Aperture ingestion pipeline.
//!
//! A [`PipelineState`] is created by the validation stage and threaded
//! through every subsequent stage; each stage adds only its own fields.
//! The struct is explicit about what is optional: downstream stages check
//! the fields they need at entry instead of discovering missing keys deep
//! in their logic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Supported image kinds, keyed by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageKind {
    #[serde(rename = ".jpg")]
    Jpg,
    #[serde(rename = ".jpeg")]
    Jpeg,
    #[serde(rename = ".png")]
    Png,
}

impl ImageKind {
    /// The lower-cased extension, with leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageKind::Jpg => ".jpg",
            ImageKind::Jpeg => ".jpeg",
            ImageKind::Png => ".png",
        }
    }

    /// Parse an extension (with leading dot, any case) into a kind.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            ".jpg" => Some(ImageKind::Jpg),
            ".jpeg" => Some(ImageKind::Jpeg),
            ".png" => Some(ImageKind::Png),
            _ => None,
        }
    }
}

/// Per-stage outcome flag. Terminal once set by the owning stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    Success,
    Failed,
}

/// Overall run status. Set to `Completed` only by the persister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    InProgress,
    Completed,
}

/// The accumulating record threaded through every stage.
///
/// `key` is stored percent-decoded; decoding happens exactly once, in the
/// trigger parser. Every stage (and the persisted `ImageKey`) uses this
/// decoded form, so stage outputs stay addressable by one stable identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// Container holding the original upload
    #[serde(rename = "s3_bucket")]
    pub bucket: String,

    /// Decoded object identifier of the original upload
    #[serde(rename = "s3_key")]
    pub key: String,

    /// Detected image kind; set by the validator, immutable after
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_type: Option<ImageKind>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_status: Option<StageStatus>,

    /// Size label ("128x128") to derived-object location. Only thumbnails
    /// that were actually uploaded ever appear here.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub thumbnails: BTreeMap<String, String>,

    #[serde(
        rename = "thumbnail_generation_status",
        skip_serializing_if = "Option::is_none"
    )]
    pub thumbnail_status: Option<StageStatus>,

    #[serde(rename = "extracted_metadata", skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ImageMetadata>,

    #[serde(
        rename = "metadata_extraction_status",
        skip_serializing_if = "Option::is_none"
    )]
    pub metadata_status: Option<StageStatus>,

    #[serde(
        rename = "overall_processing_status",
        skip_serializing_if = "Option::is_none"
    )]
    pub overall_status: Option<OverallStatus>,

    /// Unix-epoch seconds of first persistence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<u64>,

    /// Unix-epoch seconds of the most recent persistence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<u64>,
}

impl PipelineState {
    /// Create a fresh state for a validated source location.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            image_type: None,
            validation_status: None,
            thumbnails: BTreeMap::new(),
            thumbnail_status: None,
            metadata: None,
            metadata_status: None,
            overall_status: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Final path segment of the decoded object key.
    pub fn file_name(&self) -> &str {
        self.key.rsplit('/').next().unwrap_or(&self.key)
    }
}

/// Intrinsic and derived attributes extracted from the source image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Final path segment of the object key
    pub filename: String,

    /// Source object length in bytes
    pub filesize_bytes: u64,

    /// Detected encoding ("jpeg", "png", ...)
    pub format: String,

    pub width_pixels: u32,
    pub height_pixels: u32,

    /// Color mode ("RGB", "RGBA", "L", ...)
    pub mode: String,

    /// BLAKE3 hash of the source bytes, for exact de-duplication
    pub content_hash: String,

    /// EXIF subset, when the image carries any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exif: Option<ExifData>,

    /// Detected labels, when the label service is enabled and responded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<Label>>,

    /// Recorded label-service failure; intrinsic extraction still counts
    /// as success when this is set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_error: Option<String>,
}

/// A detected label with its confidence score (0–100).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub confidence: f64,
}

impl Label {
    pub fn new(name: impl Into<String>, confidence: f64) -> Self {
        Self {
            name: name.into(),
            confidence,
        }
    }
}

/// EXIF metadata subset extracted best-effort from the source image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExifData {
    /// When the photo was captured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captured_at: Option<String>,

    /// Camera manufacturer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_make: Option<String>,

    /// Camera model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_model: Option<String>,

    /// GPS latitude (decimal degrees)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_latitude: Option<f64>,

    /// GPS longitude (decimal degrees)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps_longitude: Option<f64>,

    /// Image orientation (1-8 per EXIF spec)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orientation: Option<u32>,
}

impl ExifData {
    /// True when no field carries a value.
    pub fn is_empty(&self) -> bool {
        self.captured_at.is_none()
            && self.camera_make.is_none()
            && self.camera_model.is_none()
            && self.gps_latitude.is_none()
            && self.gps_longitude.is_none()
            && self.orientation.is_none()
    }
}
