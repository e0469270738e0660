//! Sub-configuration structs with defaults.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// A thumbnail bounding box, written as `"{width}x{height}"` in config and
/// used verbatim as the size label in pipeline output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxSize {
    pub width: u32,
    pub height: u32,
}

impl BoxSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The size label, e.g. `"128x128"`.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for BoxSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for BoxSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once('x')
            .ok_or_else(|| format!("invalid size '{s}': expected WIDTHxHEIGHT"))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid width in '{s}'"))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|_| format!("invalid height in '{s}'"))?;
        Ok(Self { width, height })
    }
}

impl Serialize for BoxSize {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for BoxSize {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Local storage backend settings, used when the CLI wires up the
/// filesystem-backed object and record stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for the local object store and record file
    pub data_dir: PathBuf,

    /// Container name the CLI ingests uploads into
    pub upload_bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("~/.aperture/data"),
            upload_bucket: "aperture-uploads".to_string(),
        }
    }
}

/// Validation stage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Accepted file extensions, with leading dot
    pub extensions: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            extensions: vec![".jpg".to_string(), ".jpeg".to_string(), ".png".to_string()],
        }
    }
}

/// Thumbnail derivation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailConfig {
    /// Container derived thumbnails are uploaded to
    pub bucket: String,

    /// Target bounding boxes; one thumbnail is derived per box
    pub sizes: Vec<BoxSize>,

    /// Max boxes resized and uploaded concurrently
    pub workers: usize,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            bucket: "aperture-thumbnails".to_string(),
            sizes: vec![BoxSize::new(128, 128), BoxSize::new(256, 256)],
            workers: 4,
        }
    }
}

/// Label detection settings.
///
/// Detection is a process-wide switch, not a per-call parameter: when
/// disabled the metadata stage never contacts the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Whether to call the label detection service at all
    pub enabled: bool,

    /// Label service endpoint
    pub endpoint: String,

    /// Max labels to retain per image
    pub max_labels: u32,

    /// Minimum confidence (0–100) for a label to be retained
    pub min_confidence: f64,

    /// Per-call timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "http://localhost:9021".to_string(),
            max_labels: 10,
            min_confidence: 75.0,
            timeout_ms: 10_000,
        }
    }
}

/// Status query settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Ingestion sub-path prepended to client-facing identifiers before
    /// lookup; stored keys include it, query identifiers omit it
    pub key_prefix: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            key_prefix: "uploads".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
