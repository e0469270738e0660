//! Error types for the Aperture ingestion pipeline.
//!
//! Errors are organized by layer: configuration problems, stage failures,
//! and store failures each get their own enum so callers can match on what
//! actually went wrong. Stage failures carry the object key or thumbnail
//! box they relate to.

use thiserror::Error;

/// Top-level error type for Aperture operations.
#[derive(Error, Debug)]
pub enum ApertureError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline stage errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline stage errors.
///
/// A stage that cannot satisfy its core contract returns one of these and
/// the orchestrator halts the run. Failures a stage can absorb (a label
/// detection call going sideways) are recorded as data on the state
/// instead and never surface here.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The trigger payload matched none of the accepted shapes
    #[error("Malformed trigger payload: {message}")]
    MalformedTrigger { message: String },

    /// The object's extension is not in the supported set
    #[error("Unsupported image type {extension}: supported types are {}", .supported.join(", "))]
    UnsupportedFormat {
        extension: String,
        supported: Vec<String>,
    },

    /// The source bytes could not be decoded as an image at all
    #[error("Cannot decode {key} as an image: {message}")]
    ImageDecodeFailed { key: String, message: String },

    /// Resizing or encoding a thumbnail box failed
    #[error("Thumbnail {label} failed for {key}: {message}")]
    ThumbnailEncodingFailed {
        key: String,
        label: String,
        message: String,
    },

    /// Reading the source object from the object store failed
    #[error("Object store read failed for {key}: {message}")]
    ObjectStoreReadFailed { key: String, message: String },

    /// Uploading a derived object to the object store failed
    #[error("Object store write failed for {key}: {message}")]
    ObjectStoreWriteFailed { key: String, message: String },

    /// The state reached the persister without a decoded object identifier
    #[error("Cannot persist a state with no object identifier")]
    MissingIdentity,

    /// Writing the accumulated record to the key-value store failed
    #[error("Persistence write failed for {key}: {message}")]
    PersistenceWriteFailed { key: String, message: String },

    /// The key-value store could not be reached (distinct from not-found)
    #[error("Record store unavailable: {message}")]
    StoreUnavailable { message: String },

    /// A label detection call failed; callers record this as data
    #[error("Label detection failed: {message}")]
    LabelDetection { message: String },
}

/// Convenience type alias for Aperture results.
pub type Result<T> = std::result::Result<T, ApertureError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
