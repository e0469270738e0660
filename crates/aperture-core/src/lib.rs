//! Aperture Core - image ingestion pipeline library.
//!
//! Aperture processes uploaded images through a sequence of independent
//! stages, each consuming and extending a shared state record:
//!
//! ```text
//! Trigger → Validate → Thumbnails → Metadata → Persist
//!                                                  ↑
//!                              Status query ───────┘ (read path)
//! ```
//!
//! The record store has no native floating-point type; every numeric leaf
//! of the accumulated state crosses the exact-decimal bridge in
//! [`store::normalize`] before persistence, with non-finite floats mapped
//! to reserved string sentinels.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use aperture_core::{Config, PipelineRunner};
//! use aperture_core::store::{MemoryKvStore, MemoryObjectStore};
//!
//! #[tokio::main]
//! async fn main() -> aperture_core::Result<()> {
//!     let config = Config::load()?;
//!     let objects = Arc::new(MemoryObjectStore::new());
//!     let records = Arc::new(MemoryKvStore::new());
//!
//!     let runner = PipelineRunner::new(&config, objects, records, None);
//!     let trigger = serde_json::json!({"s3_bucket": "b", "s3_key": "uploads/cat.jpg"});
//!     let state = runner.run(&trigger).await?;
//!     println!("thumbnails: {:?}", state.thumbnails);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod labels;
pub mod pipeline;
pub mod store;
pub mod trigger;
pub mod types;

// Re-exports for convenient access
pub use config::{BoxSize, Config};
pub use error::{ApertureError, ConfigError, PipelineError, PipelineResult, Result};
pub use pipeline::{
    MetadataExtractor, PipelineRunner, QueryResponse, ResultPersister, StatusResolver,
    ThumbnailDeriver, Validator,
};
pub use trigger::Trigger;
pub use types::{
    ExifData, ImageKind, ImageMetadata, Label, OverallStatus, PipelineState, StageStatus,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
