//! Persistence stage.
//!
//! Lowers the accumulated state into a [`Document`] tree, pushes it
//! through the numeric bridge (the record store has no float type), and
//! upserts the resulting item under the decoded object identifier.
//!
//! Re-running the pipeline for the same image is idempotent at the
//! storage layer: the upsert is last-write-wins under a stable key.
//! `created_at` is carried forward from any existing record; only
//! `updated_at` takes the current clock on a re-run.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use rust_decimal::prelude::ToPrimitive;

use crate::error::PipelineError;
use crate::store::{normalize, Document, KvStore, StoreItem, StoreValue, IMAGE_KEY};
use crate::types::{
    ExifData, ImageMetadata, OverallStatus, PipelineState, StageStatus,
};

/// Persists the fully accumulated state into the record store.
pub struct ResultPersister {
    kv: Arc<dyn KvStore>,
}

impl ResultPersister {
    /// Create a new persister writing to the given record store.
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Upsert the record for the state's image identity.
    pub async fn run(&self, state: &mut PipelineState) -> Result<(), PipelineError> {
        if state.key.is_empty() {
            return Err(PipelineError::MissingIdentity);
        }

        let now = unix_now();
        let created_at = match self.kv.get_item(&state.key).await {
            Ok(Some(existing)) => stored_created_at(&existing).unwrap_or(now),
            Ok(None) => now,
            Err(e) => {
                return Err(PipelineError::PersistenceWriteFailed {
                    key: state.key.clone(),
                    message: e.to_string(),
                })
            }
        };

        state.created_at = Some(created_at);
        state.updated_at = Some(now);
        state.overall_status = Some(OverallStatus::Completed);

        let item = build_item(state).map_err(|message| PipelineError::PersistenceWriteFailed {
            key: state.key.clone(),
            message,
        })?;

        self.kv
            .put_item(item)
            .await
            .map_err(|e| PipelineError::PersistenceWriteFailed {
                key: state.key.clone(),
                message: e.to_string(),
            })?;

        tracing::info!(key = %state.key, "record persisted");
        Ok(())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Read the `created_at` of an existing record, if it has one.
fn stored_created_at(item: &StoreItem) -> Option<u64> {
    match item.get("created_at") {
        Some(StoreValue::Number(d)) => d.to_u64(),
        _ => None,
    }
}

/// Lower the state to a [`Document`] and normalize every numeric leaf.
fn build_item(state: &PipelineState) -> Result<StoreItem, String> {
    let normalized = normalize(state_document(state)).map_err(|e| e.to_string())?;
    match normalized {
        StoreValue::Map(item) => Ok(item),
        _ => Err("state did not lower to a map".to_string()),
    }
}

fn state_document(state: &PipelineState) -> Document {
    let mut root = BTreeMap::new();
    root.insert(IMAGE_KEY.to_string(), Document::from(state.key.clone()));
    root.insert(
        "s3_bucket_original".to_string(),
        Document::from(state.bucket.clone()),
    );
    root.insert(
        "s3_key_original".to_string(),
        Document::from(state.key.clone()),
    );
    root.insert(
        "image_type".to_string(),
        match state.image_type {
            Some(kind) => Document::from(kind.extension()),
            None => Document::Null,
        },
    );
    root.insert(
        "validation_status".to_string(),
        status_document(state.validation_status),
    );
    root.insert(
        "thumbnails".to_string(),
        Document::Map(
            state
                .thumbnails
                .iter()
                .map(|(label, location)| (label.clone(), Document::from(location.clone())))
                .collect(),
        ),
    );
    root.insert(
        "thumbnail_generation_status".to_string(),
        status_document(state.thumbnail_status),
    );
    root.insert(
        "extracted_metadata".to_string(),
        match &state.metadata {
            Some(metadata) => metadata_document(metadata),
            None => Document::Map(BTreeMap::new()),
        },
    );
    root.insert(
        "metadata_extraction_status".to_string(),
        status_document(state.metadata_status),
    );
    root.insert(
        "overall_processing_status".to_string(),
        match state.overall_status {
            Some(OverallStatus::Completed) => Document::from("COMPLETED"),
            Some(OverallStatus::InProgress) => Document::from("IN_PROGRESS"),
            None => Document::Null,
        },
    );
    root.insert(
        "created_at".to_string(),
        Document::UInt(state.created_at.unwrap_or(0)),
    );
    root.insert(
        "updated_at".to_string(),
        Document::UInt(state.updated_at.unwrap_or(0)),
    );
    Document::Map(root)
}

fn status_document(status: Option<StageStatus>) -> Document {
    match status {
        Some(StageStatus::Success) => Document::from("SUCCESS"),
        Some(StageStatus::Failed) => Document::from("FAILED"),
        None => Document::Null,
    }
}

fn metadata_document(metadata: &ImageMetadata) -> Document {
    let mut map = BTreeMap::new();
    map.insert(
        "filename".to_string(),
        Document::from(metadata.filename.clone()),
    );
    map.insert(
        "filesize_bytes".to_string(),
        Document::from(metadata.filesize_bytes),
    );
    map.insert("format".to_string(), Document::from(metadata.format.clone()));
    map.insert(
        "width_pixels".to_string(),
        Document::from(metadata.width_pixels),
    );
    map.insert(
        "height_pixels".to_string(),
        Document::from(metadata.height_pixels),
    );
    map.insert("mode".to_string(), Document::from(metadata.mode.clone()));
    map.insert(
        "content_hash".to_string(),
        Document::from(metadata.content_hash.clone()),
    );
    if let Some(exif) = &metadata.exif {
        map.insert("exif".to_string(), exif_document(exif));
    }
    if let Some(labels) = &metadata.labels {
        map.insert(
            "labels".to_string(),
            Document::List(
                labels
                    .iter()
                    .map(|label| {
                        let mut entry = BTreeMap::new();
                        entry.insert("name".to_string(), Document::from(label.name.clone()));
                        entry.insert("confidence".to_string(), Document::from(label.confidence));
                        Document::Map(entry)
                    })
                    .collect(),
            ),
        );
    }
    if let Some(error) = &metadata.extraction_error {
        map.insert("extraction_error".to_string(), Document::from(error.clone()));
    }
    Document::Map(map)
}

fn exif_document(exif: &ExifData) -> Document {
    let mut map = BTreeMap::new();
    if let Some(v) = &exif.captured_at {
        map.insert("captured_at".to_string(), Document::from(v.clone()));
    }
    if let Some(v) = &exif.camera_make {
        map.insert("camera_make".to_string(), Document::from(v.clone()));
    }
    if let Some(v) = &exif.camera_model {
        map.insert("camera_model".to_string(), Document::from(v.clone()));
    }
    if let Some(v) = exif.gps_latitude {
        map.insert("gps_latitude".to_string(), Document::from(v));
    }
    if let Some(v) = exif.gps_longitude {
        map.insert("gps_longitude".to_string(), Document::from(v));
    }
    if let Some(v) = exif.orientation {
        map.insert("orientation".to_string(), Document::from(v));
    }
    Document::Map(map)
}
