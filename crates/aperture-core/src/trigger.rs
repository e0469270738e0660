//! Trigger payload parsing.
//!
//! Two payload shapes are seen in practice: a flat `{s3_bucket, s3_key}`
//! pair produced by the orchestrator, and the storage-notification shape
//! `{bucket: {name}, object: {key}}` (usually wrapped in a `Records`
//! array). Parsing attempts each shape in turn; only if none matches does
//! the run fail with a malformed-trigger error.
//!
//! The object key is percent-decoded here and nowhere else. Every
//! downstream consumer (derived thumbnail keys, the persisted `ImageKey`,
//! the status resolver) works with the decoded form.

use serde::Deserialize;
use serde_json::Value;

use crate::error::PipelineError;

/// A normalized trigger: container plus *decoded* object identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub bucket: String,
    pub key: String,
}

/// Flat shape: `{"s3_bucket": "...", "s3_key": "..."}`.
#[derive(Deserialize)]
struct FlatShape {
    s3_bucket: String,
    s3_key: String,
}

/// Notification shape: `{"bucket": {"name": "..."}, "object": {"key": "..."}}`.
#[derive(Deserialize)]
struct NestedShape {
    bucket: BucketRef,
    object: ObjectRef,
}

#[derive(Deserialize)]
struct BucketRef {
    name: String,
}

#[derive(Deserialize)]
struct ObjectRef {
    key: String,
}

/// Records envelope around the nested shape.
#[derive(Deserialize)]
struct RecordsShape {
    #[serde(rename = "Records")]
    records: Vec<RecordEntry>,
}

#[derive(Deserialize)]
struct RecordEntry {
    s3: NestedShape,
}

impl Trigger {
    /// Parse a raw trigger payload, attempting each accepted shape in turn.
    ///
    /// The object key in the result is percent-decoded (with `+` treated
    /// as space, matching the ingress encoding convention).
    pub fn parse(payload: &Value) -> Result<Self, PipelineError> {
        if let Ok(flat) = serde_json::from_value::<FlatShape>(payload.clone()) {
            return Self::normalized(flat.s3_bucket, flat.s3_key);
        }

        if let Ok(wrapped) = serde_json::from_value::<RecordsShape>(payload.clone()) {
            if let Some(entry) = wrapped.records.into_iter().next() {
                return Self::normalized(entry.s3.bucket.name, entry.s3.object.key);
            }
            return Err(PipelineError::MalformedTrigger {
                message: "Records array is empty".to_string(),
            });
        }

        if let Ok(nested) = serde_json::from_value::<NestedShape>(payload.clone()) {
            return Self::normalized(nested.bucket.name, nested.object.key);
        }

        Err(PipelineError::MalformedTrigger {
            message: "bucket name or object key not found in the payload".to_string(),
        })
    }

    fn normalized(bucket: String, key: String) -> Result<Self, PipelineError> {
        if bucket.is_empty() || key.is_empty() {
            return Err(PipelineError::MalformedTrigger {
                message: "bucket name or object key is empty".to_string(),
            });
        }
        Ok(Self {
            bucket,
            key: decode_object_key(&key)?,
        })
    }
}

/// Percent-decode an object key exactly once.
///
/// Keys arrive form-encoded from the ingress notification (`+` for space,
/// `%XX` escapes). Invalid escapes fail the trigger rather than producing
/// a key the rest of the pipeline cannot address.
pub fn decode_object_key(raw: &str) -> Result<String, PipelineError> {
    let plus_decoded = raw.replace('+', " ");
    urlencoding::decode(&plus_decoded)
        .map(|cow| cow.into_owned())
        .map_err(|e| PipelineError::MalformedTrigger {
            message: format!("object key is not valid percent-encoding: {e}"),
        })
}
