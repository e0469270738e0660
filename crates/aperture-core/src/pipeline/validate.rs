//! Validation stage: the gate in front of the pipeline.
//!
//! Parses the raw trigger payload, decodes the object identifier, and
//! accepts or rejects on the file-extension allowlist. Acceptance produces
//! the initial [`PipelineState`]; rejection produces no state and the
//! orchestrator stops the run.

use serde_json::Value;

use crate::config::ValidationConfig;
use crate::error::PipelineError;
use crate::trigger::Trigger;
use crate::types::{ImageKind, PipelineState, StageStatus};

/// Validates trigger payloads before processing.
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with the given allowlist.
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a raw trigger payload.
    ///
    /// On acceptance, returns a state with `validation_status = SUCCESS`
    /// and the lower-cased extension recorded as the image kind.
    pub fn validate(&self, payload: &Value) -> Result<PipelineState, PipelineError> {
        let trigger = Trigger::parse(payload)?;
        tracing::debug!(bucket = %trigger.bucket, key = %trigger.key, "validating upload");

        let extension = extension_of(&trigger.key);
        let supported = self.is_supported(&extension);
        let kind = ImageKind::from_extension(&extension);

        match (supported, kind) {
            (true, Some(kind)) => {
                let mut state = PipelineState::new(trigger.bucket, trigger.key);
                state.image_type = Some(kind);
                state.validation_status = Some(StageStatus::Success);
                Ok(state)
            }
            _ => {
                tracing::warn!(key = %trigger.key, extension = %extension, "unsupported image type");
                Err(PipelineError::UnsupportedFormat {
                    extension,
                    supported: self.config.extensions.clone(),
                })
            }
        }
    }

    fn is_supported(&self, extension: &str) -> bool {
        !extension.is_empty()
            && self
                .config
                .extensions
                .iter()
                .any(|e| e.eq_ignore_ascii_case(extension))
    }
}

/// Extension of the key's final path segment, lower-cased, with leading
/// dot. Empty when the segment has no extension (a leading dot alone, as
/// in `.hidden`, does not count as one).
fn extension_of(key: &str) -> String {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => file_name[idx..].to_lowercase(),
        _ => String::new(),
    }
}
