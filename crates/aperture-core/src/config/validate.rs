//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.validation.extensions.is_empty() {
            return Err(ConfigError::ValidationError(
                "validation.extensions must not be empty".into(),
            ));
        }
        for ext in &self.validation.extensions {
            if !ext.starts_with('.') || ext.len() < 2 {
                return Err(ConfigError::ValidationError(format!(
                    "validation.extensions entry '{ext}' must start with a dot"
                )));
            }
        }
        if self.thumbnails.bucket.is_empty() {
            return Err(ConfigError::ValidationError(
                "thumbnails.bucket must not be empty".into(),
            ));
        }
        if self.thumbnails.sizes.is_empty() {
            return Err(ConfigError::ValidationError(
                "thumbnails.sizes must contain at least one size".into(),
            ));
        }
        for size in &self.thumbnails.sizes {
            if size.width == 0 || size.height == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "thumbnails.sizes entry '{size}' must have nonzero dimensions"
                )));
            }
        }
        if self.thumbnails.workers == 0 {
            return Err(ConfigError::ValidationError(
                "thumbnails.workers must be > 0".into(),
            ));
        }
        if self.labels.enabled && self.labels.endpoint.is_empty() {
            return Err(ConfigError::ValidationError(
                "labels.endpoint must be set when labels.enabled is true".into(),
            ));
        }
        if self.labels.max_labels == 0 {
            return Err(ConfigError::ValidationError(
                "labels.max_labels must be > 0".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.labels.min_confidence) {
            return Err(ConfigError::ValidationError(
                "labels.min_confidence must be between 0 and 100".into(),
            ));
        }
        if self.labels.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "labels.timeout_ms must be > 0".into(),
            ));
        }
        if self.query.key_prefix.is_empty() {
            return Err(ConfigError::ValidationError(
                "query.key_prefix must not be empty".into(),
            ));
        }
        Ok(())
    }
}
