//! Thumbnail derivation stage.
//!
//! Derives one re-encoded image per configured bounding box. The source is
//! fetched and decoded once per invocation; boxes then resize, encode and
//! upload independently behind a bounded worker pool. Failures are
//! aggregated: every box that succeeded stays recorded on the state, and
//! the stage reports success only when every configured box made it to the
//! object store.

use futures_util::stream::{self, StreamExt};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::sync::Arc;

use crate::config::{BoxSize, ThumbnailConfig};
use crate::error::PipelineError;
use crate::store::ObjectStore;
use crate::types::{PipelineState, StageStatus};

use super::decode::{content_type_for, decode_image, format_to_string};

/// Derives fit-within thumbnails for each configured target box.
pub struct ThumbnailDeriver {
    store: Arc<dyn ObjectStore>,
    config: ThumbnailConfig,
}

impl ThumbnailDeriver {
    /// Create a new deriver writing to the given object store.
    pub fn new(store: Arc<dyn ObjectStore>, config: ThumbnailConfig) -> Self {
        Self { store, config }
    }

    /// Derive and upload every configured thumbnail for the state's source
    /// object, recording each uploaded thumbnail under its size label.
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
        let decoded = decode_image(bytes, &state.key).await?;

        let out_format = normalize_format(decoded.format);
        if out_format != decoded.format {
            tracing::debug!(
                key = %state.key,
                native = %format_to_string(decoded.format),
                "native format is not web-safe, falling back to jpeg"
            );
        }

        let image = Arc::new(decoded.image);
        let base = base_name(state.file_name()).to_string();
        let source_key = state.key.clone();
        let bucket = self.config.bucket.clone();

        let outcomes: Vec<(BoxSize, Result<String, PipelineError>)> =
            stream::iter(self.config.sizes.iter().copied().map(|size| {
                let image = Arc::clone(&image);
                let store = Arc::clone(&self.store);
                let base = base.clone();
                let source_key = source_key.clone();
                let bucket = bucket.clone();
                async move {
                    let result =
                        derive_box(store.as_ref(), &image, size, out_format, &bucket, &base, &source_key)
                            .await;
                    (size, result)
                }
            }))
            .buffer_unordered(self.config.workers)
            .collect()
            .await;

        let mut failures = Vec::new();
        for (size, outcome) in outcomes {
            match outcome {
                Ok(location) => {
                    tracing::debug!(label = %size.label(), location = %location, "thumbnail uploaded");
                    state.thumbnails.insert(size.label(), location);
                }
                Err(e) => {
                    tracing::error!(label = %size.label(), error = %e, "thumbnail derivation failed");
                    failures.push(e);
                }
            }
        }

        if let Some(first) = failures.into_iter().next() {
            state.thumbnail_status = Some(StageStatus::Failed);
            return Err(first);
        }

        state.thumbnail_status = Some(StageStatus::Success);
        Ok(())
    }
}

/// Resize, encode and upload a single box; returns the stored location.
async fn derive_box(
    store: &dyn ObjectStore,
    image: &Arc<DynamicImage>,
    size: BoxSize,
    format: ImageFormat,
    bucket: &str,
    base: &str,
    source_key: &str,
) -> Result<String, PipelineError> {
    let render_image = Arc::clone(image);
    let join =
        tokio::task::spawn_blocking(move || render_box(&render_image, size, format)).await;

    let encoded = match join {
        Ok(Ok(bytes)) => bytes,
        Ok(Err(message)) => {
            return Err(PipelineError::ThumbnailEncodingFailed {
                key: source_key.to_string(),
                label: size.label(),
                message,
            })
        }
        Err(e) => {
            return Err(PipelineError::ThumbnailEncodingFailed {
                key: source_key.to_string(),
                label: size.label(),
                message: format!("render task failed: {e}"),
            })
        }
    };

    let thumb_key = format!(
        "thumbnails/{base}_{label}.{ext}",
        label = size.label(),
        ext = format_to_string(format)
    );
    store
        .put(bucket, &thumb_key, encoded, content_type_for(format))
        .await
        .map_err(|e| PipelineError::ObjectStoreWriteFailed {
            key: thumb_key.clone(),
            message: e.to_string(),
        })?;

    Ok(format!("s3://{bucket}/{thumb_key}"))
}

/// Resize to fit within the box and encode. Runs on a blocking thread.
///
/// When the output encoding has no transparency and the pixels carry an
/// alpha channel, the channel is dropped outright, with no matting against
/// a background color. Translucent pixels change appearance; this is a
/// documented simplification.
fn render_box(
    image: &DynamicImage,
    size: BoxSize,
    format: ImageFormat,
) -> Result<Vec<u8>, String> {
    let mut resized = image.thumbnail(size.width, size.height);

    if format == ImageFormat::Jpeg && resized.color().has_alpha() {
        resized = DynamicImage::ImageRgb8(resized.to_rgb8());
    }

    let mut buffer = Cursor::new(Vec::new());
    resized
        .write_to(&mut buffer, format)
        .map_err(|e| e.to_string())?;
    Ok(buffer.into_inner())
}

/// Keep JPEG and PNG as-is; everything else falls back to JPEG so an
/// un-normalized format never reaches the object store.
fn normalize_format(format: ImageFormat) -> ImageFormat {
    match format {
        ImageFormat::Jpeg | ImageFormat::Png => format,
        _ => ImageFormat::Jpeg,
    }
}

/// Final path segment with its extension stripped.
fn base_name(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => &file_name[..idx],
        _ => file_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryObjectStore, StorageError, StorageResult};
    use crate::types::ImageKind;
    use async_trait::async_trait;
    use image::GenericImageView;

    fn encoded(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, format).unwrap();
        buffer.into_inner()
    }

    fn validated_state(key: &str) -> PipelineState {
        let mut state = PipelineState::new("ingest", key);
        state.image_type = ImageKind::from_extension(".png");
        state.validation_status = Some(StageStatus::Success);
        state
    }

    fn config() -> ThumbnailConfig {
        ThumbnailConfig::default()
    }

    #[test]
    fn test_render_box_fits_within_and_preserves_ratio() {
        let img = DynamicImage::new_rgb8(800, 600);
        let bytes = render_box(&img, BoxSize::new(128, 128), ImageFormat::Png).unwrap();
        let thumb = image::load_from_memory(&bytes).unwrap();
        assert_eq!(thumb.dimensions(), (128, 96));
    }

    #[test]
    fn test_render_box_scales_up_to_fit() {
        let img = DynamicImage::new_rgb8(64, 48);
        let bytes = render_box(&img, BoxSize::new(128, 128), ImageFormat::Png).unwrap();
        let thumb = image::load_from_memory(&bytes).unwrap();
        assert_eq!(thumb.dimensions(), (128, 96));
    }

    #[test]
    fn test_render_box_flattens_alpha_for_jpeg() {
        let img = DynamicImage::new_rgba8(50, 40);
        let bytes = render_box(&img, BoxSize::new(32, 32), ImageFormat::Jpeg).unwrap();
        let thumb = image::load_from_memory(&bytes).unwrap();
        assert!(!thumb.color().has_alpha());
    }

    #[test]
    fn test_render_box_keeps_alpha_for_png() {
        let img = DynamicImage::new_rgba8(50, 40);
        let bytes = render_box(&img, BoxSize::new(32, 32), ImageFormat::Png).unwrap();
        let thumb = image::load_from_memory(&bytes).unwrap();
        assert!(thumb.color().has_alpha());
    }

    #[test]
    fn test_normalize_format() {
        assert_eq!(normalize_format(ImageFormat::Png), ImageFormat::Png);
        assert_eq!(normalize_format(ImageFormat::Jpeg), ImageFormat::Jpeg);
        assert_eq!(normalize_format(ImageFormat::Gif), ImageFormat::Jpeg);
        assert_eq!(normalize_format(ImageFormat::Bmp), ImageFormat::Jpeg);
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("cat.jpg"), "cat");
        assert_eq!(base_name("archive.tar.gz"), "archive.tar");
        assert_eq!(base_name("noext"), "noext");
        assert_eq!(base_name(".hidden"), ".hidden");
    }

    #[tokio::test]
    async fn test_run_derives_every_configured_box() {
        let store = Arc::new(MemoryObjectStore::new());
        store
            .put(
                "ingest",
                "uploads/cat.png",
                encoded(&DynamicImage::new_rgb8(800, 600), ImageFormat::Png),
                "image/png",
            )
            .await
            .unwrap();

        let deriver = ThumbnailDeriver::new(store.clone(), config());
        let mut state = validated_state("uploads/cat.png");
        deriver.run(&mut state).await.unwrap();

        assert_eq!(state.thumbnail_status, Some(StageStatus::Success));
        assert_eq!(
            state.thumbnails.keys().cloned().collect::<Vec<_>>(),
            vec!["128x128", "256x256"]
        );
        assert_eq!(
            state.thumbnails["128x128"],
            "s3://aperture-thumbnails/thumbnails/cat_128x128.png"
        );

        // Each stored thumbnail fits its box and keeps the 4:3 ratio
        for (label, max) in [("128x128", (128, 96)), ("256x256", (256, 192))] {
            let key = format!("thumbnails/cat_{label}.png");
            let bytes = store.get("aperture-thumbnails", &key).await.unwrap();
            let thumb = image::load_from_memory(&bytes).unwrap();
            assert_eq!(thumb.dimensions(), max);
        }
        assert_eq!(
            store
                .content_type("aperture-thumbnails", "thumbnails/cat_128x128.png")
                .await
                .as_deref(),
            Some("image/png")
        );
    }

    #[tokio::test]
    async fn test_run_normalizes_non_web_safe_source() {
        let store = Arc::new(MemoryObjectStore::new());
        store
            .put(
                "ingest",
                "uploads/scan.png",
                encoded(&DynamicImage::new_rgb8(100, 100), ImageFormat::Bmp),
                "image/bmp",
            )
            .await
            .unwrap();

        let deriver = ThumbnailDeriver::new(store.clone(), config());
        let mut state = validated_state("uploads/scan.png");
        deriver.run(&mut state).await.unwrap();

        // BMP source falls back to JPEG output
        assert_eq!(
            state.thumbnails["128x128"],
            "s3://aperture-thumbnails/thumbnails/scan_128x128.jpeg"
        );
        let bytes = store
            .get("aperture-thumbnails", "thumbnails/scan_128x128.jpeg")
            .await
            .unwrap();
        let thumb = image::load_from_memory_with_format(&bytes, ImageFormat::Jpeg);
        assert!(thumb.is_ok());
    }

    #[tokio::test]
    async fn test_run_fails_on_missing_source() {
        let store = Arc::new(MemoryObjectStore::new());
        let deriver = ThumbnailDeriver::new(store, config());
        let mut state = validated_state("uploads/nope.png");
        let err = deriver.run(&mut state).await.unwrap_err();
        assert!(matches!(err, PipelineError::ObjectStoreReadFailed { .. }));
        assert!(state.thumbnails.is_empty());
    }

    /// Object store whose writes fail for keys containing a marker.
    struct FlakyStore {
        inner: MemoryObjectStore,
        fail_marker: String,
    }

    #[async_trait]
    impl crate::store::ObjectStore for FlakyStore {
        async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
            self.inner.get(bucket, key).await
        }

        async fn put(
            &self,
            bucket: &str,
            key: &str,
            bytes: Vec<u8>,
            content_type: &str,
        ) -> StorageResult<()> {
            if key.contains(&self.fail_marker) {
                return Err(StorageError::WriteFailed {
                    key: format!("{bucket}/{key}"),
                    message: "simulated outage".to_string(),
                });
            }
            self.inner.put(bucket, key, bytes, content_type).await
        }
    }

    #[tokio::test]
    async fn test_run_partial_failure_keeps_successes_and_fails_stage() {
        let inner = MemoryObjectStore::new();
        inner
            .put(
                "ingest",
                "uploads/cat.png",
                encoded(&DynamicImage::new_rgb8(800, 600), ImageFormat::Png),
                "image/png",
            )
            .await
            .unwrap();
        let store = Arc::new(FlakyStore {
            inner,
            fail_marker: "256x256".to_string(),
        });

        let deriver = ThumbnailDeriver::new(store, config());
        let mut state = validated_state("uploads/cat.png");
        let err = deriver.run(&mut state).await.unwrap_err();

        assert!(matches!(err, PipelineError::ObjectStoreWriteFailed { .. }));
        assert_eq!(state.thumbnail_status, Some(StageStatus::Failed));
        // The box that made it stays recorded; the failed one never appears
        assert!(state.thumbnails.contains_key("128x128"));
        assert!(!state.thumbnails.contains_key("256x256"));
    }
}
