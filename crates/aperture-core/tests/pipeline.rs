//! End-to-end pipeline tests against in-memory backends.
//!
//! These exercise the full write path (trigger → validate → thumbnails →
//! metadata → persist) and the read path (status resolver) together, the
//! way the orchestrator and API front door drive them in production.

use std::sync::Arc;

use async_trait::async_trait;
use image::{DynamicImage, GenericImageView, ImageFormat};
use serde_json::json;

use aperture_core::labels::LabelDetector;
use aperture_core::store::{KvStore, MemoryKvStore, MemoryObjectStore, ObjectStore, StoreValue};
use aperture_core::{
    Config, Label, PipelineError, PipelineRunner, StageStatus, StatusResolver,
};

fn encoded(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    image.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

struct Fixture {
    objects: Arc<MemoryObjectStore>,
    records: Arc<MemoryKvStore>,
    runner: PipelineRunner,
    resolver: StatusResolver,
}

fn fixture(detector: Option<Arc<dyn LabelDetector>>, config: Config) -> Fixture {
    let objects = Arc::new(MemoryObjectStore::new());
    let records = Arc::new(MemoryKvStore::new());
    let runner = PipelineRunner::new(
        &config,
        objects.clone() as Arc<dyn ObjectStore>,
        records.clone(),
        detector,
    );
    let resolver = StatusResolver::new(records.clone(), config.query.clone());
    Fixture {
        objects,
        records,
        runner,
        resolver,
    }
}

#[tokio::test]
async fn test_full_run_and_query_roundtrip() {
    let fx = fixture(None, Config::default());
    fx.objects
        .put(
            "b",
            "uploads/cat.jpg",
            encoded(&DynamicImage::new_rgb8(800, 600), ImageFormat::Jpeg),
            "image/jpeg",
        )
        .await
        .unwrap();

    let trigger = json!({"s3_bucket": "b", "s3_key": "uploads/cat.jpg"});
    let state = fx.runner.run(&trigger).await.unwrap();

    assert_eq!(state.validation_status, Some(StageStatus::Success));
    assert_eq!(state.thumbnail_status, Some(StageStatus::Success));
    assert_eq!(state.metadata_status, Some(StageStatus::Success));
    assert_eq!(
        state.thumbnails.keys().cloned().collect::<Vec<_>>(),
        vec!["128x128", "256x256"]
    );

    // Both thumbnails fit their boxes and keep the 4:3 ratio
    for (label, expected) in [("128x128", (128, 96)), ("256x256", (256, 192))] {
        let key = format!("thumbnails/cat_{label}.jpeg");
        let bytes = fx.objects.get("aperture-thumbnails", &key).await.unwrap();
        let thumb = image::load_from_memory(&bytes).unwrap();
        assert_eq!(thumb.dimensions(), expected);
    }

    // The read path returns what was persisted
    let response = fx.resolver.respond(Some("cat.jpg")).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["ImageKey"], "uploads/cat.jpg");
    assert_eq!(response.body["image_type"], ".jpg");
    assert_eq!(response.body["overall_processing_status"], "COMPLETED");
    assert_eq!(response.body["extracted_metadata"]["width_pixels"], 800);
    assert_eq!(response.body["extracted_metadata"]["height_pixels"], 600);
    assert_eq!(response.body["extracted_metadata"]["format"], "jpeg");
    assert_eq!(
        response.body["thumbnails"]["128x128"],
        "s3://aperture-thumbnails/thumbnails/cat_128x128.jpeg"
    );
}

#[tokio::test]
async fn test_query_for_unknown_image_is_404() {
    let fx = fixture(None, Config::default());
    let response = fx.resolver.respond(Some("missing.png")).await;
    assert_eq!(response.status, 404);
    assert!(response.body["message"]
        .as_str()
        .unwrap()
        .contains("not found"));
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let fx = fixture(None, Config::default());
    fx.objects
        .put(
            "b",
            "uploads/cat.jpg",
            encoded(&DynamicImage::new_rgb8(400, 300), ImageFormat::Jpeg),
            "image/jpeg",
        )
        .await
        .unwrap();

    let trigger = json!({"s3_bucket": "b", "s3_key": "uploads/cat.jpg"});
    let first = fx.runner.run(&trigger).await.unwrap();
    let second = fx.runner.run(&trigger).await.unwrap();

    assert_eq!(fx.records.len().await, 1);
    // created_at carries forward; updated_at tracks the latest run
    assert_eq!(second.created_at, first.created_at);
    assert!(second.updated_at >= first.updated_at);
}

#[tokio::test]
async fn test_percent_encoded_key_is_decoded_once_end_to_end() {
    let fx = fixture(None, Config::default());
    fx.objects
        .put(
            "b",
            "uploads/my cat.jpg",
            encoded(&DynamicImage::new_rgb8(100, 100), ImageFormat::Jpeg),
            "image/jpeg",
        )
        .await
        .unwrap();

    let trigger = json!({"s3_bucket": "b", "s3_key": "uploads/my%20cat.jpg"});
    let state = fx.runner.run(&trigger).await.unwrap();
    assert_eq!(state.key, "uploads/my cat.jpg");

    // Resolvable under the decoded identity
    let response = fx.resolver.respond(Some("my cat.jpg")).await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body["ImageKey"], "uploads/my cat.jpg");
}

#[tokio::test]
async fn test_unsupported_extension_stops_the_run() {
    let fx = fixture(None, Config::default());
    let trigger = json!({"s3_bucket": "b", "s3_key": "uploads/anim.gif"});
    let err = fx.runner.run(&trigger).await.unwrap_err();
    assert!(matches!(err, PipelineError::UnsupportedFormat { .. }));
    assert!(fx.records.is_empty().await);
}

struct NonFiniteDetector;

#[async_trait]
impl LabelDetector for NonFiniteDetector {
    fn name(&self) -> &str {
        "non-finite"
    }

    async fn detect_labels(
        &self,
        _bucket: &str,
        _key: &str,
        _max_labels: u32,
        _min_confidence: f64,
    ) -> Result<Vec<Label>, PipelineError> {
        Ok(vec![
            Label::new("Nature", 95.5),
            Label::new("Odd", f64::NAN),
            Label::new("Odder", f64::INFINITY),
        ])
    }
}

#[tokio::test]
async fn test_non_finite_confidence_survives_persist_and_query() {
    let mut config = Config::default();
    config.labels.enabled = true;
    let fx = fixture(Some(Arc::new(NonFiniteDetector)), config);
    fx.objects
        .put(
            "b",
            "uploads/odd.png",
            encoded(&DynamicImage::new_rgb8(64, 64), ImageFormat::Png),
            "image/png",
        )
        .await
        .unwrap();

    let trigger = json!({"s3_bucket": "b", "s3_key": "uploads/odd.png"});
    fx.runner.run(&trigger).await.unwrap();

    // Stored as sentinels, not floats
    let item = fx.records.get_item("uploads/odd.png").await.unwrap().unwrap();
    let StoreValue::Map(metadata) = &item["extracted_metadata"] else {
        panic!("expected metadata map");
    };
    let StoreValue::List(labels) = &metadata["labels"] else {
        panic!("expected labels list");
    };
    assert_eq!(labels.len(), 3);

    // And resolved back as the reserved strings
    let response = fx.resolver.respond(Some("odd.png")).await;
    assert_eq!(response.status, 200);
    let labels = response.body["extracted_metadata"]["labels"].as_array().unwrap();
    assert_eq!(labels[0]["confidence"], json!(95.5));
    assert_eq!(labels[1]["confidence"], json!("NaN"));
    assert_eq!(labels[2]["confidence"], json!("Infinity"));
}

#[tokio::test]
async fn test_transparent_png_source_keeps_png_thumbnails() {
    let fx = fixture(None, Config::default());
    fx.objects
        .put(
            "b",
            "uploads/ghost.png",
            encoded(&DynamicImage::new_rgba8(300, 300), ImageFormat::Png),
            "image/png",
        )
        .await
        .unwrap();

    let trigger = json!({"s3_bucket": "b", "s3_key": "uploads/ghost.png"});
    let state = fx.runner.run(&trigger).await.unwrap();

    // PNG is web-safe: format preserved, alpha intact
    assert_eq!(
        state.thumbnails["128x128"],
        "s3://aperture-thumbnails/thumbnails/ghost_128x128.png"
    );
    let bytes = fx
        .objects
        .get("aperture-thumbnails", "thumbnails/ghost_128x128.png")
        .await
        .unwrap();
    assert!(image::load_from_memory(&bytes).unwrap().color().has_alpha());
}

#[tokio::test]
async fn test_notification_shaped_trigger() {
    let fx = fixture(None, Config::default());
    fx.objects
        .put(
            "ingest",
            "uploads/dog.png",
            encoded(&DynamicImage::new_rgb8(50, 50), ImageFormat::Png),
            "image/png",
        )
        .await
        .unwrap();

    let trigger = json!({
        "Records": [{
            "s3": {
                "bucket": {"name": "ingest"},
                "object": {"key": "uploads/dog.png"}
            }
        }]
    });
    let state = fx.runner.run(&trigger).await.unwrap();
    assert_eq!(state.bucket, "ingest");
    assert_eq!(state.metadata.unwrap().filename, "dog.png");
}
