//! HTTP label detection backend.
//!
//! Talks to a label service over its JSON API: the service reads the image
//! from the shared object store itself, so the request carries the source
//! location rather than the image bytes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::LabelDetector;
use crate::error::PipelineError;
use crate::types::Label;

/// Label detector backed by an HTTP service.
pub struct HttpLabelDetector {
    endpoint: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpLabelDetector {
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

/// `/v1/detect` request body.
#[derive(Serialize)]
struct DetectRequest<'a> {
    bucket: &'a str,
    object: &'a str,
    max_labels: u32,
    min_confidence: f64,
}

/// `/v1/detect` response body.
#[derive(Deserialize)]
struct DetectResponse {
    labels: Vec<DetectedLabel>,
}

#[derive(Deserialize)]
struct DetectedLabel {
    name: String,
    confidence: f64,
}

#[async_trait]
impl LabelDetector for HttpLabelDetector {
    fn name(&self) -> &str {
        "http"
    }

    async fn detect_labels(
        &self,
        bucket: &str,
        key: &str,
        max_labels: u32,
        min_confidence: f64,
    ) -> Result<Vec<Label>, PipelineError> {
        let url = format!("{}/v1/detect", self.endpoint);
        let body = DetectRequest {
            bucket,
            object: key,
            max_labels,
            min_confidence,
        };

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| PipelineError::LabelDetection {
                message: format!("label service request failed: {e}"),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::LabelDetection {
                message: format!("label service HTTP {status}: {text}"),
            });
        }

        let detected: DetectResponse =
            resp.json().await.map_err(|e| PipelineError::LabelDetection {
                message: format!("failed to parse label service response: {e}"),
            })?;

        Ok(detected
            .labels
            .into_iter()
            .map(|l| Label::new(l.name, l.confidence))
            .collect())
    }
}
