/// HTTP content-analysis adapter
///
/// Posts the image (base64) to an external label-detection endpoint and reads
/// back `{ "labels": [{ "name", "confidence", "instanceCount" }] }`.
use crate::{
    analysis::{AnalysisUnavailable, ContentAnalyzer, RawLabel},
    error::{ModerationError, ModerationResult},
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectLabelsRequest<'a> {
    image: &'a str,
    min_confidence: f32,
}

#[derive(Debug, Deserialize)]
struct DetectLabelsResponse {
    labels: Vec<RawLabel>,
}

/// Content analyzer backed by a remote HTTP service
#[derive(Clone)]
pub struct HttpContentAnalyzer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    min_confidence: f32,
}

impl HttpContentAnalyzer {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
        min_confidence: f32,
    ) -> ModerationResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("photo-moderation/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ModerationError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
            min_confidence,
        })
    }
}

#[async_trait]
impl ContentAnalyzer for HttpContentAnalyzer {
    async fn detect_labels(&self, image: &[u8]) -> Result<Vec<RawLabel>, AnalysisUnavailable> {
        let encoded = STANDARD.encode(image);
        let mut request = self.client.post(&self.endpoint).json(&DetectLabelsRequest {
            image: &encoded,
            min_confidence: self.min_confidence,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AnalysisUnavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalysisUnavailable(format!(
                "analysis service returned {}",
                status
            )));
        }

        let body: DetectLabelsResponse = response
            .json()
            .await
            .map_err(|e| AnalysisUnavailable(format!("malformed response: {}", e)))?;

        tracing::debug!(labels = body.labels.len(), "content analysis complete");
        Ok(body.labels)
    }

    fn min_confidence(&self) -> f32 {
        self.min_confidence
    }
}
