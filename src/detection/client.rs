use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::types::{PredictEnvelope, PredictionResponse};
use super::upload::{UploadRejection, ValidatedUpload};
use super::DetectionError;

/// Multipart field the service reads the image from.
const IMAGE_FIELD: &str = "image";

/// Remote classification endpoint.
#[async_trait]
pub trait PredictionClient: Send + Sync {
    async fn predict(&self, upload: &ValidatedUpload) -> Result<PredictionResponse, DetectionError>;
}

/// Reply of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceHealth {
    pub status: String,
    #[serde(default)]
    pub model_loaded: bool,
}

/// HTTP client for the prediction service.
pub struct HttpPredictionClient {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpPredictionClient {
    /// Create a client for the service at `base_url`.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, DetectionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(DetectionError::connectivity)?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check the service is up. Any failure is a connectivity error.
    pub async fn health(&self) -> Result<ServiceHealth, DetectionError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(DetectionError::connectivity)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DetectionError::connectivity(format!(
                "health check returned status {status}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| DetectionError::ResponseParsing(e.to_string()))
    }
}

#[async_trait]
impl PredictionClient for HttpPredictionClient {
    async fn predict(&self, upload: &ValidatedUpload) -> Result<PredictionResponse, DetectionError> {
        let url = format!("{}/predict", self.base_url);

        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime)
            .map_err(|e| {
                tracing::warn!(mime = %upload.mime, error = %e, "Unusable MIME type");
                DetectionError::InputRejected(UploadRejection::NotAnImage {
                    mime: upload.mime.clone(),
                })
            })?;
        let form = Form::new().part(IMAGE_FIELD, part);

        let response = self
            .client
            .post(&url)
            .header("ngrok-skip-browser-warning", "true")
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    tracing::warn!(timeout_secs = self.timeout_secs, "Prediction request timed out");
                } else {
                    tracing::warn!(error = %e, "Prediction request failed");
                }
                DetectionError::connectivity(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Prediction service returned error status");
            return Err(DetectionError::connectivity(format!(
                "HTTP error! status: {}",
                status.as_u16()
            )));
        }

        let envelope: PredictEnvelope = response
            .json()
            .await
            .map_err(|e| DetectionError::ResponseParsing(e.to_string()))?;

        let prediction = envelope.into_response()?;
        tracing::info!(
            label = %prediction.label,
            confidence = prediction.confidence,
            "Prediction received"
        );
        Ok(prediction)
    }
}

/// Mock prediction client for testing: replays queued results in order.
pub struct MockPredictionClient {
    replies: Mutex<Vec<Result<PredictionResponse, String>>>,
    delay: Duration,
}

impl MockPredictionClient {
    pub fn new(response: PredictionResponse) -> Self {
        Self {
            replies: Mutex::new(vec![Ok(response)]),
            delay: Duration::ZERO,
        }
    }

    /// A client whose next call fails with a semantic error.
    pub fn failing(message: &str) -> Self {
        Self {
            replies: Mutex::new(vec![Err(message.to_string())]),
            delay: Duration::ZERO,
        }
    }

    /// Queue another reply after the existing ones.
    pub fn then(self, response: PredictionResponse) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push(Ok(response));
        }
        self
    }

    /// Delay every reply, to simulate a slow service.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl PredictionClient for MockPredictionClient {
    async fn predict(&self, _upload: &ValidatedUpload) -> Result<PredictionResponse, DetectionError> {
        let next = {
            let mut replies = self
                .replies
                .lock()
                .map_err(|_| DetectionError::connectivity("mock lock poisoned"))?;
            if replies.is_empty() {
                None
            } else {
                Some(replies.remove(0))
            }
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(DetectionError::PredictionFailed(message)),
            None => Err(DetectionError::connectivity("mock has no replies left")),
        }
    }
}
