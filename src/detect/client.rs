//! HTTP client for the detection endpoint.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart;

use crate::camera::sampler::EncodedFrame;
use crate::detect::{DetectError, Detection, DetectionBatch, Detector};

/// Detection client configuration.
#[derive(Debug, Clone)]
pub struct DetectionClientConfig {
    /// Full URL of the detect endpoint.
    pub endpoint: String,
    pub connect_timeout: Duration,
    /// Whole-request timeout; inference on the server can be slow.
    pub request_timeout: Duration,
}

impl Default for DetectionClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:3000/api/detect".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Submits encoded frames to the detection service over HTTP.
pub struct DetectionClient {
    config: DetectionClientConfig,
    http: reqwest::Client,
}

impl DetectionClient {
    pub fn new(config: DetectionClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .context("build detection http client")?;
        Ok(Self { config, http })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

#[async_trait]
impl Detector for DetectionClient {
    async fn submit(&self, frame: &EncodedFrame) -> Result<DetectionBatch, DetectError> {
        let part = multipart::Part::bytes(frame.bytes.to_vec())
            .file_name("capture.jpg")
            .mime_str("image/jpeg")
            .map_err(|err| DetectError::Network(err.to_string()))?;
        let form = multipart::Form::new().part("image", part);

        let response = self
            .http
            .post(&self.config.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|err| DetectError::Network(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DetectError::Server {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| DetectError::Network(err.to_string()))?;
        parse_response(&body)
    }
}

/// Response body as the service sends it.
#[derive(serde::Deserialize)]
struct DetectResponse {
    detected_objects: Vec<Detection>,
    #[serde(default)]
    processed_image: Option<String>,
}

pub(crate) fn parse_response(body: &[u8]) -> Result<DetectionBatch, DetectError> {
    let wire: DetectResponse =
        serde_json::from_slice(body).map_err(|err| DetectError::Decode(err.to_string()))?;
    Ok(DetectionBatch {
        objects: wire.detected_objects,
        annotated_image: wire.processed_image,
    })
}
