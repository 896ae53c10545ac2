//! Detection service boundary
//!
//! Wire types for the remote object-detection endpoint, the [`Detector`]
//! trait the session polls through, and the HTTP client implementation.
//!
//! The endpoint accepts a multipart POST (field `image`, JPEG bytes) and
//! answers JSON:
//!
//! ```json
//! {
//!   "detected_objects": [
//!     { "class": "person", "confidence": 0.93, "bbox": [10, 20, 100, 200] }
//!   ],
//!   "processed_image": "data:image/jpeg;base64,..."
//! }
//! ```

pub mod client;

pub use client::{DetectionClient, DetectionClientConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::camera::sampler::EncodedFrame;

/// One detected object, in pixel coordinates of the submitted frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class: String,
    /// Model confidence in `[0, 1]`.
    pub confidence: f32,
    /// `(x1, y1, x2, y2)` corners of the bounding box.
    pub bbox: [i32; 4],
}

/// Full result of one detect cycle.
///
/// Replaces the previous batch wholesale on each successful cycle; batches
/// are never merged across cycles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionBatch {
    pub objects: Vec<Detection>,
    /// Server-rendered annotated preview (data URI or URL), when provided.
    pub annotated_image: Option<String>,
}

/// Errors from one detect submission.
#[derive(Debug, Error)]
pub enum DetectError {
    /// Transport failure before a response was received.
    #[error("detection request failed: {0}")]
    Network(String),
    /// The endpoint answered with a non-success status.
    #[error("detection service returned HTTP {status}")]
    Server { status: u16 },
    /// The response body did not parse into the expected shape.
    #[error("malformed detection response: {0}")]
    Decode(String),
}

/// Boundary to the remote detection service.
///
/// No retries happen behind this trait; the session's next scheduled tick
/// is the retry policy.
#[async_trait]
pub trait Detector: Send + Sync {
    async fn submit(&self, frame: &EncodedFrame) -> Result<DetectionBatch, DetectError>;
}
