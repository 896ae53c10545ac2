//! Lookout - camera polling client for a remote object-detection service
//!
//! Lookout owns a camera stream, samples a JPEG still on a fixed interval,
//! posts it to a detection endpoint, and exposes the annotated results as
//! observable session state.
//!
//! # Architecture
//!
//! 1. **Camera Module** - acquires/releases streams per facing mode and
//!    keeps a latest-frame slot current
//! 2. **Detect Module** - submits stills to the detection service and
//!    parses its responses
//! 3. **Session Module** - the polling state machine tying them together
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lookout::{
//!     DetectionClient, DetectionClientConfig, SessionConfig, SessionController,
//!     SnapshotConfig, SnapshotSource,
//! };
//!
//! let source = Arc::new(SnapshotSource::new(SnapshotConfig::default())?);
//! let detector = Arc::new(DetectionClient::new(DetectionClientConfig::default())?);
//! let session = SessionController::new(source, detector, SessionConfig::default());
//!
//! session.start().await;
//! session.detect_now().await;
//! let status = session.status().await;
//! session.teardown().await;
//! ```

// Camera sources and sampling
pub mod camera;

// Session configuration
pub mod config;

// Detection service boundary
pub mod detect;

// Session state machine and polling scheduler
pub mod session;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// Camera
pub use camera::sampler::{capture, CaptureError, EncodedFrame, DEFAULT_JPEG_QUALITY};
pub use camera::snapshot::{SnapshotConfig, SnapshotSource};
pub use camera::{CameraMode, MediaError, MediaSource, MediaSourceManager, RawFrame, StreamHandle};
#[cfg(feature = "test-source")]
pub use camera::synthetic::{SyntheticConfig, SyntheticSource};

// Config
pub use config::SessionConfig;

// Detect
pub use detect::{
    DetectError, Detection, DetectionBatch, DetectionClient, DetectionClientConfig, Detector,
};

// Session
pub use session::{Phase, PollScheduler, SessionController, SessionStatus};
