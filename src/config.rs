//! Session configuration.

use std::time::Duration;

use crate::camera::CameraMode;
use crate::camera::sampler::DEFAULT_JPEG_QUALITY;

/// Tuning knobs for a capture session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Delay between automatic detect cycles.
    pub poll_interval: Duration,
    /// Wait after releasing a stream before reopening with the other mode.
    /// Zero disables the settle wait.
    pub switch_settle: Duration,
    /// JPEG quality for sampled stills (1-100).
    pub jpeg_quality: u8,
    /// Facing mode used by the first start().
    pub initial_mode: CameraMode,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            switch_settle: Duration::from_millis(300),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            initial_mode: CameraMode::Rear,
        }
    }
}
