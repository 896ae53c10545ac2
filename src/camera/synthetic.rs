//! Synthetic camera source
//!
//! Generates moving-gradient frames for development without hardware.
//! The front and rear "cameras" are tinted differently so mode switches
//! are visible in the output.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::camera::{CameraMode, MediaError, MediaSource, RawFrame, StreamHandle};

/// Configuration for the synthetic source.
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            fps: 5,
        }
    }
}

/// Camera backend producing generated frames.
pub struct SyntheticSource {
    config: SyntheticConfig,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl MediaSource for SyntheticSource {
    async fn acquire(&self, mode: CameraMode) -> Result<StreamHandle, MediaError> {
        let config = self.config.clone();
        let (frame_tx, frame_rx) = watch::channel(Some(render_frame(&config, 0, mode)));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let period = Duration::from_millis((1000 / config.fps.max(1)).max(1) as u64);
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(period);
            let mut step: u64 = 0;
            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        step = step.wrapping_add(1);
                        if frame_tx.send(Some(render_frame(&config, step, mode))).is_err() {
                            break;
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!(%mode, "synthetic pump stopped");
                        break;
                    }
                }
            }
        });

        Ok(StreamHandle::new(mode, frame_rx, shutdown_tx))
    }
}

/// Render one gradient frame; `step` shifts the pattern, `mode` picks the tint.
fn render_frame(config: &SyntheticConfig, step: u64, mode: CameraMode) -> RawFrame {
    let (width, height) = (config.width, config.height);
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    let shift = (step % 256) as u8;
    for y in 0..height {
        for x in 0..width {
            let g = ((x + y) % 256) as u8;
            match mode {
                CameraMode::Front => data.extend_from_slice(&[g.wrapping_add(shift), g, 0x20]),
                CameraMode::Rear => data.extend_from_slice(&[0x20, g, g.wrapping_add(shift)]),
            }
        }
    }
    RawFrame {
        data: Bytes::from(data),
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_has_expected_dimensions() {
        let config = SyntheticConfig {
            width: 8,
            height: 4,
            fps: 5,
        };
        let frame = render_frame(&config, 0, CameraMode::Rear);
        assert_eq!((frame.width, frame.height), (8, 4));
        assert_eq!(frame.data.len(), 8 * 4 * 3);
    }

    #[test]
    fn frames_vary_by_step_and_mode() {
        let config = SyntheticConfig {
            width: 8,
            height: 4,
            fps: 5,
        };
        let a = render_frame(&config, 0, CameraMode::Rear);
        let b = render_frame(&config, 7, CameraMode::Rear);
        let c = render_frame(&config, 0, CameraMode::Front);
        assert_ne!(a.data, b.data);
        assert_ne!(a.data, c.data);
    }

    #[tokio::test]
    async fn acquire_publishes_an_initial_frame() {
        let source = SyntheticSource::new(SyntheticConfig {
            width: 8,
            height: 4,
            fps: 50,
        });
        let handle = source.acquire(CameraMode::Front).await.unwrap();
        assert!(handle.latest().is_some());
    }
}
