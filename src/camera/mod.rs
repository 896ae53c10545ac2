//! Camera source management
//!
//! Owns the live camera stream. A [`MediaSource`] backend opens a
//! [`StreamHandle`] for the requested facing mode; a background pump task
//! keeps the handle's latest-frame slot current; [`MediaSourceManager`]
//! enforces that at most one stream is ever live.

pub mod sampler;
pub mod snapshot;
#[cfg(feature = "test-source")]
pub mod synthetic;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, watch};

/// Which physical camera a stream request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraMode {
    Front,
    Rear,
}

impl CameraMode {
    /// The opposite facing mode.
    pub fn toggled(self) -> Self {
        match self {
            CameraMode::Front => CameraMode::Rear,
            CameraMode::Rear => CameraMode::Front,
        }
    }
}

impl fmt::Display for CameraMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CameraMode::Front => write!(f, "front"),
            CameraMode::Rear => write!(f, "rear"),
        }
    }
}

/// A decoded RGB frame published by a source pump.
///
/// `data` holds `width * height * 3` bytes of RGB8 pixels.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
}

/// Errors from acquiring a camera stream.
#[derive(Debug, Error)]
pub enum MediaError {
    /// The camera is unavailable or access was denied. Carries the
    /// underlying platform/transport message for display.
    #[error("camera access failed: {message}")]
    Access { message: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Shared latest-frame slot between a pump task and the sampler.
///
/// Holds `None` until the source has published its first frame.
pub type FrameSlot = watch::Receiver<Option<RawFrame>>;

/// Camera stream backend.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Open a stream for the given facing mode.
    ///
    /// Implementations should surface permission/availability problems here
    /// rather than from the running pump, so callers can report them at
    /// start time.
    async fn acquire(&self, mode: CameraMode) -> Result<StreamHandle, MediaError>;
}

/// Handle to a live camera stream.
///
/// Owns the pump task through its shutdown sender: dropping the handle (or
/// calling [`StreamHandle::stop`]) stops the pump.
pub struct StreamHandle {
    mode: CameraMode,
    frames: FrameSlot,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl StreamHandle {
    pub fn new(mode: CameraMode, frames: FrameSlot, shutdown_tx: mpsc::Sender<()>) -> Self {
        Self {
            mode,
            frames,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// The facing mode this stream was opened with.
    pub fn mode(&self) -> CameraMode {
        self.mode
    }

    /// Most recent frame published by the pump, if any yet.
    pub fn latest(&self) -> Option<RawFrame> {
        self.frames.borrow().clone()
    }

    /// Stop the pump. Idempotent.
    pub fn stop(&mut self) {
        self.shutdown_tx.take();
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Owns the single active stream for a session.
///
/// `acquire` releases any previously held stream first, so no two streams
/// are ever live at once no matter how callers sequence start/switch.
pub struct MediaSourceManager {
    source: Arc<dyn MediaSource>,
    active: Option<StreamHandle>,
}

impl MediaSourceManager {
    pub fn new(source: Arc<dyn MediaSource>) -> Self {
        Self {
            source,
            active: None,
        }
    }

    /// Open a stream for `mode`, releasing the current one first.
    pub async fn acquire(&mut self, mode: CameraMode) -> Result<&StreamHandle, MediaError> {
        self.release();
        let handle = self.source.acquire(mode).await?;
        Ok(self.active.insert(handle))
    }

    /// Stop and drop the active stream. Safe to call when none is held.
    pub fn release(&mut self) {
        if let Some(mut handle) = self.active.take() {
            handle.stop();
        }
    }

    /// The active stream, if one is held.
    pub fn active(&self) -> Option<&StreamHandle> {
        self.active.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        acquired: AtomicUsize,
        live: Arc<AtomicUsize>,
    }

    impl CountingSource {
        fn new() -> Self {
            Self {
                acquired: AtomicUsize::new(0),
                live: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl MediaSource for CountingSource {
        async fn acquire(&self, mode: CameraMode) -> Result<StreamHandle, MediaError> {
            self.acquired.fetch_add(1, Ordering::SeqCst);
            let (_frame_tx, frame_rx) = watch::channel(None);
            let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
            let live = self.live.clone();
            live.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let _ = shutdown_rx.recv().await;
                live.fetch_sub(1, Ordering::SeqCst);
            });
            Ok(StreamHandle::new(mode, frame_rx, shutdown_tx))
        }
    }

    #[tokio::test]
    async fn acquire_releases_previous_stream() {
        let source = Arc::new(CountingSource::new());
        let live = source.live.clone();
        let mut manager = MediaSourceManager::new(source.clone());

        manager.acquire(CameraMode::Rear).await.unwrap();
        manager.acquire(CameraMode::Front).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(source.acquired.load(Ordering::SeqCst), 2);
        assert_eq!(live.load(Ordering::SeqCst), 1);
        assert_eq!(manager.active().unwrap().mode(), CameraMode::Front);
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let source = Arc::new(CountingSource::new());
        let live = source.live.clone();
        let mut manager = MediaSourceManager::new(source);

        manager.release();
        manager.acquire(CameraMode::Rear).await.unwrap();
        manager.release();
        manager.release();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        assert_eq!(live.load(Ordering::SeqCst), 0);
        assert!(manager.active().is_none());
    }

    #[test]
    fn mode_toggles_both_ways() {
        assert_eq!(CameraMode::Front.toggled(), CameraMode::Rear);
        assert_eq!(CameraMode::Rear.toggled(), CameraMode::Front);
    }
}
