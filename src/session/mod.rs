//! Session control
//!
//! The session controller is the only writer of observable session state.
//! It drives the camera manager and the polling scheduler, and applies
//! tick results under an epoch check so work from a cancelled session can
//! never resurface after stop or a mode switch.

pub mod scheduler;

pub use scheduler::PollScheduler;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::camera::{sampler, CameraMode, MediaSource, MediaSourceManager};
use crate::config::SessionConfig;
use crate::detect::{DetectionBatch, Detector};

/// Lifecycle phase of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Stopped,
    Starting,
    Streaming,
    Switching,
}

/// Observable snapshot of the session, for a UI layer.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub streaming: bool,
    pub processing: bool,
    pub camera_mode: CameraMode,
    pub last_error: Option<String>,
    pub last_batch: Option<DetectionBatch>,
    pub ticks_completed: u64,
    pub ticks_failed: u64,
}

struct SessionState {
    phase: Phase,
    camera_mode: CameraMode,
    processing: bool,
    last_error: Option<String>,
    last_batch: Option<DetectionBatch>,
    ticks_completed: u64,
    ticks_failed: u64,
}

struct SessionInner {
    config: SessionConfig,
    detector: Arc<dyn Detector>,
    media: Mutex<MediaSourceManager>,
    scheduler: Mutex<Option<PollScheduler>>,
    state: RwLock<SessionState>,
    /// Bumped on every start/stop/mode-switch; ticks tagged with an older
    /// value are discarded at application time.
    epoch: AtomicU64,
}

/// Drives the capture/detect polling loop and exposes user-facing actions.
///
/// Cheap to clone; all clones share one session.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<SessionInner>,
}

impl SessionController {
    pub fn new(
        source: Arc<dyn MediaSource>,
        detector: Arc<dyn Detector>,
        config: SessionConfig,
    ) -> Self {
        let initial_mode = config.initial_mode;
        Self {
            inner: Arc::new(SessionInner {
                config,
                detector,
                media: Mutex::new(MediaSourceManager::new(source)),
                scheduler: Mutex::new(None),
                state: RwLock::new(SessionState {
                    phase: Phase::Stopped,
                    camera_mode: initial_mode,
                    processing: false,
                    last_error: None,
                    last_batch: None,
                    ticks_completed: 0,
                    ticks_failed: 0,
                }),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Start the camera and arm the polling loop. No-op unless Stopped.
    pub async fn start(&self) {
        let mode = {
            let mut state = self.inner.state.write().await;
            if state.phase != Phase::Stopped {
                debug!(phase = ?state.phase, "start ignored");
                return;
            }
            state.phase = Phase::Starting;
            state.last_error = None;
            state.camera_mode
        };
        self.acquire_and_arm(mode).await;
    }

    /// Stop polling, release the camera, and reset observable results.
    /// Idempotent; also the teardown path on shutdown.
    pub async fn stop(&self) {
        {
            let state = self.inner.state.read().await;
            if state.phase == Phase::Stopped {
                debug!("stop ignored: already stopped");
                return;
            }
        }
        self.halt().await;

        let mut state = self.inner.state.write().await;
        state.phase = Phase::Stopped;
        state.processing = false;
        // Stopping is a deliberate reset: both results and errors clear.
        state.last_batch = None;
        state.last_error = None;
        info!("session stopped");
    }

    /// Identical to [`stop`](Self::stop); named for shutdown call sites.
    pub async fn teardown(&self) {
        self.stop().await;
    }

    /// Flip the facing mode. While streaming this restarts the camera with
    /// the new mode; while stopped it only changes which mode the next
    /// start uses. No-op mid-transition.
    pub async fn toggle_camera(&self) {
        let (was_streaming, new_mode) = {
            let mut state = self.inner.state.write().await;
            let was_streaming = match state.phase {
                Phase::Streaming => {
                    state.phase = Phase::Switching;
                    state.processing = false;
                    true
                }
                Phase::Stopped => false,
                _ => {
                    debug!(phase = ?state.phase, "toggle ignored");
                    return;
                }
            };
            state.camera_mode = state.camera_mode.toggled();
            (was_streaming, state.camera_mode)
        };

        if !was_streaming {
            info!(%new_mode, "camera mode set");
            return;
        }

        self.halt().await;
        // Some camera backends race on an immediate reopen after release;
        // give the device a moment to recycle the stream.
        if !self.inner.config.switch_settle.is_zero() {
            tokio::time::sleep(self.inner.config.switch_settle).await;
        }
        {
            let mut state = self.inner.state.write().await;
            state.phase = Phase::Starting;
        }
        self.acquire_and_arm(new_mode).await;
    }

    /// Request an immediate detect cycle through the same gate as the
    /// scheduled ticks. No-op unless Streaming.
    pub async fn detect_now(&self) {
        if self.inner.state.read().await.phase != Phase::Streaming {
            debug!("detect_now ignored: not streaming");
            return;
        }
        if let Some(scheduler) = self.inner.scheduler.lock().await.as_ref() {
            scheduler.trigger();
        }
    }

    /// Observable snapshot for a UI layer.
    pub async fn status(&self) -> SessionStatus {
        let state = self.inner.state.read().await;
        SessionStatus {
            streaming: state.phase == Phase::Streaming,
            processing: state.processing,
            camera_mode: state.camera_mode,
            last_error: state.last_error.clone(),
            last_batch: state.last_batch.clone(),
            ticks_completed: state.ticks_completed,
            ticks_failed: state.ticks_failed,
        }
    }

    /// Current lifecycle phase.
    pub async fn phase(&self) -> Phase {
        self.inner.state.read().await.phase
    }

    /// Acquire the camera for `mode` and, on success, arm the scheduler.
    /// Expects the phase to already be Starting.
    async fn acquire_and_arm(&self, mode: CameraMode) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);

        let acquired = {
            let mut media = self.inner.media.lock().await;
            media.acquire(mode).await.map(|_| ())
        };

        match acquired {
            Ok(()) => {
                {
                    let mut state = self.inner.state.write().await;
                    state.phase = Phase::Streaming;
                    state.last_error = None;
                }
                info!(%mode, "camera streaming");
                self.arm_scheduler().await;
            }
            Err(err) => {
                warn!(%mode, error = %err, "camera acquire failed");
                let mut state = self.inner.state.write().await;
                state.phase = Phase::Stopped;
                state.last_error = Some(err.to_string());
            }
        }
    }

    async fn arm_scheduler(&self) {
        let controller = self.clone();
        let scheduler = PollScheduler::arm(self.inner.config.poll_interval, move || {
            let controller = controller.clone();
            async move { controller.run_tick().await }
        });
        *self.inner.scheduler.lock().await = Some(scheduler);
    }

    /// Disarm the scheduler, release the stream, and invalidate any
    /// in-flight tick by bumping the epoch.
    async fn halt(&self) {
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(mut scheduler) = self.inner.scheduler.lock().await.take() {
            scheduler.disarm();
        }
        self.inner.media.lock().await.release();
    }

    /// One detect cycle: sample a still, submit it, apply the outcome.
    async fn run_tick(&self) {
        let epoch = self.inner.epoch.load(Ordering::SeqCst);

        {
            let mut state = self.inner.state.write().await;
            if state.phase != Phase::Streaming {
                return;
            }
            state.processing = true;
        }

        let captured = {
            let media = self.inner.media.lock().await;
            media
                .active()
                .map(|handle| sampler::capture(handle, self.inner.config.jpeg_quality))
        };
        let Some(captured) = captured else {
            // Stream released between scheduling and execution.
            let mut state = self.inner.state.write().await;
            state.processing = false;
            return;
        };

        let outcome = match captured {
            Ok(frame) => self
                .inner
                .detector
                .submit(&frame)
                .await
                .map_err(|err| err.to_string()),
            // A not-ready frame is a skip: surface it, keep polling.
            Err(err) => Err(err.to_string()),
        };

        self.apply_tick(epoch, outcome).await;
    }

    /// Fold a tick outcome into session state, unless the session moved on
    /// while the tick was in flight.
    async fn apply_tick(&self, epoch: u64, outcome: Result<DetectionBatch, String>) {
        if self.inner.epoch.load(Ordering::SeqCst) != epoch {
            debug!("discarding detect result from a previous session epoch");
            return;
        }
        let mut state = self.inner.state.write().await;
        if state.phase != Phase::Streaming {
            return;
        }
        state.processing = false;
        match outcome {
            Ok(batch) => {
                state.ticks_completed += 1;
                debug!(objects = batch.objects.len(), "detect cycle complete");
                state.last_error = None;
                state.last_batch = Some(batch);
            }
            Err(message) => {
                state.ticks_failed += 1;
                warn!(error = %message, "detect cycle failed");
                state.last_error = Some(message);
            }
        }
    }
}
