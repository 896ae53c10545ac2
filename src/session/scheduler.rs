//! Detect-cycle scheduling
//!
//! Runs the tick function on a fixed interval, with a manual-trigger path
//! sharing the same mutual-exclusion gate. The tick future is awaited
//! inline by the scheduler task, so two cycles can never overlap: interval
//! ticks that elapse while a cycle runs are skipped, and manual triggers
//! that land mid-cycle are drained and dropped.

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Handle to a running poll loop.
///
/// Dropping the handle (or calling [`PollScheduler::disarm`]) cancels the
/// timer; an in-flight cycle finishes but nothing further is scheduled.
pub struct PollScheduler {
    trigger_tx: mpsc::Sender<()>,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

impl PollScheduler {
    /// Start a recurring timer that runs `tick` every `interval`.
    ///
    /// The first cycle fires one full interval after arming.
    pub fn arm<F, Fut>(interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (trigger_tx, mut trigger_rx) = mpsc::channel::<()>(1);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The interval's first tick completes immediately; consume it
            // so cycles start one interval after arming.
            timer.tick().await;
            loop {
                tokio::select! {
                    _ = timer.tick() => {}
                    Some(()) = trigger_rx.recv() => {}
                    _ = shutdown_rx.recv() => {
                        debug!("poll scheduler disarmed");
                        break;
                    }
                }
                tick().await;
                // Triggers that arrived while that cycle ran are stale.
                while trigger_rx.try_recv().is_ok() {}
            }
        });

        Self {
            trigger_tx,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Request an immediate cycle through the mutual-exclusion gate.
    ///
    /// Dropped (not queued) if a cycle is already pending or running.
    pub fn trigger(&self) {
        if self.trigger_tx.try_send(()).is_err() {
            debug!("manual detect dropped: cycle already pending");
        }
    }

    /// Cancel the recurring timer. Idempotent.
    pub fn disarm(&mut self) {
        self.shutdown_tx.take();
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.disarm();
    }
}
