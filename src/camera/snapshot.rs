//! HTTP snapshot camera backend
//!
//! Many IP cameras expose a still-JPEG endpoint alongside their stream.
//! `SnapshotSource` maps each facing mode to one such URL, probes it at
//! acquire time so permission/availability errors surface immediately, and
//! then polls it from a pump task that decodes each snapshot into the
//! stream's latest-frame slot.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::camera::{CameraMode, MediaError, MediaSource, RawFrame, StreamHandle};

/// Snapshot backend configuration.
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Snapshot URL for the front-facing camera.
    pub front_url: String,
    /// Snapshot URL for the rear-facing camera.
    pub rear_url: String,
    /// Poll rate in frames per second.
    pub fps: u32,
    /// Ideal frame width; larger snapshots are scaled down (best-effort).
    pub ideal_width: u32,
    /// Ideal frame height; larger snapshots are scaled down (best-effort).
    pub ideal_height: u32,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            front_url: "http://127.0.0.1:81/front.jpg".to_string(),
            rear_url: "http://127.0.0.1:81/rear.jpg".to_string(),
            fps: 5,
            ideal_width: 640,
            ideal_height: 480,
        }
    }
}

/// Camera backend polling per-mode HTTP snapshot URLs.
pub struct SnapshotSource {
    config: SnapshotConfig,
    http: reqwest::Client,
}

impl SnapshotSource {
    pub fn new(config: SnapshotConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(10))
            .build()
            .context("build snapshot http client")?;
        Ok(Self { config, http })
    }

    fn url_for(&self, mode: CameraMode) -> &str {
        match mode {
            CameraMode::Front => &self.config.front_url,
            CameraMode::Rear => &self.config.rear_url,
        }
    }
}

#[async_trait]
impl MediaSource for SnapshotSource {
    async fn acquire(&self, mode: CameraMode) -> Result<StreamHandle, MediaError> {
        let url = self.url_for(mode).to_string();
        let (ideal_w, ideal_h) = (self.config.ideal_width, self.config.ideal_height);

        // Probe fetch: availability and decode problems belong to acquire,
        // not to the running pump.
        let first = fetch_snapshot(&self.http, &url)
            .await
            .and_then(|bytes| decode_frame(&bytes, ideal_w, ideal_h))
            .map_err(|err| MediaError::Access {
                message: format!("{err:#}"),
            })?;

        let (frame_tx, frame_rx) = watch::channel(Some(first));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let http = self.http.clone();
        let period = frame_period(self.config.fps);
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        let fetched = fetch_snapshot(&http, &url)
                            .await
                            .and_then(|bytes| decode_frame(&bytes, ideal_w, ideal_h));
                        match fetched {
                            Ok(frame) => {
                                if frame_tx.send(Some(frame)).is_err() {
                                    break;
                                }
                            }
                            // Transient fetch failures keep the last good
                            // frame in the slot; the next poll retries.
                            Err(err) => debug!(%url, error = %format!("{err:#}"), "snapshot fetch failed"),
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!(%url, "snapshot pump stopped");
                        break;
                    }
                }
            }
        });

        Ok(StreamHandle::new(mode, frame_rx, shutdown_tx))
    }
}

async fn fetch_snapshot(client: &reqwest::Client, url: &str) -> Result<Bytes> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("fetch snapshot from {url}"))?
        .error_for_status()
        .context("snapshot endpoint returned error status")?;
    let bytes = response.bytes().await.context("read snapshot body")?;
    if bytes.is_empty() {
        bail!("empty snapshot body");
    }
    Ok(bytes)
}

fn decode_frame(bytes: &[u8], ideal_w: u32, ideal_h: u32) -> Result<RawFrame> {
    let mut img = image::load_from_memory(bytes).context("decode snapshot jpeg")?;
    if img.width() > ideal_w || img.height() > ideal_h {
        img = img.thumbnail(ideal_w, ideal_h);
    }
    let rgb = img.into_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(RawFrame {
        data: Bytes::from(rgb.into_raw()),
        width,
        height,
    })
}

fn frame_period(fps: u32) -> Duration {
    Duration::from_millis((1000 / fps.max(1)).max(1) as u64)
}
