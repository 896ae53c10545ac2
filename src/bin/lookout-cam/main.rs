//! Lookout camera binary
//!
//! Polls a camera for stills and submits them to a remote detection
//! endpoint, logging what the service finds.
//!
//! ## Usage
//!
//! ```bash
//! # Point at the detection service and the per-mode snapshot URLs
//! export LOOKOUT_ENDPOINT=http://detector.local:3000/api/detect
//! export LOOKOUT_FRONT_URL=http://cam.local:81/front.jpg
//! export LOOKOUT_REAR_URL=http://cam.local:81/rear.jpg
//! lookout-cam
//!
//! # Run with a synthetic camera (development, requires --features test-source)
//! lookout-cam --test-source
//!
//! # Start on the front camera, detect every 5 seconds
//! LOOKOUT_MODE=front LOOKOUT_INTERVAL_SECS=5 lookout-cam
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use lookout::{
    CameraMode, DetectionClient, DetectionClientConfig, MediaSource, SessionConfig,
    SessionController, SnapshotConfig, SnapshotSource,
};

/// Configuration from environment/args
struct Config {
    /// Detection endpoint URL
    endpoint: String,
    /// Snapshot URL for the front camera
    front_url: Option<String>,
    /// Snapshot URL for the rear camera
    rear_url: Option<String>,
    /// Seconds between automatic detect cycles
    interval_secs: u64,
    /// Milliseconds to settle between release and reopen on mode switch
    settle_ms: u64,
    /// JPEG quality for uploads
    jpeg_quality: u8,
    /// Facing mode used on startup
    start_mode: CameraMode,
    /// Use the synthetic source instead of real cameras
    test_source: bool,
}

impl Config {
    fn from_env() -> Result<Self> {
        let endpoint = std::env::var("LOOKOUT_ENDPOINT")
            .unwrap_or_else(|_| DetectionClientConfig::default().endpoint);

        let front_url = std::env::var("LOOKOUT_FRONT_URL").ok();
        let rear_url = std::env::var("LOOKOUT_REAR_URL").ok();

        let interval_secs: u64 = std::env::var("LOOKOUT_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);

        let settle_ms: u64 = std::env::var("LOOKOUT_SETTLE_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(300);

        let jpeg_quality: u8 = std::env::var("LOOKOUT_JPEG_QUALITY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(lookout::DEFAULT_JPEG_QUALITY);

        let start_mode = match std::env::var("LOOKOUT_MODE").as_deref() {
            Ok("front") => CameraMode::Front,
            _ => CameraMode::Rear,
        };

        let args: Vec<String> = std::env::args().collect();
        let test_source = args.iter().any(|arg| arg == "--test-source");

        Ok(Self {
            endpoint,
            front_url,
            rear_url,
            interval_secs,
            settle_ms,
            jpeg_quality,
            start_mode,
            test_source,
        })
    }
}

fn build_source(config: &Config) -> Result<Arc<dyn MediaSource>> {
    if config.test_source {
        #[cfg(feature = "test-source")]
        {
            info!("Using synthetic camera source");
            return Ok(Arc::new(lookout::SyntheticSource::new(
                lookout::SyntheticConfig::default(),
            )));
        }
        #[cfg(not(feature = "test-source"))]
        {
            anyhow::bail!("Test source not enabled. Rebuild with --features test-source");
        }
    }

    let front_url = config
        .front_url
        .clone()
        .context("LOOKOUT_FRONT_URL environment variable not set")?;
    let rear_url = config
        .rear_url
        .clone()
        .context("LOOKOUT_REAR_URL environment variable not set")?;

    let source = SnapshotSource::new(SnapshotConfig {
        front_url,
        rear_url,
        ..Default::default()
    })?;
    Ok(Arc::new(source))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("lookout=info".parse().unwrap()),
        )
        .init();

    let config = Config::from_env()?;

    info!("Lookout starting");
    info!("  Endpoint: {}", config.endpoint);
    info!("  Interval: {}s", config.interval_secs);
    info!("  Start mode: {}", config.start_mode);
    info!("  Test source: {}", config.test_source);

    let source = build_source(&config)?;
    let detector = Arc::new(DetectionClient::new(DetectionClientConfig {
        endpoint: config.endpoint.clone(),
        ..Default::default()
    })?);

    let session = SessionController::new(
        source,
        detector,
        SessionConfig {
            poll_interval: Duration::from_secs(config.interval_secs.max(1)),
            switch_settle: Duration::from_millis(config.settle_ms),
            jpeg_quality: config.jpeg_quality,
            initial_mode: config.start_mode,
        },
    );

    session.start().await;
    let status = session.status().await;
    if !status.streaming {
        anyhow::bail!(
            "camera failed to start: {}",
            status.last_error.unwrap_or_else(|| "unknown error".into())
        );
    }

    // Stats every 5 seconds until Ctrl+C
    let mut stats = tokio::time::interval(Duration::from_secs(5));
    stats.tick().await;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
            _ = stats.tick() => {
                let status = session.status().await;
                let objects = status
                    .last_batch
                    .as_ref()
                    .map(|batch| batch.objects.len())
                    .unwrap_or(0);
                info!(
                    "Stats: mode={}, processing={}, cycles={} ({} failed), objects={}",
                    status.camera_mode,
                    status.processing,
                    status.ticks_completed,
                    status.ticks_failed,
                    objects,
                );
                if let Some(error) = &status.last_error {
                    warn!("Last detect error: {error}");
                }
            }
        }
    }

    session.teardown().await;
    Ok(())
}
