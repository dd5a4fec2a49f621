//! Demo recorder binary.
//!
//! Records a few seconds of synthetic frames into `./recordings/` and prints
//! the totals.  Configuration is the built-in default profile unless the
//! `CAPSTREAM_CONFIG` environment variable points at a JSON config file.

use std::time::Duration;

use anyhow::Context;
use capstream_core::{RecorderConfig, Resolution};
use capstream_recorder::{
    DirectorySegmentStore, RecorderEvent, RecorderSession, RotatingSegmentWriter, SyntheticSource,
};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = load_config()?;
    let resolution = Resolution::HD;
    info!(%resolution, interval_ms = config.frame_interval_ms, "starting recorder");

    let store = DirectorySegmentStore::new("recordings", "capture")?;
    let writer = RotatingSegmentWriter::open(Box::new(store), resolution, &config)?;
    let source = SyntheticSource::new(resolution, config.frame_interval_ms as u32);

    let (event_tx, mut event_rx) = mpsc::channel::<RecorderEvent>(64);
    let session = RecorderSession::spawn(source, writer, config, event_tx);

    let events = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                RecorderEvent::FrameRecorded { timestamp_ms, keyframe } if keyframe => {
                    info!(timestamp_ms, "keyframe recorded");
                }
                RecorderEvent::FrameRecorded { .. } => {}
                RecorderEvent::Failed(reason) => warn!("recording failed: {reason}"),
                RecorderEvent::Stopped => info!("recording stopped"),
            }
        }
    });

    tokio::time::sleep(Duration::from_secs(5)).await;
    let frames = session.shutdown().await;
    let _ = events.await;

    info!(frames, "done, segments written to ./recordings");
    Ok(())
}

fn load_config() -> anyhow::Result<RecorderConfig> {
    match std::env::var("CAPSTREAM_CONFIG") {
        Ok(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config file {path}"))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing config file {path}"))
        }
        Err(_) => Ok(RecorderConfig::default()),
    }
}
