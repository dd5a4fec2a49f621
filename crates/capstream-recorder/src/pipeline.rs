//! Producer/consumer recording pipeline.
//!
//! One producer task captures frames on a fixed cadence and offers them to
//! a bounded queue; one consumer task drains the queue in strict FIFO
//! order, encodes, and writes.  The queue's capacity (`queue_depth`,
//! default 2) is the backpressure mechanism: a full queue suspends the
//! producer instead of dropping frames.
//!
//! Shutdown is cooperative: [`RecorderSession::shutdown`] raises the stop
//! signal, the producer exits at its next suspension point and drops its
//! queue sender, and that channel close — not a racy flag — is what wakes a
//! consumer blocked on an empty queue.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use capstream_codec::FrameEncoder;
use capstream_core::{Pixel, RawFrame, RecorderConfig, RecorderError, Resolution};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::capture::FrameSource;
use crate::rotator::RotatingSegmentWriter;

// ── Events ────────────────────────────────────────────────────────────────

/// Updates sent by the pipeline to the session owner's listener channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    /// A frame was encoded and handed to the segment writer.
    FrameRecorded { timestamp_ms: u32, keyframe: bool },
    /// The pipeline stopped cleanly and the segment writer is closed.
    Stopped,
    /// A fatal capture/encode/write error stopped the pipeline.  The last
    /// flushed segment is the effective end of the recording.
    Failed(String),
}

// ── Session handle ────────────────────────────────────────────────────────

/// Handle to a running recording session.
pub struct RecorderSession {
    stop_tx: mpsc::Sender<()>,
    producer: JoinHandle<()>,
    consumer: JoinHandle<()>,
    frames_recorded: Arc<AtomicU64>,
}

impl RecorderSession {
    /// Spawn the producer and consumer tasks for one recording session.
    ///
    /// `writer` must have been opened with the session's resolution; the
    /// consumer owns it exclusively from here on.
    pub fn spawn(
        source: impl FrameSource,
        writer: RotatingSegmentWriter,
        config: RecorderConfig,
        event_tx: mpsc::Sender<RecorderEvent>,
    ) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>(1);
        let (frame_tx, frame_rx) = mpsc::channel::<RawFrame>(config.queue_depth.max(1));
        // Stale pixel buffers travel back to the producer for reuse, so the
        // session allocates a handful of buffers total, not one per frame.
        let (recycle_tx, recycle_rx) = mpsc::unbounded_channel::<Vec<Pixel>>();
        let frames_recorded = Arc::new(AtomicU64::new(0));

        let resolution = source.resolution();
        let producer = tokio::spawn(run_producer(
            source,
            config.clone(),
            stop_rx,
            frame_tx,
            recycle_rx,
            event_tx.clone(),
        ));
        let consumer = tokio::spawn(run_consumer(
            resolution,
            config,
            writer,
            frame_rx,
            recycle_tx,
            event_tx,
            Arc::clone(&frames_recorded),
        ));

        Self { stop_tx, producer, consumer, frames_recorded }
    }

    /// Frames recorded so far.
    pub fn frames_recorded(&self) -> u64 {
        self.frames_recorded.load(Ordering::Relaxed)
    }

    /// Request graceful stop (non-blocking).
    pub fn stop(&self) {
        let _ = self.stop_tx.try_send(());
    }

    /// Stop and wait for the tasks to drain, with a bounded number of short
    /// waits before forcing teardown.  Returns the total frames recorded.
    pub async fn shutdown(self) -> u64 {
        self.stop();
        for _ in 0..10 {
            if self.producer.is_finished() && self.consumer.is_finished() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        // No-ops when the tasks already exited.
        self.producer.abort();
        self.consumer.abort();
        let _ = self.producer.await;
        let _ = self.consumer.await;
        self.frames_recorded.load(Ordering::Relaxed)
    }
}

// ── Producer ──────────────────────────────────────────────────────────────

async fn run_producer(
    mut source: impl FrameSource,
    config: RecorderConfig,
    mut stop_rx: mpsc::Receiver<()>,
    frame_tx: mpsc::Sender<RawFrame>,
    mut recycle_rx: mpsc::UnboundedReceiver<Vec<Pixel>>,
    event_tx: mpsc::Sender<RecorderEvent>,
) {
    let mut ticker = tokio::time::interval(config.frame_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = stop_rx.recv() => {
                info!("capture stop requested");
                break;
            }
            _ = ticker.tick() => {
                let mut pixels = recycle_rx.try_recv().unwrap_or_default();
                let timestamp_ms = match source.capture_frame(&mut pixels) {
                    Ok(ts) => ts,
                    Err(e) => {
                        error!("capture failed: {e}");
                        let _ = event_tx.send(RecorderEvent::Failed(format!("Capture: {e}"))).await;
                        break;
                    }
                };
                // Suspends while the queue is full: backpressure, never a
                // dropped frame.  Fails only when the consumer died.
                if frame_tx.send(RawFrame::new(pixels, timestamp_ms)).await.is_err() {
                    break;
                }
            }
        }
    }
    // Dropping frame_tx closes the queue; the close wakes the consumer out
    // of an empty-queue wait and lets it drain what is left.
}

// ── Consumer ──────────────────────────────────────────────────────────────

async fn run_consumer(
    resolution: Resolution,
    config: RecorderConfig,
    writer: RotatingSegmentWriter,
    mut frame_rx: mpsc::Receiver<RawFrame>,
    recycle_tx: mpsc::UnboundedSender<Vec<Pixel>>,
    event_tx: mpsc::Sender<RecorderEvent>,
    frames_recorded: Arc<AtomicU64>,
) {
    let mut encoder = FrameEncoder::new(resolution);
    let keyframe_interval = config.keyframe_interval.max(1) as u64;
    let mut index: u64 = 0;

    while let Some(mut frame) = frame_rx.recv().await {
        // The first frame of a session and every keyframe_interval-th after
        // it are forced full frames: drift bound and rotation cut points.
        let keyframe = index % keyframe_interval == 0;
        let timestamp_ms = frame.timestamp_ms;

        if let Err(e) = encode_and_write(&mut encoder, &writer, &mut frame, keyframe) {
            error!("recording pipeline failed: {e}");
            let _ = event_tx.send(RecorderEvent::Failed(e.to_string())).await;
            // Dropping frame_rx fails the producer's next send, stopping it.
            break;
        }

        let _ = recycle_tx.send(frame.pixels);
        index += 1;
        frames_recorded.fetch_add(1, Ordering::Relaxed);
        let _ = event_tx.try_send(RecorderEvent::FrameRecorded { timestamp_ms, keyframe });
    }

    if let Err(e) = writer.shutdown() {
        error!("segment writer shutdown failed: {e}");
    }
    info!("recording stopped after {} frames", index);
    let _ = event_tx.send(RecorderEvent::Stopped).await;
}

fn encode_and_write(
    encoder: &mut FrameEncoder,
    writer: &RotatingSegmentWriter,
    frame: &mut RawFrame,
    keyframe: bool,
) -> Result<(), RecorderError> {
    let encoded = encoder.encode(&mut frame.pixels, frame.timestamp_ms, keyframe)?;
    writer.write_frame(&encoded, keyframe)?;
    Ok(())
}
