//! Buffered, rotating segment writer.
//!
//! All frame records land in an in-memory buffer first; a timer task flushes
//! the buffer to the active segment file on a fixed cadence, independent of
//! frame cadence, so individual encode calls never wait on the disk.  A
//! second, longer-period timer *requests* rotation; the request is honored
//! only when the consumer writes a keyframe, so every closed segment decodes
//! on its own from its own header.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use capstream_codec::Framer;
use capstream_core::{EncodedFrame, RecorderConfig, RecorderError, Resolution};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, error, info};

use crate::segment::SegmentStore;

struct Inner {
    /// Pending bytes; everything (headers included) goes through here.
    buffer: Vec<u8>,
    /// Active segment sink.  Replaced on rotation; dropping the old one
    /// closes the file.
    sink: Box<dyn Write + Send>,
    store: Box<dyn SegmentStore>,
}

/// Segment writer with in-memory buffering and timer-driven flush/rotation.
///
/// Must be created inside a tokio runtime (it spawns its two timer tasks).
/// The consumer task is the only writer of frame records; the flush timer
/// is the only other party touching the buffer, behind the same lock.
pub struct RotatingSegmentWriter {
    inner: Arc<Mutex<Inner>>,
    rotate_requested: Arc<AtomicBool>,
    flush_failed: Arc<AtomicBool>,
    framer: Framer,
    resolution: Resolution,
    flush_task: JoinHandle<()>,
    rotate_task: JoinHandle<()>,
}

impl RotatingSegmentWriter {
    /// Open the first segment and start the flush/rotation timers.
    pub fn open(
        mut store: Box<dyn SegmentStore>,
        resolution: Resolution,
        config: &RecorderConfig,
    ) -> Result<Self, RecorderError> {
        let framer = Framer::new(config.use_byte_compression);
        let sink = store.open_next()?;
        let mut buffer = Vec::with_capacity(64 * 1024);
        framer.write_segment_header(&mut buffer, resolution)?;

        let inner = Arc::new(Mutex::new(Inner { buffer, sink, store }));
        let flush_failed = Arc::new(AtomicBool::new(false));
        let rotate_requested = Arc::new(AtomicBool::new(false));

        let flush_task = tokio::spawn(flush_loop(
            Arc::clone(&inner),
            Arc::clone(&flush_failed),
            Duration::from_millis(config.flush_period_ms.max(1)),
        ));
        let rotate_task = tokio::spawn(rotation_loop(
            Arc::clone(&rotate_requested),
            Duration::from_millis(config.rotation_period_ms.max(1)),
        ));

        Ok(Self {
            inner,
            rotate_requested,
            flush_failed,
            framer,
            resolution,
            flush_task,
            rotate_task,
        })
    }

    /// Append one frame record, rotating first if a rotation is pending and
    /// this frame is a keyframe (the only legal cut point).
    pub fn write_frame(&self, frame: &EncodedFrame, keyframe: bool) -> Result<(), RecorderError> {
        if self.flush_failed.load(Ordering::SeqCst) {
            return Err(RecorderError::SegmentStore {
                reason: "background segment flush failed".to_owned(),
            });
        }

        let mut inner = lock_inner(&self.inner)?;
        if keyframe && self.rotate_requested.swap(false, Ordering::SeqCst) {
            rotate(&mut inner, &self.framer, self.resolution)?;
        }
        self.framer.write_record(&mut inner.buffer, frame)?;
        Ok(())
    }

    /// Ask for rotation at the next keyframe.  The rotation timer calls the
    /// same flag; this is also useful for tests and manual cuts.
    pub fn request_rotation(&self) {
        self.rotate_requested.store(true, Ordering::SeqCst);
    }

    /// Handle for requesting rotation after the writer has moved into the
    /// pipeline.
    pub fn rotation_handle(&self) -> RotationHandle {
        RotationHandle { rotate_requested: Arc::clone(&self.rotate_requested) }
    }

    /// Drain the buffer to the active segment immediately.
    pub fn flush(&self) -> Result<(), RecorderError> {
        let mut inner = lock_inner(&self.inner)?;
        flush_buffer(&mut inner)?;
        inner.sink.flush()?;
        Ok(())
    }

    /// Stop the timers, flush what is pending, and close the active
    /// segment.
    pub fn shutdown(self) -> Result<(), RecorderError> {
        self.flush_task.abort();
        self.rotate_task.abort();
        let mut inner = lock_inner(&self.inner)?;
        flush_buffer(&mut inner)?;
        inner.sink.flush()?;
        info!("segment writer closed");
        Ok(())
    }
}

/// Detached rotation trigger; outlives the writer's move into the consumer.
#[derive(Clone)]
pub struct RotationHandle {
    rotate_requested: Arc<AtomicBool>,
}

impl RotationHandle {
    pub fn request_rotation(&self) {
        self.rotate_requested.store(true, Ordering::SeqCst);
    }
}

fn lock_inner(inner: &Mutex<Inner>) -> Result<MutexGuard<'_, Inner>, RecorderError> {
    inner.lock().map_err(|_| RecorderError::SegmentStore {
        reason: "segment buffer lock poisoned".to_owned(),
    })
}

fn flush_buffer(inner: &mut Inner) -> Result<(), RecorderError> {
    if inner.buffer.is_empty() {
        return Ok(());
    }
    let Inner { buffer, sink, .. } = inner;
    sink.write_all(buffer)?;
    buffer.clear();
    Ok(())
}

fn rotate(inner: &mut Inner, framer: &Framer, resolution: Resolution) -> Result<(), RecorderError> {
    flush_buffer(inner)?;
    inner.sink.flush()?;
    inner.sink = inner.store.open_next()?;
    framer.write_segment_header(&mut inner.buffer, resolution)?;
    info!("rotated to a new segment");
    Ok(())
}

async fn flush_loop(inner: Arc<Mutex<Inner>>, failed: Arc<AtomicBool>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    loop {
        ticker.tick().await;
        let result = match lock_inner(&inner) {
            Ok(mut inner) => flush_buffer(&mut inner),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            error!("segment flush failed: {e}");
            failed.store(true, Ordering::SeqCst);
            break;
        }
    }
}

async fn rotation_loop(rotate_requested: Arc<AtomicBool>, period: Duration) {
    let mut ticker = interval_at(Instant::now() + period, period);
    loop {
        ticker.tick().await;
        debug!("segment rotation requested");
        rotate_requested.store(true, Ordering::SeqCst);
    }
}
