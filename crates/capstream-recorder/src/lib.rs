//! capstream-recorder — the capture → encode → write recording pipeline.
//!
//! # Architecture
//!
//! ```text
//! FrameSource (capture collaborator)
//!   │  producer task: rate-limited capture loop, stop channel
//!   ▼
//! bounded mpsc queue (queue_depth, default 2) ── backpressure
//!   │  consumer task: strict FIFO drain
//!   ▼
//! FrameEncoder (keyframe every keyframe_interval frames)
//!   │
//!   ▼
//! RotatingSegmentWriter ── in-memory buffer, flush timer,
//!   │                      rotation timer (honored at keyframes only)
//!   ▼
//! SegmentStore ── prefix_NNNN.cap files
//! ```
//!
//! The producer suspends between captures to respect the rate limit and
//! blocks when the queue is full — a slow consumer throttles capture rather
//! than dropping frames or buffering without bound.  Any capture, encode,
//! or write failure is fatal to the session: already-flushed segments stay
//! valid and decodable, and nothing is retried.

pub mod capture;
pub mod pipeline;
pub mod rotator;
pub mod segment;

pub use capture::{FrameSource, SyntheticSource};
pub use pipeline::{RecorderEvent, RecorderSession};
pub use rotator::{RotatingSegmentWriter, RotationHandle};
pub use segment::{DirectorySegmentStore, SegmentStore};
