//! The capture collaborator contract and a synthetic source.
//!
//! Platform screen grabbing (with its pointer overlay) lives outside this
//! crate; anything that can fill a pixel buffer on demand plugs in through
//! [`FrameSource`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use capstream_core::{rgb, Pixel, RecorderError, Resolution, RGB_MASK};

/// A synchronous frame producer with fixed dimensions.
///
/// # Contract
///
/// `capture_frame` must leave exactly `resolution().frame_len()` pixels in
/// `pixels`, row-major, packed `0x00RRGGBB` (alpha forced opaque — mask with
/// [`RGB_MASK`]), and return the capture timestamp in milliseconds since
/// recording start.  Timestamps must be monotonically non-decreasing.
/// The buffer passed in is recycled from earlier frames and may hold stale
/// pixels; implementations overwrite it entirely.
pub trait FrameSource: Send + 'static {
    fn resolution(&self) -> Resolution;

    fn capture_frame(&mut self, pixels: &mut Vec<Pixel>) -> Result<u32, RecorderError>;
}

/// Deterministic test-pattern source: a fixed gradient background with a
/// band of rows that moves every frame, so deltas stay small while every
/// frame differs from its predecessor.
///
/// Timestamps are synthesized as `frame_index × tick_ms`, which keeps tests
/// and demos reproducible.
pub struct SyntheticSource {
    resolution: Resolution,
    tick_ms: u32,
    frame_index: u32,
    frames_captured: Arc<AtomicU64>,
}

impl SyntheticSource {
    pub fn new(resolution: Resolution, tick_ms: u32) -> Self {
        Self {
            resolution,
            tick_ms,
            frame_index: 0,
            frames_captured: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shared capture counter; clone before handing the source to a session.
    pub fn capture_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.frames_captured)
    }
}

impl FrameSource for SyntheticSource {
    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn capture_frame(&mut self, pixels: &mut Vec<Pixel>) -> Result<u32, RecorderError> {
        let w = self.resolution.width as usize;
        let h = self.resolution.height as usize;
        pixels.clear();
        pixels.reserve(w * h);

        let band_top = (self.frame_index as usize * 3) % h.max(1);
        for y in 0..h {
            let in_band = y >= band_top && y < band_top + 8;
            for x in 0..w {
                let px = if in_band {
                    rgb(250, 30, self.frame_index as u8)
                } else {
                    rgb((x * 255 / w.max(1)) as u8, (y * 255 / h.max(1)) as u8, 40)
                };
                pixels.push(px & RGB_MASK);
            }
        }

        let timestamp = self.frame_index.wrapping_mul(self.tick_ms);
        self.frame_index += 1;
        self.frames_captured.fetch_add(1, Ordering::Relaxed);
        Ok(timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_exactly_one_frame_and_advances_time() {
        let res = Resolution::new(32, 16);
        let mut source = SyntheticSource::new(res, 190);
        let mut buf = Vec::new();

        assert_eq!(source.capture_frame(&mut buf).unwrap(), 0);
        assert_eq!(buf.len(), res.frame_len());

        assert_eq!(source.capture_frame(&mut buf).unwrap(), 190);
        assert_eq!(buf.len(), res.frame_len());
        assert_eq!(source.capture_counter().load(Ordering::Relaxed), 2);
    }

    #[test]
    fn successive_frames_differ() {
        let res = Resolution::new(16, 16);
        let mut source = SyntheticSource::new(res, 10);
        let mut a = Vec::new();
        let mut b = Vec::new();
        source.capture_frame(&mut a).unwrap();
        source.capture_frame(&mut b).unwrap();
        assert_ne!(a, b);
    }
}
