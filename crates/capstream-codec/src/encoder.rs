//! Stateful delta + run-length frame encoder.

use bytes::{BufMut, BytesMut};
use capstream_core::{CodecError, EncodedFrame, Pixel, Resolution, RGB_MASK};

use crate::{MAX_BLOCK_LEN, SENTINEL, STREAK_MARKER};

/// Encodes raw frames against an owned previous-frame buffer.
///
/// One encoder instance serves one recording session: the previous-frame
/// buffer is created once (all-black, so the first frame must be a forced
/// full frame) and swapped — not copied — with the caller's buffer on every
/// call.  After `encode` returns, the caller's `Vec` holds the stale
/// previous frame and can be reused for the next capture.
pub struct FrameEncoder {
    resolution: Resolution,
    previous: Vec<Pixel>,
}

impl FrameEncoder {
    pub fn new(resolution: Resolution) -> Self {
        Self { resolution, previous: vec![SENTINEL; resolution.frame_len()] }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Encode one frame.
    ///
    /// With `force_full = true` the unchanged-pixel short-circuit is
    /// disabled entirely and the output is a self-contained keyframe that
    /// decodes against any previous state.
    ///
    /// Fails with [`CodecError::FrameSizeMismatch`] if `current` does not
    /// match the session dimensions — a caller contract violation, fatal to
    /// the pipeline.
    pub fn encode(
        &mut self,
        current: &mut Vec<Pixel>,
        timestamp_ms: u32,
        force_full: bool,
    ) -> Result<EncodedFrame, CodecError> {
        let expected = self.resolution.frame_len();
        if current.len() != expected {
            return Err(CodecError::FrameSizeMismatch { expected, actual: current.len() });
        }

        let (payload, has_changes) = pack_blocks(current, &self.previous, force_full);

        // Double-buffer swap: `current` becomes the new previous frame and
        // the caller gets the stale buffer back for reuse.
        std::mem::swap(&mut self.previous, current);

        Ok(EncodedFrame {
            timestamp_ms,
            has_changes,
            payload: if has_changes { payload.freeze() } else { bytes::Bytes::new() },
        })
    }
}

/// Effective color of one pixel: the sentinel when it matches the previous
/// frame (and full frames are not forced), otherwise its real RGB with real
/// black bumped to `(0,0,1)`.
#[inline]
fn effective_color(current: Pixel, previous: Pixel, force_full: bool) -> Pixel {
    if !force_full && current == previous {
        return SENTINEL;
    }
    let color = current & RGB_MASK;
    if color == SENTINEL {
        1 // blue channel bump; never collides with the sentinel
    } else {
        color
    }
}

#[inline]
fn put_color(out: &mut BytesMut, color: Pixel) {
    out.put_u8((color >> 16) as u8);
    out.put_u8((color >> 8) as u8);
    out.put_u8(color as u8);
}

/// Run/literal block packer.  All state is local to one call; streaks never
/// persist across frame boundaries.
fn pack_blocks(current: &[Pixel], previous: &[Pixel], force_full: bool) -> (BytesMut, bool) {
    let n = current.len();
    // Worst case: all-literal frame, one header byte per 126 pixels.
    let mut out = BytesMut::with_capacity(3 * n + n / MAX_BLOCK_LEN + 2);

    // Current open block.  The encoder starts "in a run" of the sentinel
    // color so leading unchanged pixels coalesce immediately.
    let mut in_run = true;
    let mut block_color: Pixel = SENTINEL;
    let mut block_len: usize = 0;
    // Count of back-to-back maximal sentinel blocks in the open streak; the
    // count byte sits at the end of `out` while a streak is open.
    let mut streak: u8 = 0;
    // Position of the open literal's header byte, patched on flush.
    let mut literal_header: Option<usize> = None;

    let mut has_changes = false;

    // Emits a full-length (126 pixel) run block, coalescing maximal
    // sentinel runs behind a streak marker.
    let flush_max_run =
        |out: &mut BytesMut, color: Pixel, streak: &mut u8, has_changes: &mut bool| {
            if color == SENTINEL {
                if *streak > 0 {
                    *streak += 1;
                    let count_at = out.len() - 1;
                    out[count_at] = *streak;
                } else {
                    *streak = 1;
                    out.put_u8(STREAK_MARKER);
                    out.put_u8(1);
                }
                if *streak == u8::MAX {
                    // A 256th block would overflow the counter; close the
                    // streak and let the next one open a fresh marker.
                    *streak = 0;
                }
            } else {
                out.put_u8(MAX_BLOCK_LEN as u8);
                put_color(out, color);
                *has_changes = true;
                *streak = 0;
            }
        };

    for i in 0..n {
        let eff = effective_color(current[i], previous[i], force_full);

        if eff == block_color {
            if !in_run {
                // Two equal effective colors in a row end the literal (the
                // first of the pair stays inside it) and open a run.
                let at = literal_header.take().expect("open literal has a header");
                out[at] = (block_len as u8) | 0x80;
                has_changes = true;
                in_run = true;
                block_len = 0;
                streak = 0;
            } else if block_len == MAX_BLOCK_LEN {
                flush_max_run(&mut out, block_color, &mut streak, &mut has_changes);
                block_len = 0;
            }
        } else {
            if in_run {
                if block_len > 0 {
                    out.put_u8(block_len as u8);
                    put_color(&mut out, block_color);
                    if block_color != SENTINEL {
                        has_changes = true;
                    }
                }
                in_run = false;
                block_len = 0;
                streak = 0;
            } else if block_len == MAX_BLOCK_LEN {
                let at = literal_header.take().expect("open literal has a header");
                out[at] = (MAX_BLOCK_LEN as u8) | 0x80;
                has_changes = true;
                block_len = 0;
            }
            if literal_header.is_none() {
                literal_header = Some(out.len());
                out.put_u8(0); // patched on flush
            }
            put_color(&mut out, eff);
            block_color = eff;
        }

        block_len += 1;
    }

    // The last pixel always forces the open block out, whatever its length.
    if in_run {
        if block_len == MAX_BLOCK_LEN {
            flush_max_run(&mut out, block_color, &mut streak, &mut has_changes);
        } else if block_len > 0 {
            out.put_u8(block_len as u8);
            put_color(&mut out, block_color);
            if block_color != SENTINEL {
                has_changes = true;
            }
        }
    } else {
        let at = literal_header.take().expect("open literal has a header");
        out[at] = (block_len as u8) | 0x80;
        has_changes = true;
    }

    (out, has_changes)
}
