//! Mirror of the encoder: reconstructs raw frames from block streams.

use capstream_core::{CodecError, EncodedFrame, Pixel, Resolution};

use crate::{MAX_BLOCK_LEN, SENTINEL, STREAK_MARKER};

/// Decodes frame payloads against an owned previous-frame buffer.
///
/// Like the encoder, one instance serves one segment: the previous buffer
/// starts all-black and each decoded frame becomes the reference for the
/// next.  Segments always open with a keyframe, so a fresh decoder per
/// segment needs no carried state.
///
/// Decoding fails closed: on the first truncated or malformed block the
/// frame is rejected and nothing decoded past that point is meaningful.
pub struct FrameDecoder {
    resolution: Resolution,
    previous: Vec<Pixel>,
    scratch: Vec<Pixel>,
}

impl FrameDecoder {
    pub fn new(resolution: Resolution) -> Self {
        let n = resolution.frame_len();
        Self { resolution, previous: vec![SENTINEL; n], scratch: vec![SENTINEL; n] }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Decode one frame record.  The returned slice is the reconstructed
    /// frame and stays valid until the next call.
    ///
    /// A record with `has_changes = false` yields the previous frame
    /// unchanged.
    pub fn decode(&mut self, frame: &EncodedFrame) -> Result<&[Pixel], CodecError> {
        if !frame.has_changes {
            return Ok(&self.previous);
        }
        self.unpack_payload(&frame.payload)?;
        std::mem::swap(&mut self.previous, &mut self.scratch);
        Ok(&self.previous)
    }

    fn unpack_payload(&mut self, payload: &[u8]) -> Result<(), CodecError> {
        let n = self.resolution.frame_len();
        let prev = &self.previous;
        let out = &mut self.scratch;

        let mut ic = 0; // byte cursor into payload
        let mut oc = 0; // pixel cursor into the frame

        while oc < n {
            let Some(&header) = payload.get(ic) else {
                return Err(CodecError::TruncatedStream {
                    offset: ic,
                    reason: "stream ended before the frame was filled",
                });
            };
            let header_at = ic;
            ic += 1;

            if header == STREAK_MARKER {
                let Some(&count) = payload.get(ic) else {
                    return Err(CodecError::TruncatedStream {
                        offset: ic,
                        reason: "streak marker missing its count byte",
                    });
                };
                ic += 1;
                if count == 0 {
                    return Err(CodecError::InvalidBlockHeader { header, offset: header_at });
                }
                // count × 126 "copy previous" pixels, clamped to frame end.
                let len = (count as usize * MAX_BLOCK_LEN).min(n - oc);
                out[oc..oc + len].copy_from_slice(&prev[oc..oc + len]);
                oc += len;
            } else if header & 0x80 != 0 {
                let len = (header & 0x7F) as usize;
                if len == 0 {
                    return Err(CodecError::InvalidBlockHeader { header, offset: header_at });
                }
                for _ in 0..len {
                    if oc >= n {
                        break;
                    }
                    let Some(bytes) = payload.get(ic..ic + 3) else {
                        return Err(CodecError::TruncatedStream {
                            offset: ic,
                            reason: "literal block shorter than declared",
                        });
                    };
                    ic += 3;
                    let color = pixel_from(bytes);
                    out[oc] = if color == SENTINEL { prev[oc] } else { unbump(color) };
                    oc += 1;
                }
            } else {
                let len = header as usize;
                if len == 0 || len > MAX_BLOCK_LEN {
                    return Err(CodecError::InvalidBlockHeader { header, offset: header_at });
                }
                let Some(bytes) = payload.get(ic..ic + 3) else {
                    return Err(CodecError::TruncatedStream {
                        offset: ic,
                        reason: "run block missing its color",
                    });
                };
                ic += 3;
                let color = pixel_from(bytes);
                let len = len.min(n - oc);
                if color == SENTINEL {
                    out[oc..oc + len].copy_from_slice(&prev[oc..oc + len]);
                } else {
                    out[oc..oc + len].fill(unbump(color));
                }
                oc += len;
            }
        }

        Ok(())
    }
}

#[inline]
fn pixel_from(bytes: &[u8]) -> Pixel {
    ((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | (bytes[2] as u32)
}

/// Undo the encoder's black bump: wire `(0,0,1)` is the representation of
/// real black, so it decodes back to exact `(0,0,0)`.
#[inline]
fn unbump(color: Pixel) -> Pixel {
    if color == 1 {
        SENTINEL
    } else {
        color
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::FrameEncoder;
    use bytes::Bytes;
    use capstream_core::rgb;

    fn frame_of(payload: Vec<u8>) -> EncodedFrame {
        EncodedFrame { timestamp_ms: 0, has_changes: true, payload: Bytes::from(payload) }
    }

    #[test]
    fn round_trips_delta_frames() {
        let res = Resolution::new(64, 48);
        let n = res.frame_len();
        let mut enc = FrameEncoder::new(res);
        let mut dec = FrameDecoder::new(res);

        let first: Vec<Pixel> = (0..n).map(|i| rgb((i / 64) as u8, (i % 64) as u8, 7)).collect();
        let mut second = first.clone();
        // A changed band in the middle, including some real black.
        for px in second.iter_mut().skip(n / 3).take(n / 4) {
            *px = rgb(0, 0, 0);
        }

        let mut buf = first.clone();
        let key = enc.encode(&mut buf, 0, true).expect("keyframe");
        assert_eq!(dec.decode(&key).expect("decode keyframe"), &first[..]);

        let mut buf = second.clone();
        let delta = enc.encode(&mut buf, 1, false).expect("delta");
        assert_eq!(dec.decode(&delta).expect("decode delta"), &second[..]);
    }

    #[test]
    fn keyframe_decodes_against_any_previous_state() {
        let res = Resolution::new(30, 20);
        let n = res.frame_len();
        let frame: Vec<Pixel> = (0..n).map(|i| rgb(3, (i % 251) as u8, 90)).collect();

        let mut enc = FrameEncoder::new(res);
        // Dirty the encoder's previous state first.
        let mut noise: Vec<Pixel> = (0..n).map(|i| rgb(200, 100, i as u8)).collect();
        enc.encode(&mut noise, 0, true).expect("noise");

        let mut buf = frame.clone();
        let key = enc.encode(&mut buf, 1, true).expect("keyframe");

        // A decoder with all-black state reconstructs it exactly.
        let mut dec = FrameDecoder::new(res);
        assert_eq!(dec.decode(&key).expect("decode"), &frame[..]);
    }

    #[test]
    fn black_pixel_round_trips_through_sentinel_bump() {
        let res = Resolution::new(3, 1);
        let mut enc = FrameEncoder::new(res);
        let mut dec = FrameDecoder::new(res);

        let mut first = vec![rgb(5, 5, 5); 3];
        let key = enc.encode(&mut first, 0, true).expect("keyframe");
        dec.decode(&key).expect("decode");

        // Middle pixel turns real black: it differs from the previous frame,
        // goes over the wire as the bumped (0,0,1), and decodes back to
        // exact (0,0,0).
        let mut second = vec![rgb(5, 5, 5), rgb(0, 0, 0), rgb(5, 5, 5)];
        let delta = enc.encode(&mut second, 1, false).expect("delta");
        // Sentinel run for the first pixel, then a literal with the bumped
        // black followed by an in-literal sentinel for the last pixel.
        assert_eq!(&delta.payload[..], &[0x01, 0, 0, 0, 0x82, 0, 0, 1, 0, 0, 0]);
        let decoded = dec.decode(&delta).expect("decode");
        assert_eq!(decoded, &[rgb(5, 5, 5), rgb(0, 0, 0), rgb(5, 5, 5)]);
    }

    #[test]
    fn truncated_stream_fails_closed() {
        let res = Resolution::new(10, 10);
        let mut dec = FrameDecoder::new(res);
        // Run of 50 pixels, then nothing — 50 more pixels are missing.
        let err = dec.decode(&frame_of(vec![50, 1, 2, 3])).unwrap_err();
        assert!(matches!(err, CodecError::TruncatedStream { .. }), "got {err}");
    }

    #[test]
    fn zero_length_blocks_are_rejected() {
        let res = Resolution::new(2, 2);
        let mut dec = FrameDecoder::new(res);
        for payload in [vec![0u8, 1, 2, 3], vec![0x80, 1, 2, 3], vec![0x7F, 1, 2, 3]] {
            let err = dec.decode(&frame_of(payload)).unwrap_err();
            assert!(matches!(err, CodecError::InvalidBlockHeader { .. }), "got {err}");
        }
    }
}
