//! capstream-codec — the screen-delta run-length codec and container framing.
//!
//! # Block stream (one frame payload)
//!
//! ```text
//! header byte b            meaning
//! ─────────────────────    ───────────────────────────────────────────────
//! 0xFF                     streak marker; next byte = count (1–255) of
//!                          consecutive maximal 126-pixel "copy previous"
//!                          run blocks
//! 0x81..=0xFE              literal block of (b & 0x7F) pixels; followed by
//!                          that many 3-byte RGB colors (a (0,0,0) color
//!                          still means "copy previous" for that pixel)
//! 0x01..=0x7E              run block of b pixels; followed by one 3-byte
//!                          color ((0,0,0) = "copy previous" for the run)
//! ```
//!
//! Unchanged pixels encode as the sentinel color `(0,0,0)`; real black is
//! perturbed to `(0,0,1)` on the wire so it can never collide with the
//! sentinel, and the decoder maps `(0,0,1)` back to exact black (a source
//! pixel that really is `(0,0,1)` therefore aliases to black).  The
//! scheme is lossless given bit-exact previous-frame state, and a forced
//! full frame (`force_full = true`) never references the previous frame at
//! all, so it decodes against any prior state including all-black.
//!
//! # Container layout (one segment)
//!
//! ```text
//! [0..2]  width   u16 BE
//! [2..4]  height  u16 BE
//! then, per frame in capture order:
//! [0..4]  timestamp_ms  u32 BE
//! [4]     has_changes   u8 (0 | 1)
//! if has_changes == 1:
//! [5..9]  payload_len   u32 BE
//! [9..]   payload       block stream, optionally a zlib stream
//! ```
//!
//! A segment ends at physical end-of-stream; there is no in-band terminator.

pub mod container;
pub mod decoder;
pub mod encoder;

pub use container::Framer;
pub use decoder::FrameDecoder;
pub use encoder::FrameEncoder;

use capstream_core::Pixel;

/// Internal "same as previous frame" color.  Real black pixels are bumped
/// to `(0,0,1)` on encode so this value is unambiguous.
pub const SENTINEL: Pixel = 0;

/// Maximum pixels a single run or literal block may declare.
pub const MAX_BLOCK_LEN: usize = 126;

/// Reserved header byte opening a streak of maximal "copy previous" blocks.
pub const STREAK_MARKER: u8 = 0xFF;
