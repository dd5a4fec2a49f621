//! Container framing: segment headers and per-frame records.
//!
//! The framer decides *what bytes go where*; it writes into and reads from
//! any byte sink/source (`std::io::Write` / `Read`) and never owns one —
//! the segment writer and rotator inject theirs.

use std::io::{Read, Write};

use bytes::Bytes;
use capstream_core::{CodecError, EncodedFrame, Resolution};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tracing::trace;

/// Bytes of the per-segment header (`width:u16be, height:u16be`).
pub const SEGMENT_HEADER_LEN: usize = 4;

/// Wraps/unwraps codec payloads with frame records and the optional zlib
/// byte-compression stage.
///
/// Compression is a session-wide choice baked into the stream: a segment
/// written with compression on must be read with it on.
#[derive(Debug, Clone, Copy)]
pub struct Framer {
    use_compression: bool,
}

impl Framer {
    pub fn new(use_compression: bool) -> Self {
        Self { use_compression }
    }

    pub fn uses_compression(&self) -> bool {
        self.use_compression
    }

    // ── Writing ──────────────────────────────────────────────────────────

    /// Write the 4-byte segment header.  Every segment starts with one so
    /// each is independently parseable.
    pub fn write_segment_header<W: Write>(
        &self,
        sink: &mut W,
        resolution: Resolution,
    ) -> Result<(), CodecError> {
        sink.write_all(&resolution.width.to_be_bytes())?;
        sink.write_all(&resolution.height.to_be_bytes())?;
        Ok(())
    }

    /// Write one frame record.  Unchanged frames carry only their timestamp
    /// and a zero flag.
    pub fn write_record<W: Write>(
        &self,
        sink: &mut W,
        frame: &EncodedFrame,
    ) -> Result<(), CodecError> {
        sink.write_all(&frame.timestamp_ms.to_be_bytes())?;
        if !frame.has_changes {
            sink.write_all(&[0])?;
            return Ok(());
        }
        sink.write_all(&[1])?;

        if self.use_compression {
            let mut encoder =
                ZlibEncoder::new(Vec::with_capacity(frame.payload.len() / 2 + 16), Compression::fast());
            encoder.write_all(&frame.payload)?;
            let deflated = encoder.finish()?;
            trace!(
                ts = frame.timestamp_ms,
                raw = frame.payload.len(),
                deflated = deflated.len(),
                "frame record"
            );
            sink.write_all(&(deflated.len() as u32).to_be_bytes())?;
            sink.write_all(&deflated)?;
        } else {
            trace!(ts = frame.timestamp_ms, raw = frame.payload.len(), "frame record");
            sink.write_all(&(frame.payload.len() as u32).to_be_bytes())?;
            sink.write_all(&frame.payload)?;
        }
        Ok(())
    }

    // ── Reading ──────────────────────────────────────────────────────────

    /// Read the 4-byte segment header.
    pub fn read_segment_header<R: Read>(&self, source: &mut R) -> Result<Resolution, CodecError> {
        let mut header = [0u8; SEGMENT_HEADER_LEN];
        read_exact_or(source, &mut header, "segment header")?;
        Ok(Resolution::new(
            u16::from_be_bytes([header[0], header[1]]),
            u16::from_be_bytes([header[2], header[3]]),
        ))
    }

    /// Read the next frame record.
    ///
    /// Returns `Ok(None)` at clean end-of-stream on a record boundary — the
    /// segment's end.  EOF anywhere inside a record is a truncation error.
    pub fn read_record<R: Read>(&self, source: &mut R) -> Result<Option<EncodedFrame>, CodecError> {
        let mut ts = [0u8; 4];
        if let Err(e) = source.read_exact(&mut ts[..1]) {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                return Ok(None); // end of segment
            }
            return Err(e.into());
        }
        read_exact_or(source, &mut ts[1..], "frame timestamp")?;
        let timestamp_ms = u32::from_be_bytes(ts);

        let mut flag = [0u8; 1];
        read_exact_or(source, &mut flag, "has_changes flag")?;
        match flag[0] {
            0 => {
                trace!(ts = timestamp_ms, "unchanged frame record");
                return Ok(Some(EncodedFrame::unchanged(timestamp_ms)));
            }
            1 => {}
            flag => return Err(CodecError::InvalidRecordFlag { flag }),
        }

        let mut len = [0u8; 4];
        read_exact_or(source, &mut len, "payload length")?;
        let len = u32::from_be_bytes(len) as usize;

        let mut payload = vec![0u8; len];
        read_exact_or(source, &mut payload, "frame payload")?;

        let payload = if self.use_compression {
            let mut inflated = Vec::with_capacity(len * 4);
            ZlibDecoder::new(&payload[..])
                .read_to_end(&mut inflated)
                .map_err(CodecError::Decompress)?;
            inflated
        } else {
            payload
        };
        trace!(ts = timestamp_ms, bytes = payload.len(), "frame record");

        Ok(Some(EncodedFrame {
            timestamp_ms,
            has_changes: true,
            payload: Bytes::from(payload),
        }))
    }
}

/// `read_exact` that reports mid-record EOF as a truncated stream instead
/// of a bare IO error.
fn read_exact_or<R: Read>(
    source: &mut R,
    buf: &mut [u8],
    what: &'static str,
) -> Result<(), CodecError> {
    source.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            CodecError::TruncatedStream { offset: 0, reason: what }
        } else {
            CodecError::Io(e)
        }
    })
}
