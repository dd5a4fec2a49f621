//! Recording reader / conversion front-end.
//!
//! Walks the `.cap` segments of a finished recording in index order, decodes
//! every frame back to raw pixels, and hands `(pixels, timestamp)` pairs to a
//! [`FrameMuxer`].  Each segment starts with a keyframe, so every segment is
//! decoded with a fresh decoder and no state crosses segment boundaries.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::Context;
use capstream_codec::{FrameDecoder, Framer};
use capstream_core::{CodecError, Pixel, Resolution};
use tracing::{debug, info};

// ── Muxer contract ────────────────────────────────────────────────────────

/// Downstream consumer of decoded frames (a video muxer, an image dumper, a
/// checksum pass).  Frames arrive in recording order across all segments.
pub trait FrameMuxer {
    fn push_frame(&mut self, pixels: &[Pixel], timestamp_ms: u32) -> anyhow::Result<()>;

    /// Called once after the last frame of the last segment.
    fn finish(&mut self) -> anyhow::Result<()> {
        Ok(())
    }
}

// ── Segment reader ────────────────────────────────────────────────────────

/// Streaming reader for one `.cap` segment.
pub struct SegmentReader<R: Read> {
    source: R,
    framer: Framer,
    decoder: FrameDecoder,
    resolution: Resolution,
}

impl SegmentReader<BufReader<File>> {
    pub fn open_file(path: impl AsRef<Path>, use_compression: bool) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("opening segment {}", path.display()))?;
        Self::new(BufReader::new(file), use_compression)
            .with_context(|| format!("reading segment {}", path.display()))
    }
}

impl<R: Read> SegmentReader<R> {
    /// Read the segment header and set up a decoder for its resolution.
    pub fn new(mut source: R, use_compression: bool) -> Result<Self, CodecError> {
        let framer = Framer::new(use_compression);
        let resolution = framer.read_segment_header(&mut source)?;
        debug!(%resolution, "segment opened");
        Ok(Self { source, framer, decoder: FrameDecoder::new(resolution), resolution })
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Decode the next frame, or `Ok(None)` at the end of the segment.
    pub fn next_frame(&mut self) -> Result<Option<(&[Pixel], u32)>, CodecError> {
        match self.framer.read_record(&mut self.source)? {
            Some(record) => {
                let timestamp_ms = record.timestamp_ms;
                let pixels = self.decoder.decode(&record)?;
                Ok(Some((pixels, timestamp_ms)))
            }
            None => Ok(None),
        }
    }
}

// ── Recording conversion ──────────────────────────────────────────────────

/// Decode a whole recording directory (`{prefix}_NNNN.cap`, in index order)
/// through `muxer`.  Returns the total number of frames pushed.
pub fn convert_recording(
    directory: impl AsRef<Path>,
    prefix: &str,
    use_compression: bool,
    muxer: &mut dyn FrameMuxer,
) -> anyhow::Result<u64> {
    let directory = directory.as_ref();
    let segments = list_segments(directory, prefix)?;
    anyhow::ensure!(
        !segments.is_empty(),
        "no segments named {prefix}_*.cap in {}",
        directory.display()
    );

    let mut frames: u64 = 0;
    for path in &segments {
        let mut reader = SegmentReader::open_file(path, use_compression)?;
        while let Some((pixels, timestamp_ms)) = reader
            .next_frame()
            .with_context(|| format!("decoding {}", path.display()))?
        {
            muxer.push_frame(pixels, timestamp_ms)?;
            frames += 1;
        }
    }
    muxer.finish()?;
    info!(frames, segments = segments.len(), "recording converted");
    Ok(frames)
}

/// Segment files for `prefix`, sorted by name.  Zero-padded indices make
/// lexicographic order equal recording order.
fn list_segments(directory: &Path, prefix: &str) -> anyhow::Result<Vec<std::path::PathBuf>> {
    let wanted = format!("{prefix}_");
    let mut segments = Vec::new();
    for entry in std::fs::read_dir(directory)
        .with_context(|| format!("listing {}", directory.display()))?
    {
        let path = entry?.path();
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };
        if name.starts_with(&wanted) && name.ends_with(".cap") {
            segments.push(path);
        }
    }
    segments.sort();
    Ok(segments)
}
