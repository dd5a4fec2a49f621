//! Physical segment storage: one `Write` sink per segment.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use capstream_core::RecorderError;
use tracing::debug;

/// Produces the byte sink for each successive segment.  Injected into the
/// rotator at construction so tests and alternative stores can swap in
/// their own sinks.
pub trait SegmentStore: Send {
    /// Open the next segment's sink.  The previous sink is closed by the
    /// caller dropping it; stores only hand out fresh ones.
    fn open_next(&mut self) -> Result<Box<dyn Write + Send>, RecorderError>;
}

/// File-backed store: segments are `prefix_NNNN.cap` (zero-padded ascending
/// index) inside one session directory.
#[derive(Debug)]
pub struct DirectorySegmentStore {
    directory: PathBuf,
    prefix: String,
    extension: String,
    next_index: u32,
}

impl DirectorySegmentStore {
    /// Create a store writing `prefix_NNNN.cap` files under `directory`,
    /// creating the directory if needed.
    pub fn new(directory: impl AsRef<Path>, prefix: &str) -> Result<Self, RecorderError> {
        Self::with_extension(directory, prefix, "cap")
    }

    pub fn with_extension(
        directory: impl AsRef<Path>,
        prefix: &str,
        extension: &str,
    ) -> Result<Self, RecorderError> {
        let directory = directory.as_ref().to_path_buf();
        if directory.exists() && !directory.is_dir() {
            return Err(RecorderError::SegmentStore {
                reason: format!("{} exists and is not a directory", directory.display()),
            });
        }
        std::fs::create_dir_all(&directory)?;
        Ok(Self {
            directory,
            prefix: prefix.to_owned(),
            extension: extension.to_owned(),
            next_index: 0,
        })
    }

    /// Segments opened so far.
    pub fn segments_opened(&self) -> u32 {
        self.next_index
    }

    fn segment_path(&self, index: u32) -> PathBuf {
        self.directory.join(format!("{}_{:04}.{}", self.prefix, index, self.extension))
    }
}

impl SegmentStore for DirectorySegmentStore {
    fn open_next(&mut self) -> Result<Box<dyn Write + Send>, RecorderError> {
        let path = self.segment_path(self.next_index);
        self.next_index += 1;
        debug!("opening segment {}", path.display());
        // Truncates a leftover file of the same name from an earlier run.
        let file = File::create(&path)?;
        Ok(Box::new(file))
    }
}
