use bytes::Bytes;

// MARK: - Pixel

/// One pixel, packed `0x00RRGGBB`.  The alpha byte is always zero in memory
/// and treated as opaque everywhere; capture sources must mask it off with
/// [`RGB_MASK`] before handing buffers to the codec.
pub type Pixel = u32;

/// Masks a packed pixel down to its 24-bit RGB payload.
pub const RGB_MASK: Pixel = 0x00FF_FFFF;

/// Packs 8-bit channels into a [`Pixel`].
#[inline]
pub fn rgb(r: u8, g: u8, b: u8) -> Pixel {
    ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}

// MARK: - Resolution

/// Fixed frame dimensions of a recording session.
///
/// Width and height are `u16` because that is exactly what the segment
/// header carries on the wire (`width:u16_be, height:u16_be`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Resolution {
    pub width: u16,
    pub height: u16,
}

impl Resolution {
    pub const FHD: Self = Self { width: 1920, height: 1080 };
    pub const HD: Self = Self { width: 1280, height: 720 };

    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Pixels per frame (`width × height`).
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

// MARK: - RawFrame

/// One captured raster frame: row-major packed RGB pixels plus a timestamp
/// in milliseconds since recording start.
///
/// The pixel buffer length is fixed at `resolution.frame_len()` for the
/// whole session; buffers are reused (swapped, not reallocated) between the
/// capture source and the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub pixels: Vec<Pixel>,
    pub timestamp_ms: u32,
}

impl RawFrame {
    pub fn new(pixels: Vec<Pixel>, timestamp_ms: u32) -> Self {
        Self { pixels, timestamp_ms }
    }
}

// MARK: - EncodedFrame

/// Output of one codec `encode` call.
///
/// When `has_changes` is `false` the frame is pixel-identical to its
/// predecessor and `payload` is empty; the container then writes only the
/// timestamp and flag for this frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    pub timestamp_ms: u32,
    pub has_changes: bool,
    /// Delta-RLE block stream (uncompressed; the container's zlib stage is
    /// applied at write time, not here).
    pub payload: Bytes,
}

impl EncodedFrame {
    /// An unchanged frame: timestamp only, no payload.
    pub fn unchanged(timestamp_ms: u32) -> Self {
        Self { timestamp_ms, has_changes: false, payload: Bytes::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_channels_in_rgb_order() {
        assert_eq!(rgb(0x12, 0x34, 0x56), 0x0012_3456);
        assert_eq!(rgb(0, 0, 1), 1);
    }

    #[test]
    fn frame_len_multiplies_dimensions() {
        assert_eq!(Resolution::new(4, 3).frame_len(), 12);
        assert_eq!(Resolution::FHD.frame_len(), 1920 * 1080);
    }
}
