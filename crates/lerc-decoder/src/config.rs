/// Default ceiling on `width * height`: 256 Mi pixels.
pub const DEFAULT_MAX_PIXELS: usize = 1 << 28;

/// Options controlling a single decode.
///
/// ```text
/// ┌─────────────────┬──────────────────────────────────────────────────┐
/// │ Field           │ Purpose                                          │
/// ├─────────────────┼──────────────────────────────────────────────────┤
/// │ verify_checksum │ Compare the stored Fletcher-32 (version >= 3)    │
/// │ start_offset    │ Where the blob starts inside the input buffer    │
/// │ max_pixels      │ Refuse rasters larger than this before allocating│
/// └─────────────────┴──────────────────────────────────────────────────┘
/// ```
///
/// The checksum is advisory: pixel decoding never depends on it, so it is
/// off by default. `start_offset` lets a caller walk blobs concatenated
/// back-to-back by adding each decoded blob's `blob_size`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Verify the stored checksum before decoding pixels.
    pub verify_checksum: bool,

    /// Byte offset of the blob's magic inside the input buffer.
    pub start_offset: usize,

    /// Largest raster (in pixels) the decoder will allocate for.
    pub max_pixels: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            verify_checksum: false,
            start_offset: 0,
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

impl DecodeOptions {
    /// Turn checksum verification on or off.
    #[must_use]
    pub fn with_checksum(mut self, verify: bool) -> Self {
        self.verify_checksum = verify;
        self
    }

    /// Decode the blob starting at `offset`.
    #[must_use]
    pub fn with_start_offset(mut self, offset: usize) -> Self {
        self.start_offset = offset;
        self
    }

    /// Change the pixel-count ceiling.
    #[must_use]
    pub fn with_max_pixels(mut self, max_pixels: usize) -> Self {
        self.max_pixels = max_pixels;
        self
    }
}
