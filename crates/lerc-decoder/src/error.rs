use std::fmt;

use lerc_wire::WireError;

/// Format features that are recognised but not decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnsupportedFeature {
    /// Huffman-coded byte rasters (`Byte`/`Char` at `max_z_error == 0.5`).
    Huffman,
}

impl fmt::Display for UnsupportedFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Huffman => f.write_str("Huffman-coded byte raster"),
        }
    }
}

/// Errors that can occur while decoding a LERC2 blob.
///
/// Decoding is strictly sequential, so the first error aborts the whole
/// decode and no partial raster is returned.
///
/// ```text
///   DecodeError
///   ├── InvalidHeader(WireError)  ← magic, version, field invariants
///   ├── Truncated                 ← blob_size runs past the input
///   ├── ChecksumMismatch          ← Fletcher-32 disagrees (opt-in)
///   ├── RasterTooLarge            ← width*height above the configured limit
///   ├── MaskInconsistent          ← mask size contradicts num_valid_pixel
///   ├── MaskRle                   ← RLE payload over/under-runs
///   ├── TileIntegrity             ← control byte nibble != (col_start>>3)&15
///   ├── TileValueCount            ← bit-stuffed count fits neither shape
///   ├── InvalidHuffmanFlag        ← image-encode-mode byte out of range
///   ├── Unsupported               ← recognised but undecoded feature
///   └── Wire(WireError)           ← short reads, bit-stuffer failures
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The 62-byte header failed to parse or validate.
    #[error("invalid header: {0}")]
    InvalidHeader(WireError),

    /// The header declares a blob longer than the bytes supplied.
    #[error("blob declares {blob_size} bytes but only {available} are available")]
    Truncated { blob_size: usize, available: usize },

    /// Stored and computed checksums differ.
    #[error("checksum mismatch: header has {expected:#010X}, computed {computed:#010X}")]
    ChecksumMismatch { expected: u32, computed: u32 },

    /// `width * height` exceeds [`DecodeOptions::max_pixels`](crate::DecodeOptions::max_pixels).
    #[error("raster has {pixels} pixels, limit is {limit}")]
    RasterTooLarge { pixels: usize, limit: usize },

    /// The mask byte count contradicts the valid-pixel count.
    #[error("mask of {num_bytes_mask} bytes is inconsistent with {num_valid_pixel} valid of {pixel_count} pixels")]
    MaskInconsistent {
        num_bytes_mask: i32,
        num_valid_pixel: i32,
        pixel_count: usize,
    },

    /// The RLE-compressed mask could not be expanded.
    #[error("corrupt RLE mask at offset {offset}: {reason}")]
    MaskRle { offset: usize, reason: &'static str },

    /// A tile's control byte failed the column integrity check.
    #[error("tile at row {row_start}, col {col_start}: integrity code {found}, expected {expected}")]
    TileIntegrity {
        row_start: usize,
        col_start: usize,
        expected: u8,
        found: u8,
    },

    /// A bit-stuffed tile decoded to a value count matching neither the
    /// tile's pixel count nor its valid-pixel count.
    #[error("tile at row {row_start}, col {col_start}: {found} values for {pixels} pixels ({valid} valid)")]
    TileValueCount {
        row_start: usize,
        col_start: usize,
        found: usize,
        pixels: usize,
        valid: usize,
    },

    /// Image-encode-mode byte outside the known range.
    #[error("invalid image encode mode {flag} at offset {offset}")]
    InvalidHuffmanFlag { flag: u8, offset: usize },

    /// The blob uses a feature this decoder does not implement.
    #[error("unsupported feature: {0}")]
    Unsupported(UnsupportedFeature),

    /// A low-level read failed.
    #[error(transparent)]
    Wire(#[from] WireError),
}
