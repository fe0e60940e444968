//! Fixture writer for LERC2 blobs.
//!
//! [`BlobBuilder`] assembles a blob from explicit parts: a header, a
//! validity mask, and a body chosen by the caller (constant, one-sweep, or
//! a list of tiles). It makes no compression decisions beyond the lossless
//! per-tile offsets in [`BlobBuilder::tiled_stuffed`], which exist so tests
//! and benches can produce realistic tiled blobs.
//!
//! ```text
//! ┌──────────────┬───────────────────────┬──────────────────────┐
//! │ header (62)  │ mask: i32 n + RLE(n)  │ body                 │
//! └──────────────┴───────────────────────┴──────────────────────┘
//!                                          constant:  (nothing)
//!                                          one-sweep: 1, values…
//!                                          tiled:     0, [huffman 0], tiles…
//! ```

#![allow(clippy::pedantic)]

use std::sync::Once;

use lerc_decoder::tile::TileGrid;
use lerc_wire::header::HEADER_SIZE;
use lerc_wire::{DataType, HeaderInfo, bit_stuffer, checksum};
use tracing_subscriber::EnvFilter;

// ── Tracing ───────────────────────────────────────────────────────────────────

static INIT: Once = Once::new();

/// Install a test-writer subscriber once per test binary.
///
/// Uses `RUST_LOG` if set, otherwise `lerc_decoder=debug`.
pub fn init_test_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,lerc_decoder=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .compact()
            .try_init();
    });
}

// ── Tile parts ────────────────────────────────────────────────────────────────

pub const FLAG_RAW: u8 = 0;
pub const FLAG_STUFFED: u8 = 1;
pub const FLAG_ZERO: u8 = 2;
pub const FLAG_CONSTANT: u8 = 3;

/// Tile control byte with the integrity code for a tile at `col_start`.
pub fn control_byte(col_start: usize, bits67: u8, flag: u8) -> u8 {
    (bits67 << 6) | ((((col_start >> 3) & 0x0F) as u8) << 2) | flag
}

/// Append `value` at the wire width of `data_type`.
pub fn push_value(out: &mut Vec<u8>, data_type: DataType, value: f64) {
    let start = out.len();
    out.resize(start + data_type.wire_width(), 0);
    data_type.write_le(value, &mut out[start..]);
}

pub fn zero_tile(col_start: usize) -> Vec<u8> {
    vec![control_byte(col_start, 0, FLAG_ZERO)]
}

/// Raw tile: one value per valid pixel at the raster's own type.
pub fn raw_tile(col_start: usize, data_type: DataType, values: &[f64]) -> Vec<u8> {
    let mut out = vec![control_byte(col_start, 0, FLAG_RAW)];
    for &v in values {
        push_value(&mut out, data_type, v);
    }
    out
}

/// Constant tile with the offset stored as `offset_type`.
pub fn constant_tile(col_start: usize, bits67: u8, offset_type: DataType, offset: f64) -> Vec<u8> {
    let mut out = vec![control_byte(col_start, bits67, FLAG_CONSTANT)];
    push_value(&mut out, offset_type, offset);
    out
}

/// Bit-stuffed tile: offset, then a complete bit-stuffed block.
pub fn stuffed_tile(
    col_start: usize,
    bits67: u8,
    offset_type: DataType,
    offset: f64,
    block: &[u8],
) -> Vec<u8> {
    let mut out = vec![control_byte(col_start, bits67, FLAG_STUFFED)];
    push_value(&mut out, offset_type, offset);
    out.extend_from_slice(block);
    out
}

// ── Mask parts ────────────────────────────────────────────────────────────────

/// Pack a validity list MSB-first, eight pixels per byte.
pub fn pack_mask(valid: &[bool]) -> Vec<u8> {
    let mut bits = vec![0u8; valid.len().div_ceil(8)];
    for (k, _) in valid.iter().enumerate().filter(|(_, v)| **v) {
        bits[k >> 3] |= 0x80 >> (k & 7);
    }
    bits
}

/// RLE-compress mask bytes: repeat runs of three or more, literals otherwise.
pub fn rle_compress(bytes: &[u8]) -> Vec<u8> {
    const MAX_RUN: usize = i16::MAX as usize;
    let mut out = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let mut run = 1;
        while i + run < bytes.len() && bytes[i + run] == bytes[i] && run < MAX_RUN {
            run += 1;
        }
        if run >= 3 {
            out.extend_from_slice(&(-(run as i16)).to_le_bytes());
            out.push(bytes[i]);
            i += run;
            continue;
        }

        let start = i;
        while i < bytes.len() && i - start < MAX_RUN {
            if i + 2 < bytes.len() && bytes[i] == bytes[i + 1] && bytes[i] == bytes[i + 2] {
                break;
            }
            i += 1;
        }
        out.extend_from_slice(&((i - start) as i16).to_le_bytes());
        out.extend_from_slice(&bytes[start..i]);
    }

    out.extend_from_slice(&i16::MIN.to_le_bytes());
    out
}

// ── Blob builder ──────────────────────────────────────────────────────────────

/// A finished fixture.
#[derive(Clone, Debug)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub header: HeaderInfo,
    /// Absolute offset of each tile's control byte, in grid order.
    pub tile_offsets: Vec<usize>,
}

/// Assembles a LERC2 blob part by part.
///
/// # Example
///
/// ```rust
/// use lerc_tests::BlobBuilder;
/// use lerc_wire::DataType;
///
/// let blob = BlobBuilder::new(2, 2, DataType::Int)
///     .one_sweep(&[1.0, 2.0, 3.0, 4.0])
///     .build();
/// let raster = lerc_decoder::LercDecoder::decode(&blob.bytes).unwrap();
/// assert_eq!(raster.value(1, 1), Some(4.0));
/// ```
#[derive(Clone, Debug)]
pub struct BlobBuilder {
    header: HeaderInfo,
    valid: Option<Vec<bool>>,
    body: Vec<u8>,
    tile_offsets: Vec<usize>,
    trailing: Vec<u8>,
}

impl BlobBuilder {
    /// Version 3, micro block 8, `max_z_error` 0.5, every pixel valid.
    pub fn new(width: i32, height: i32, data_type: DataType) -> Self {
        Self {
            header: HeaderInfo {
                version: 3,
                checksum: 0,
                height,
                width,
                num_valid_pixel: width * height,
                micro_block_size: 8,
                blob_size: HEADER_SIZE as i32,
                data_type,
                max_z_error: 0.5,
                z_min: 0.0,
                z_max: 0.0,
            },
            valid: None,
            body: Vec::new(),
            tile_offsets: Vec::new(),
            trailing: Vec::new(),
        }
    }

    pub fn version(mut self, version: i32) -> Self {
        self.header.version = version;
        self
    }

    pub fn micro_block_size(mut self, micro_block_size: i32) -> Self {
        self.header.micro_block_size = micro_block_size;
        self
    }

    pub fn max_z_error(mut self, max_z_error: f64) -> Self {
        self.header.max_z_error = max_z_error;
        self
    }

    /// Override the Z range. Body methods set it from the values they write.
    pub fn z_range(mut self, z_min: f64, z_max: f64) -> Self {
        self.header.z_min = z_min;
        self.header.z_max = z_max;
        self
    }

    /// Per-pixel validity, row-major. Must be set before any body method.
    pub fn valid_mask(mut self, valid: Vec<bool>) -> Self {
        assert_eq!(valid.len(), self.pixel_count(), "mask length must equal width * height");
        self.header.num_valid_pixel = valid.iter().filter(|v| **v).count() as i32;
        self.valid = Some(valid);
        self
    }

    /// Mark every pixel invalid.
    pub fn no_valid_pixels(self) -> Self {
        let n = self.pixel_count();
        self.valid_mask(vec![false; n])
    }

    /// Constant raster: every valid pixel is `z`, no body follows the mask.
    pub fn constant(self, z: f64) -> Self {
        self.z_range(z, z)
    }

    /// One-sweep body. `values` holds every pixel; invalid ones are skipped.
    pub fn one_sweep(mut self, values: &[f64]) -> Self {
        self.set_range(values);
        self.body.push(1);
        let data_type = self.header.data_type;
        let valid: Vec<usize> = self.valid_indices(values.len()).collect();
        for k in valid {
            push_value(&mut self.body, data_type, values[k]);
        }
        self
    }

    /// Tiled body from prepared tiles, preceded by the one-sweep byte and,
    /// for Huffman-eligible byte rasters, an image-encode byte of 0.
    pub fn tiled(mut self, tiles: impl IntoIterator<Item = Vec<u8>>) -> Self {
        self.body.push(0);
        if self.header.tries_huffman() {
            self.body.push(0);
        }
        for tile in tiles {
            self.tile_offsets.push(self.body.len());
            self.body.extend_from_slice(&tile);
        }
        self
    }

    /// Tiled body of raw tiles holding the valid values of `values`.
    pub fn tiled_raw(mut self, values: &[f64]) -> Self {
        self.set_range(values);
        let data_type = self.header.data_type;
        let tiles: Vec<Vec<u8>> = self
            .grid()
            .map(|bounds| {
                let tile_values: Vec<f64> = bounds
                    .linear_indices(self.width())
                    .filter(|&k| self.is_valid(k))
                    .map(|k| values[k])
                    .collect();
                raw_tile(bounds.col_start, data_type, &tile_values)
            })
            .collect();
        self.tiled(tiles)
    }

    /// Tiled body that stores each tile as `min + q * 2 * max_z_error`.
    ///
    /// Lossless when every value sits on that lattice, e.g. integer values
    /// with `max_z_error == 0.5`. Picks zero, constant, or bit-stuffed tiles;
    /// offsets are stored at the raster's own type.
    pub fn tiled_stuffed(mut self, values: &[f64]) -> Self {
        self.set_range(values);
        let data_type = self.header.data_type;
        let step = 2.0 * self.header.max_z_error;
        let tiles: Vec<Vec<u8>> = self
            .grid()
            .map(|bounds| {
                let all: Vec<usize> = bounds.linear_indices(self.width()).collect();
                let valid: Vec<usize> = all.iter().copied().filter(|&k| self.is_valid(k)).collect();
                let Some(offset) = valid.iter().map(|&k| values[k]).reduce(f64::min) else {
                    return zero_tile(bounds.col_start);
                };
                let max = valid.iter().map(|&k| values[k]).fold(offset, f64::max);
                if max == offset {
                    return if offset == 0.0 && valid.len() == all.len() {
                        zero_tile(bounds.col_start)
                    } else {
                        constant_tile(bounds.col_start, 0, data_type, offset)
                    };
                }

                let pixels = if valid.len() == all.len() { &all } else { &valid };
                let residuals: Vec<u32> = pixels
                    .iter()
                    .map(|&k| ((values[k] - offset) / step).round() as u32)
                    .collect();
                stuffed_tile(bounds.col_start, 0, data_type, offset, &bit_stuffer::encode(&residuals))
            })
            .collect();
        self.tiled(tiles)
    }

    /// Append bytes verbatim to the body.
    pub fn raw_body(mut self, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(bytes);
        self
    }

    /// Padding inside `blob_size` after the body.
    pub fn trailing(mut self, bytes: &[u8]) -> Self {
        self.trailing.extend_from_slice(bytes);
        self
    }

    /// Write the mask, body and header, then fill in the checksum.
    pub fn build(self) -> Blob {
        let mut mask_section = Vec::new();
        match &self.valid {
            Some(valid) if !self.header.all_valid() && !self.header.all_invalid() => {
                let rle = rle_compress(&pack_mask(valid));
                mask_section.extend_from_slice(&(rle.len() as i32).to_le_bytes());
                mask_section.extend_from_slice(&rle);
            }
            _ => mask_section.extend_from_slice(&0i32.to_le_bytes()),
        }

        let body_start = HEADER_SIZE + mask_section.len();
        let mut header = self.header;
        header.blob_size = (body_start + self.body.len() + self.trailing.len()) as i32;

        let mut bytes = vec![0u8; HEADER_SIZE];
        bytes.extend_from_slice(&mask_section);
        bytes.extend_from_slice(&self.body);
        bytes.extend_from_slice(&self.trailing);

        header.write_to(&mut bytes).expect("buffer holds a header");
        if header.version >= checksum::CHECKSUM_VERSION {
            header.checksum = checksum::compute(&bytes, &header).expect("blob_size matches buffer");
            header.write_to(&mut bytes).expect("buffer holds a header");
        }

        Blob {
            bytes,
            header,
            tile_offsets: self.tile_offsets.iter().map(|off| body_start + off).collect(),
        }
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    fn width(&self) -> usize {
        self.header.width as usize
    }

    fn pixel_count(&self) -> usize {
        self.header.width as usize * self.header.height as usize
    }

    fn is_valid(&self, k: usize) -> bool {
        self.valid.as_ref().is_none_or(|v| v[k])
    }

    fn valid_indices(&self, n: usize) -> impl Iterator<Item = usize> + '_ {
        (0..n).filter(|&k| self.is_valid(k))
    }

    fn grid(&self) -> TileGrid {
        TileGrid::new(
            self.header.height as usize,
            self.width(),
            self.header.micro_block_size as usize,
        )
    }

    fn set_range(&mut self, values: &[f64]) {
        assert_eq!(values.len(), self.pixel_count(), "one value per pixel");
        let valid: Vec<f64> = self.valid_indices(values.len()).map(|k| values[k]).collect();
        if let Some(min) = valid.iter().copied().reduce(f64::min) {
            self.header.z_min = min;
            self.header.z_max = valid.iter().copied().fold(min, f64::max);
        }
    }
}
