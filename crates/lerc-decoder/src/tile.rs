//! Micro-block (tile) decoding.
//!
//! The raster is cut into `micro_block_size` squares, walked row-major. The
//! last row and column of tiles are clipped to the raster, not padded.
//! Each tile starts with a control byte:
//!
//! ```text
//! ┌────┬────┬────┬────┬────┬────┬────┬────┐
//! │ 7  │ 6  │ 5  │ 4  │ 3  │ 2  │ 1  │ 0  │
//! └────┴────┴────┴────┴────┴────┴────┴────┘
//!  └─bits67─┘ └── integrity code ───┘ └flag┘
//!
//! bits67          offset type narrowing (see `data_type_used`)
//! integrity code  must equal (col_start >> 3) & 15
//! flag            0 raw values · 1 bit-stuffed · 2 all zero · 3 constant
//! ```

use lerc_wire::{BitUnstuffer, Cursor, DataType, HeaderInfo, WireError};
use tracing::trace;

use crate::error::DecodeError;
use crate::mask::ValidityMask;
use crate::pixel::PixelBuffer;

const FLAG_RAW: u8 = 0;
const FLAG_ZERO: u8 = 2;
const FLAG_CONSTANT: u8 = 3;

/// Half-open pixel rectangle covered by one tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileBounds {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl TileBounds {
    pub fn pixel_count(&self) -> usize {
        (self.row_end - self.row_start) * (self.col_end - self.col_start)
    }

    /// Linear indices `row * raster_width + col` of the covered pixels,
    /// row-major.
    pub fn linear_indices(&self, raster_width: usize) -> impl Iterator<Item = usize> + use<> {
        let TileBounds {
            row_start,
            row_end,
            col_start,
            col_end,
        } = *self;
        (row_start..row_end).flat_map(move |row| {
            let base = row * raster_width;
            (base + col_start)..(base + col_end)
        })
    }

    /// Integrity code the control byte must carry for this tile.
    #[allow(clippy::cast_possible_truncation)]
    pub fn integrity_code(&self) -> u8 {
        ((self.col_start >> 3) & 0x0F) as u8
    }
}

/// Row-major iterator over the tiles of a raster.
#[derive(Clone, Debug)]
pub struct TileGrid {
    height: usize,
    width: usize,
    block: usize,
    rows: usize,
    cols: usize,
    next: usize,
}

impl TileGrid {
    /// # Panics
    ///
    /// Panics if `micro_block_size` is zero.
    pub fn new(height: usize, width: usize, micro_block_size: usize) -> Self {
        assert!(micro_block_size > 0, "micro block size must be positive");
        Self {
            height,
            width,
            block: micro_block_size,
            rows: height.div_ceil(micro_block_size),
            cols: width.div_ceil(micro_block_size),
            next: 0,
        }
    }

    /// Tiles per column of the grid.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Tiles per row of the grid.
    pub fn cols(&self) -> usize {
        self.cols
    }
}

impl Iterator for TileGrid {
    type Item = TileBounds;

    fn next(&mut self) -> Option<TileBounds> {
        if self.next >= self.rows * self.cols {
            return None;
        }
        let (ti, tj) = (self.next / self.cols, self.next % self.cols);
        self.next += 1;

        let row_start = ti * self.block;
        let col_start = tj * self.block;
        Some(TileBounds {
            row_start,
            row_end: (row_start + self.block).min(self.height),
            col_start,
            col_end: (col_start + self.block).min(self.width),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.rows * self.cols - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for TileGrid {}

/// Type of a tile's offset value, narrowed from the raster type by `bits67`.
///
/// The encoder stores the offset in the smallest type that holds it
/// exactly; `bits67` says how many steps down the ladder it went.
///
/// ```text
/// declared     bits67=0   1        2        3
/// Short        Short      Byte     Char     -
/// UShort       UShort     Byte     -        -
/// Int          Int        UShort   Short    Byte
/// UInt         UInt       UShort   Byte     -
/// Float        Float      Short    Byte     Byte
/// Double       Double     Float    Int      Short
/// Char / Byte  unchanged
/// ```
///
/// # Errors
///
/// Returns [`WireError::UnknownDataType`] where the table shows `-`.
pub fn data_type_used(bits67: u8, declared: DataType) -> Result<DataType, WireError> {
    let tc = i32::from(bits67);
    let code = declared.code();
    let narrowed = match declared {
        DataType::Short | DataType::Int => code - tc,
        DataType::UShort | DataType::UInt => code - 2 * tc,
        DataType::Float => {
            return Ok(match tc {
                0 => DataType::Float,
                1 => DataType::Short,
                _ => DataType::Byte,
            });
        }
        DataType::Double if tc == 0 => code,
        DataType::Double => code - 2 * tc + 1,
        other => return Ok(other),
    };
    if narrowed < 0 {
        return Err(WireError::UnknownDataType { code: narrowed });
    }
    DataType::from_code(narrowed)
}

/// Decodes tiles into a pixel buffer.
///
/// Borrows the header and mask for the duration of one raster decode; the
/// read position lives in the caller's [`Cursor`].
pub struct TileDecoder<'a> {
    header: &'a HeaderInfo,
    mask: &'a ValidityMask,
    width: usize,
    unstuffer: BitUnstuffer,
}

impl<'a> TileDecoder<'a> {
    pub fn new(header: &'a HeaderInfo, mask: &'a ValidityMask) -> Self {
        Self {
            header,
            mask,
            width: header.width_usize(),
            unstuffer: BitUnstuffer::new(header.version),
        }
    }

    /// Walk the whole tile grid.
    ///
    /// # Errors
    ///
    /// Propagates the first error from [`read_tile`](Self::read_tile).
    #[allow(clippy::cast_sign_loss)]
    pub fn read_tiles(&self, cursor: &mut Cursor<'_>, pixels: &mut PixelBuffer) -> Result<(), DecodeError> {
        let grid = TileGrid::new(
            self.header.height_usize(),
            self.width,
            self.header.micro_block_size as usize,
        );
        for bounds in grid {
            self.read_tile(cursor, &bounds, pixels)?;
        }
        Ok(())
    }

    /// Decode one tile at the cursor.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::TileIntegrity`] if the control byte's integrity code
    ///   does not match the tile's column.
    /// - [`DecodeError::TileValueCount`] if a bit-stuffed block has the wrong
    ///   number of values.
    /// - [`DecodeError::Wire`] for short reads, bad offset types and
    ///   bit-stuffer failures.
    pub fn read_tile(
        &self,
        cursor: &mut Cursor<'_>,
        bounds: &TileBounds,
        pixels: &mut PixelBuffer,
    ) -> Result<(), DecodeError> {
        let control = cursor.read_u8()?;
        let bits67 = control >> 6;
        let found = (control >> 2) & 0x0F;
        let expected = bounds.integrity_code();
        if found != expected {
            return Err(DecodeError::TileIntegrity {
                row_start: bounds.row_start,
                col_start: bounds.col_start,
                expected,
                found,
            });
        }

        let flag = control & 0x03;
        trace!(
            row = bounds.row_start,
            col = bounds.col_start,
            flag,
            bits67,
            "tile"
        );

        match flag {
            FLAG_ZERO => {
                for k in bounds.linear_indices(self.width) {
                    pixels.set(k, 0.0);
                }
            }
            FLAG_RAW => {
                let data_type = self.header.data_type;
                for k in self.valid_indices(bounds) {
                    let value = data_type.read_value(cursor)?;
                    pixels.set(k, value);
                }
            }
            _ => {
                let offset_type = data_type_used(bits67, self.header.data_type)?;
                let offset = offset_type.read_value(cursor)?;

                if flag == FLAG_CONSTANT {
                    for k in self.valid_indices(bounds) {
                        pixels.set(k, offset);
                    }
                } else {
                    self.read_stuffed(cursor, bounds, offset, pixels)?;
                }
            }
        }
        Ok(())
    }

    /// Bit-stuffed residuals: `z = min(offset + q * 2 * max_z_error, z_max)`.
    fn read_stuffed(
        &self,
        cursor: &mut Cursor<'_>,
        bounds: &TileBounds,
        offset: f64,
        pixels: &mut PixelBuffer,
    ) -> Result<(), DecodeError> {
        let tile_pixels = bounds.pixel_count();
        let (residuals, end) = self
            .unstuffer
            .with_max_elements(tile_pixels)
            .decode(cursor.buffer(), cursor.position())?;
        cursor.advance_to(end)?;

        let inv_scale = 2.0 * self.header.max_z_error;
        let z_max = self.header.z_max;
        let reconstruct = |q: u32| (offset + f64::from(q) * inv_scale).min(z_max);

        if residuals.len() == tile_pixels {
            for (k, q) in bounds.linear_indices(self.width).zip(residuals) {
                pixels.set(k, reconstruct(q));
            }
            return Ok(());
        }

        let valid = self.valid_indices(bounds).count();
        if residuals.len() != valid {
            return Err(DecodeError::TileValueCount {
                row_start: bounds.row_start,
                col_start: bounds.col_start,
                found: residuals.len(),
                pixels: tile_pixels,
                valid,
            });
        }
        for (k, q) in self.valid_indices(bounds).zip(residuals) {
            pixels.set(k, reconstruct(q));
        }
        Ok(())
    }

    fn valid_indices(&self, bounds: &TileBounds) -> impl Iterator<Item = usize> + '_ {
        bounds
            .linear_indices(self.width)
            .filter(move |&k| self.mask.is_valid(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lerc_wire::bit_stuffer;

    fn header(width: i32, height: i32, data_type: DataType) -> HeaderInfo {
        HeaderInfo {
            version: 3,
            checksum: 0,
            height,
            width,
            num_valid_pixel: width * height,
            micro_block_size: 8,
            blob_size: 62,
            data_type,
            max_z_error: 0.5,
            z_min: 0.0,
            z_max: 1000.0,
        }
    }

    fn whole(header: &HeaderInfo) -> TileBounds {
        TileBounds {
            row_start: 0,
            row_end: header.height_usize(),
            col_start: 0,
            col_end: header.width_usize(),
        }
    }

    fn decode_one(header: &HeaderInfo, mask: &ValidityMask, bytes: &[u8]) -> (PixelBuffer, usize) {
        let mut pixels = PixelBuffer::zeroed(header.data_type, header.pixel_count());
        let mut cursor = Cursor::new(bytes);
        TileDecoder::new(header, mask)
            .read_tile(&mut cursor, &whole(header), &mut pixels)
            .unwrap();
        (pixels, cursor.position())
    }

    fn values(pixels: &PixelBuffer) -> Vec<f64> {
        (0..pixels.len()).map(|k| pixels.get(k).unwrap()).collect()
    }

    #[test]
    fn grid_clips_last_row_and_column() {
        let tiles: Vec<_> = TileGrid::new(10, 17, 8).collect();
        assert_eq!(tiles.len(), 6);
        assert_eq!(
            tiles[2],
            TileBounds {
                row_start: 0,
                row_end: 8,
                col_start: 16,
                col_end: 17
            }
        );
        assert_eq!(
            tiles[5],
            TileBounds {
                row_start: 8,
                row_end: 10,
                col_start: 16,
                col_end: 17
            }
        );
        let covered: usize = tiles.iter().map(TileBounds::pixel_count).sum();
        assert_eq!(covered, 170);
    }

    #[test]
    fn grid_reports_exact_size() {
        let grid = TileGrid::new(256, 256, 8);
        assert_eq!(grid.rows(), 32);
        assert_eq!(grid.cols(), 32);
        assert_eq!(grid.len(), 1024);
    }

    #[test]
    fn linear_indices_follow_raster_rows() {
        let bounds = TileBounds {
            row_start: 1,
            row_end: 3,
            col_start: 2,
            col_end: 4,
        };
        let ks: Vec<_> = bounds.linear_indices(5).collect();
        assert_eq!(ks, vec![7, 8, 12, 13]);
    }

    #[test]
    fn integrity_code_wraps_every_128_columns() {
        let at = |col_start| TileBounds {
            row_start: 0,
            row_end: 1,
            col_start,
            col_end: col_start + 1,
        };
        assert_eq!(at(0).integrity_code(), 0);
        assert_eq!(at(8).integrity_code(), 1);
        assert_eq!(at(120).integrity_code(), 15);
        assert_eq!(at(128).integrity_code(), 0);
    }

    #[test]
    fn offset_type_ladder() {
        use DataType::*;
        let cases = [
            (Short, 1, Byte),
            (Short, 2, Char),
            (UShort, 1, Byte),
            (Int, 1, UShort),
            (Int, 2, Short),
            (Int, 3, Byte),
            (UInt, 1, UShort),
            (UInt, 2, Byte),
            (Float, 0, Float),
            (Float, 1, Short),
            (Float, 2, Byte),
            (Double, 0, Double),
            (Double, 1, Float),
            (Double, 2, Int),
            (Double, 3, Short),
            (Byte, 3, Byte),
            (Char, 2, Char),
        ];
        for (declared, bits67, expected) in cases {
            assert_eq!(
                data_type_used(bits67, declared).unwrap(),
                expected,
                "{declared} bits67={bits67}"
            );
        }
        assert!(matches!(
            data_type_used(3, Short),
            Err(WireError::UnknownDataType { code: -1 })
        ));
        assert!(matches!(
            data_type_used(3, UInt),
            Err(WireError::UnknownDataType { code: -1 })
        ));
    }

    #[test]
    fn zero_tile_consumes_only_control_byte() {
        let h = header(3, 2, DataType::Int);
        let (pixels, used) = decode_one(&h, &ValidityMask::AllValid, &[FLAG_ZERO, 0xFF]);
        assert_eq!(used, 1);
        assert!(values(&pixels).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn raw_tile_reads_declared_type() {
        let h = header(2, 2, DataType::UShort);
        let mut bytes = vec![FLAG_RAW];
        for v in [1u16, 65535, 300, 7] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let (pixels, used) = decode_one(&h, &ValidityMask::AllValid, &bytes);
        assert_eq!(used, 9);
        assert_eq!(values(&pixels), vec![1.0, 65535.0, 300.0, 7.0]);
    }

    #[test]
    fn raw_tile_skips_invalid_pixels() {
        let h = header(2, 2, DataType::Float);
        let mask = ValidityMask::Bits(crate::mask::BitMask::from_bytes(vec![0b1001_0000]));
        let mut bytes = vec![FLAG_RAW];
        bytes.extend_from_slice(&1.5f32.to_le_bytes());
        bytes.extend_from_slice(&(-2.25f32).to_le_bytes());
        let (pixels, used) = decode_one(&h, &mask, &bytes);
        assert_eq!(used, 9);
        assert_eq!(values(&pixels), vec![1.5, 0.0, 0.0, -2.25]);
    }

    #[test]
    fn constant_tile_uses_narrowed_offset() {
        // Int raster, bits67 = 2 → offset stored as Short.
        let h = header(3, 1, DataType::Int);
        let mut bytes = vec![(2 << 6) | FLAG_CONSTANT];
        bytes.extend_from_slice(&(-1234i16).to_le_bytes());
        let (pixels, used) = decode_one(&h, &ValidityMask::AllValid, &bytes);
        assert_eq!(used, 3);
        assert_eq!(values(&pixels), vec![-1234.0; 3]);
    }

    #[test]
    fn stuffed_tile_reconstructs_and_clamps() {
        let mut h = header(4, 1, DataType::Float);
        h.max_z_error = 0.25;
        h.z_max = 11.0;
        let mut bytes = vec![1u8];
        bytes.extend_from_slice(&10.0f32.to_le_bytes());
        bytes.extend_from_slice(&bit_stuffer::encode(&[0, 1, 2, 9]));

        let (pixels, used) = decode_one(&h, &ValidityMask::AllValid, &bytes);
        assert_eq!(used, bytes.len());
        // 10 + q * 0.5, clamped at z_max = 11
        assert_eq!(values(&pixels), vec![10.0, 10.5, 11.0, 11.0]);
    }

    #[test]
    fn stuffed_tile_with_partial_mask() {
        let h = header(4, 1, DataType::Int);
        let mask = ValidityMask::Bits(crate::mask::BitMask::from_bytes(vec![0b0110_0000]));
        let mut bytes = vec![1u8];
        bytes.extend_from_slice(&100i32.to_le_bytes());
        bytes.extend_from_slice(&bit_stuffer::encode(&[3, 5]));

        let (pixels, _) = decode_one(&h, &mask, &bytes);
        assert_eq!(values(&pixels), vec![0.0, 103.0, 105.0, 0.0]);
    }

    #[test]
    fn stuffed_tile_with_full_count_ignores_mask() {
        let h = header(4, 1, DataType::Int);
        let mask = ValidityMask::Bits(crate::mask::BitMask::from_bytes(vec![0b0110_0000]));
        let mut bytes = vec![1u8];
        bytes.extend_from_slice(&100i32.to_le_bytes());
        bytes.extend_from_slice(&bit_stuffer::encode(&[1, 3, 5, 7]));

        let (pixels, _) = decode_one(&h, &mask, &bytes);
        assert_eq!(values(&pixels), vec![101.0, 103.0, 105.0, 107.0]);
    }

    #[test]
    fn stuffed_tile_with_wrong_count() {
        let h = header(4, 1, DataType::Int);
        let mut bytes = vec![1u8];
        bytes.extend_from_slice(&0i32.to_le_bytes());
        bytes.extend_from_slice(&bit_stuffer::encode(&[1, 2, 3]));

        let mut pixels = PixelBuffer::zeroed(h.data_type, h.pixel_count());
        let mut cursor = Cursor::new(&bytes);
        let mask = ValidityMask::AllValid;
        let err = TileDecoder::new(&h, &mask)
            .read_tile(&mut cursor, &whole(&h), &mut pixels)
            .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TileValueCount {
                found: 3,
                pixels: 4,
                valid: 4,
                ..
            }
        ));
    }

    #[test]
    fn integrity_mismatch_is_fatal() {
        let h = header(16, 1, DataType::Byte);
        let bounds = TileBounds {
            row_start: 0,
            row_end: 1,
            col_start: 8,
            col_end: 16,
        };
        let mut pixels = PixelBuffer::zeroed(h.data_type, h.pixel_count());
        let bytes = [FLAG_ZERO];
        let mut cursor = Cursor::new(&bytes);
        let mask = ValidityMask::AllValid;
        let err = TileDecoder::new(&h, &mask)
            .read_tile(&mut cursor, &bounds, &mut pixels)
            .unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TileIntegrity {
                col_start: 8,
                expected: 1,
                found: 0,
                ..
            }
        ));
    }

    proptest::proptest! {
        #[test]
        fn grid_covers_every_pixel_once(
            height in 1usize..70,
            width in 1usize..70,
            block in 1usize..20,
        ) {
            let mut hits = vec![0u8; height * width];
            for bounds in TileGrid::new(height, width, block) {
                proptest::prop_assert!(bounds.row_end - bounds.row_start <= block);
                proptest::prop_assert!(bounds.col_end - bounds.col_start <= block);
                for k in bounds.linear_indices(width) {
                    hits[k] += 1;
                }
            }
            proptest::prop_assert!(hits.iter().all(|&h| h == 1));
        }
    }
}
