//! Per-pixel validity.
//!
//! The mask section is an `i32` byte count followed by that many bytes of
//! RLE-compressed bitmask. When every pixel is valid, or none is, the count
//! must be zero and nothing follows.
//!
//! RLE stream:
//!
//! ```text
//! ┌───────────┬──────────────────────────────────────────────┐
//! │ i16 count │ meaning                                      │
//! ├───────────┼──────────────────────────────────────────────┤
//! │ > 0       │ copy the next `count` bytes literally        │
//! │ <= 0      │ repeat the next byte `-count` times          │
//! │ -32768    │ end of stream                                │
//! └───────────┴──────────────────────────────────────────────┘
//! ```
//!
//! Bits are MSB-first: pixel `k` lives in byte `k >> 3` under `0x80 >> (k & 7)`.

use lerc_wire::{Cursor, HeaderInfo};
use tracing::debug;

use crate::error::DecodeError;

const RLE_END: i16 = i16::MIN;

/// Expanded bitmask, one bit per pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitMask {
    bits: Vec<u8>,
}

impl BitMask {
    /// Bytes needed for `pixel_count` bits.
    pub fn byte_len(pixel_count: usize) -> usize {
        pixel_count.div_ceil(8)
    }

    /// Wrap already-expanded mask bytes.
    pub fn from_bytes(bits: Vec<u8>) -> Self {
        Self { bits }
    }

    pub fn is_valid(&self, k: usize) -> bool {
        self.bits
            .get(k >> 3)
            .is_some_and(|byte| byte & (0x80 >> (k & 7)) != 0)
    }
}

/// Which pixels carry data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidityMask {
    AllValid,
    AllInvalid,
    Bits(BitMask),
}

impl ValidityMask {
    pub fn is_valid(&self, k: usize) -> bool {
        match self {
            Self::AllValid => true,
            Self::AllInvalid => false,
            Self::Bits(mask) => mask.is_valid(k),
        }
    }}

/// Read the mask section at the cursor.
///
/// # Errors
///
/// - [`DecodeError::MaskInconsistent`] if the byte count is negative, is
///   non-zero for an all-valid or all-invalid raster, or is zero for a
///   partially valid one.
/// - [`DecodeError::MaskRle`] if the RLE payload is malformed.
/// - [`DecodeError::Wire`] if the section runs past the input.
pub fn read_mask(cursor: &mut Cursor<'_>, header: &HeaderInfo) -> Result<ValidityMask, DecodeError> {
    let num_bytes_mask = cursor.read_i32_le()?;
    let pixel_count = header.pixel_count();

    let inconsistent = || DecodeError::MaskInconsistent {
        num_bytes_mask,
        num_valid_pixel: header.num_valid_pixel,
        pixel_count,
    };

    if header.all_invalid() || header.all_valid() {
        if num_bytes_mask != 0 {
            return Err(inconsistent());
        }
        return Ok(if header.all_invalid() {
            ValidityMask::AllInvalid
        } else {
            ValidityMask::AllValid
        });
    }

    let num_bytes = usize::try_from(num_bytes_mask).map_err(|_| inconsistent())?;
    if num_bytes == 0 {
        return Err(inconsistent());
    }

    let payload_offset = cursor.position();
    let payload = cursor.take(num_bytes)?;
    let mut bits = vec![0u8; BitMask::byte_len(pixel_count)];
    rle_decompress(payload, &mut bits).map_err(|(pos, reason)| DecodeError::MaskRle {
        offset: payload_offset + pos,
        reason,
    })?;

    debug!(num_bytes, pixel_count, "expanded RLE validity mask");
    Ok(ValidityMask::Bits(BitMask::from_bytes(bits)))
}

/// Expand an RLE stream into `out`.
///
/// On failure returns the offset within `data` and a short reason.
pub fn rle_decompress(data: &[u8], out: &mut [u8]) -> Result<(), (usize, &'static str)> {
    let mut src = 0;
    let mut dst = 0;

    loop {
        let Some(raw) = data.get(src..src + 2) else {
            return Err((src, "missing run count"));
        };
        let count = i16::from_le_bytes([raw[0], raw[1]]);
        let count_offset = src;
        src += 2;

        if count == RLE_END {
            return Ok(());
        }

        let run = usize::from(count.unsigned_abs());
        if dst + run > out.len() {
            return Err((count_offset, "run overflows mask"));
        }

        if count > 0 {
            let Some(literal) = data.get(src..src + run) else {
                return Err((src, "literal run past end of input"));
            };
            out[dst..dst + run].copy_from_slice(literal);
            src += run;
        } else {
            let Some(&byte) = data.get(src) else {
                return Err((src, "repeat run past end of input"));
            };
            out[dst..dst + run].fill(byte);
            src += 1;
        }
        dst += run;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lerc_wire::DataType;

    fn header(width: i32, height: i32, num_valid_pixel: i32) -> HeaderInfo {
        HeaderInfo {
            version: 3,
            checksum: 0,
            height,
            width,
            num_valid_pixel,
            micro_block_size: 8,
            blob_size: 62,
            data_type: DataType::Float,
            max_z_error: 0.0,
            z_min: 0.0,
            z_max: 1.0,
        }
    }

    fn section(num_bytes_mask: i32, payload: &[u8]) -> Vec<u8> {
        let mut buf = num_bytes_mask.to_le_bytes().to_vec();
        buf.extend_from_slice(payload);
        buf
    }

    #[test]
    fn rle_literal_and_repeat_runs() {
        let data = [
            0x02, 0x00, // literal ×2
            0x11, 0x22, //
            0xFD, 0xFF, // repeat ×3
            0x33, //
            0x00, 0x80, // end
        ];
        let mut out = [0u8; 5];
        rle_decompress(&data, &mut out).unwrap();
        assert_eq!(out, [0x11, 0x22, 0x33, 0x33, 0x33]);
    }

    #[test]
    fn rle_zero_count_repeats_nothing() {
        let data = [0x00, 0x00, 0xAA, 0x00, 0x80];
        let mut out = [0u8; 0];
        rle_decompress(&data, &mut out).unwrap();
    }

    #[test]
    fn rle_errors() {
        let mut out = [0u8; 3];
        assert_eq!(
            rle_decompress(&[0x03, 0x00, 0xAA], &mut out),
            Err((2, "literal run past end of input"))
        );
        assert_eq!(
            rle_decompress(&[0xFC, 0xFF, 0xAA, 0x00, 0x80], &mut out),
            Err((0, "run overflows mask"))
        );
        assert_eq!(
            rle_decompress(&[0xFF, 0xFF], &mut out),
            Err((2, "repeat run past end of input"))
        );
        assert_eq!(rle_decompress(&[0x01, 0x00, 0x07], &mut out), Err((3, "missing run count")));
    }

    #[test]
    fn degenerate_masks_consume_only_the_count() {
        let buf = section(0, &[0xEE]);

        let mut cursor = Cursor::new(&buf);
        let mask = read_mask(&mut cursor, &header(4, 2, 8)).unwrap();
        assert_eq!(mask, ValidityMask::AllValid);
        assert_eq!(cursor.position(), 4);

        let mut cursor = Cursor::new(&buf);
        let mask = read_mask(&mut cursor, &header(4, 2, 0)).unwrap();
        assert_eq!(mask, ValidityMask::AllInvalid);
        assert_eq!(cursor.position(), 4);
    }

    #[test]
    fn degenerate_mask_with_payload_is_inconsistent() {
        let buf = section(3, &[0, 0, 0]);
        for valid in [0, 8] {
            let mut cursor = Cursor::new(&buf);
            assert!(matches!(
                read_mask(&mut cursor, &header(4, 2, valid)),
                Err(DecodeError::MaskInconsistent { num_bytes_mask: 3, .. })
            ));
        }
    }

    #[test]
    fn partial_mask_requires_payload() {
        let buf = section(0, &[]);
        let mut cursor = Cursor::new(&buf);
        assert!(matches!(
            read_mask(&mut cursor, &header(4, 2, 5)),
            Err(DecodeError::MaskInconsistent { num_bytes_mask: 0, .. })
        ));

        let buf = section(-4, &[]);
        let mut cursor = Cursor::new(&buf);
        assert!(matches!(
            read_mask(&mut cursor, &header(4, 2, 5)),
            Err(DecodeError::MaskInconsistent { num_bytes_mask: -4, .. })
        ));
    }

    #[test]
    fn partial_mask_expands_msb_first() {
        // 4x3 raster = 12 bits = 2 bytes: 0b1010_0000, 0b1111_0000
        let rle = [0x02, 0x00, 0b1010_0000, 0b1111_0000, 0x00, 0x80];
        let mut buf = section(6, &rle);
        buf.push(0x99);

        let mut cursor = Cursor::new(&buf);
        let mask = read_mask(&mut cursor, &header(4, 3, 6)).unwrap();
        assert_eq!(cursor.position(), 10);

        let valid: Vec<usize> = (0..12).filter(|&k| mask.is_valid(k)).collect();
        assert_eq!(valid, vec![0, 2, 8, 9, 10, 11]);
        assert!(matches!(mask, ValidityMask::Bits(_)), "expected bitmask, got {mask:?}");
    }

    #[test]
    fn corrupt_rle_reports_absolute_offset() {
        let rle = [0x05, 0x00, 0xFF, 0x00, 0x80];
        let buf = section(5, &rle);
        let mut cursor = Cursor::new(&buf);
        assert!(matches!(
            read_mask(&mut cursor, &header(4, 2, 5)),
            Err(DecodeError::MaskRle { offset: 4, reason: "run overflows mask" })
        ));
    }
}
