use std::fmt;

use crate::cursor::Cursor;
use crate::data_type::DataType;
use crate::error::WireError;

/// File identifier: ASCII `"Lerc2 "` (note the trailing space).
pub const LERC2_MAGIC: [u8; 6] = *b"Lerc2 ";

/// Total header size in bytes (fixed for versions 1 through 3).
pub const HEADER_SIZE: usize = 62;

/// Bytes excluded from the checksum: the magic plus version and checksum fields.
pub const CHECKSUM_START: usize = LERC2_MAGIC.len() + 8;

/// Oldest format version this reader accepts.
pub const MIN_VERSION: i32 = 1;

/// Newest format version this reader accepts. Version 4 adds fields that
/// shift the layout below.
pub const MAX_VERSION: i32 = 3;

/// LERC2 blob header: the first 62 bytes of every blob.
///
/// ```text
/// ┌────────┬─────────┬──────────────────────────────────┐
/// │ Offset │ Size    │ Description                      │
/// ├────────┼─────────┼──────────────────────────────────┤
/// │ 0x00   │ 6 bytes │ Magic: "Lerc2 "                  │
/// │ 0x06   │ i32     │ Version                          │
/// │ 0x0A   │ u32     │ Fletcher-32 checksum             │
/// │ 0x0E   │ i32     │ Height (rows)                    │
/// │ 0x12   │ i32     │ Width (columns)                  │
/// │ 0x16   │ i32     │ Number of valid pixels           │
/// │ 0x1A   │ i32     │ Micro-block (tile) size          │
/// │ 0x1E   │ i32     │ Blob size in bytes, header incl. │
/// │ 0x22   │ i32     │ Data type code                   │
/// │ 0x26   │ f64     │ Max Z error                      │
/// │ 0x2E   │ f64     │ Z min                            │
/// │ 0x36   │ f64     │ Z max                            │
/// └────────┴─────────┴──────────────────────────────────┘
/// ```
///
/// All fields are little-endian. A parsed header always satisfies
/// `0 <= num_valid_pixel <= width * height` and `micro_block_size > 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeaderInfo {
    pub version: i32,
    pub checksum: u32,
    pub height: i32,
    pub width: i32,
    pub num_valid_pixel: i32,
    pub micro_block_size: i32,
    pub blob_size: i32,
    pub data_type: DataType,
    pub max_z_error: f64,
    pub z_min: f64,
    pub z_max: f64,
}

impl HeaderInfo {
    /// Parse and validate a header from the front of `buf`.
    ///
    /// # Errors
    ///
    /// - [`WireError::UnexpectedEof`] if `buf` is shorter than [`HEADER_SIZE`].
    /// - [`WireError::BadMagic`] if the first six bytes are not `"Lerc2 "`.
    /// - [`WireError::UnsupportedVersion`] outside `1..=3`.
    /// - [`WireError::UnknownDataType`] for a data type code outside `0..=7`.
    /// - [`WireError::InvalidHeaderField`] for any other broken invariant.
    pub fn read_from(buf: &[u8]) -> Result<Self, WireError> {
        let mut cursor = Cursor::new(buf);
        Self::read(&mut cursor)
    }

    /// Parse a header at the cursor and advance it by [`HEADER_SIZE`].
    ///
    /// # Errors
    ///
    /// Same as [`read_from`](Self::read_from).
    pub fn read(cursor: &mut Cursor<'_>) -> Result<Self, WireError> {
        if cursor.remaining() < HEADER_SIZE {
            return Err(WireError::UnexpectedEof {
                offset: cursor.position(),
                needed: HEADER_SIZE - cursor.remaining(),
            });
        }

        let magic: [u8; 6] = cursor.read_array()?;
        if magic != LERC2_MAGIC {
            return Err(WireError::BadMagic { found: magic });
        }

        let version = cursor.read_i32_le()?;
        let checksum = cursor.read_u32_le()?;
        let height = cursor.read_i32_le()?;
        let width = cursor.read_i32_le()?;
        let num_valid_pixel = cursor.read_i32_le()?;
        let micro_block_size = cursor.read_i32_le()?;
        let blob_size = cursor.read_i32_le()?;
        let data_type_code = cursor.read_i32_le()?;
        let max_z_error = cursor.read_f64_le()?;
        let z_min = cursor.read_f64_le()?;
        let z_max = cursor.read_f64_le()?;

        if !(MIN_VERSION..=MAX_VERSION).contains(&version) {
            return Err(WireError::UnsupportedVersion { version });
        }

        let data_type = DataType::from_code(data_type_code)?;
        if !data_type.is_concrete() {
            return Err(WireError::UnknownDataType {
                code: data_type_code,
            });
        }

        let header = Self {
            version,
            checksum,
            height,
            width,
            num_valid_pixel,
            micro_block_size,
            blob_size,
            data_type,
            max_z_error,
            z_min,
            z_max,
        };
        header.validate()?;
        Ok(header)
    }

    /// Check the structural invariants of the numeric fields.
    fn validate(&self) -> Result<(), WireError> {
        let invalid = |field, value: i32| WireError::InvalidHeaderField {
            field,
            value: i64::from(value),
        };

        if self.height <= 0 {
            return Err(invalid("height", self.height));
        }
        if self.width <= 0 {
            return Err(invalid("width", self.width));
        }
        if self.num_valid_pixel < 0 || i64::from(self.num_valid_pixel) > self.pixel_count_i64() {
            return Err(invalid("num_valid_pixel", self.num_valid_pixel));
        }
        if self.micro_block_size <= 0 {
            return Err(invalid("micro_block_size", self.micro_block_size));
        }
        if usize::try_from(self.blob_size).map_or(true, |size| size < HEADER_SIZE) {
            return Err(invalid("blob_size", self.blob_size));
        }
        Ok(())
    }

    /// Write the 62-byte header into the front of `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedEof`] if `buf` is shorter than
    /// [`HEADER_SIZE`].
    pub fn write_to(&self, buf: &mut [u8]) -> Result<(), WireError> {
        if buf.len() < HEADER_SIZE {
            return Err(WireError::UnexpectedEof {
                offset: buf.len(),
                needed: HEADER_SIZE - buf.len(),
            });
        }

        buf[0..6].copy_from_slice(&LERC2_MAGIC);
        buf[6..10].copy_from_slice(&self.version.to_le_bytes());
        buf[10..14].copy_from_slice(&self.checksum.to_le_bytes());
        buf[14..18].copy_from_slice(&self.height.to_le_bytes());
        buf[18..22].copy_from_slice(&self.width.to_le_bytes());
        buf[22..26].copy_from_slice(&self.num_valid_pixel.to_le_bytes());
        buf[26..30].copy_from_slice(&self.micro_block_size.to_le_bytes());
        buf[30..34].copy_from_slice(&self.blob_size.to_le_bytes());
        buf[34..38].copy_from_slice(&self.data_type.code().to_le_bytes());
        buf[38..46].copy_from_slice(&self.max_z_error.to_le_bytes());
        buf[46..54].copy_from_slice(&self.z_min.to_le_bytes());
        buf[54..62].copy_from_slice(&self.z_max.to_le_bytes());

        Ok(())
    }

    fn pixel_count_i64(&self) -> i64 {
        i64::from(self.width) * i64::from(self.height)
    }

    /// Total pixels, `width * height`. Only meaningful on a validated header.
    #[allow(clippy::cast_sign_loss)]
    pub fn pixel_count(&self) -> usize {
        self.pixel_count_i64() as usize
    }

    /// Width as `usize`. Only meaningful on a validated header.
    #[allow(clippy::cast_sign_loss)]
    pub fn width_usize(&self) -> usize {
        self.width as usize
    }

    /// Height as `usize`. Only meaningful on a validated header.
    #[allow(clippy::cast_sign_loss)]
    pub fn height_usize(&self) -> usize {
        self.height as usize
    }

    /// Blob size as `usize`. Only meaningful on a validated header.
    #[allow(clippy::cast_sign_loss)]
    pub fn blob_size_usize(&self) -> usize {
        self.blob_size as usize
    }

    /// Every pixel is valid; no mask payload follows the mask size field.
    pub fn all_valid(&self) -> bool {
        i64::from(self.num_valid_pixel) == self.pixel_count_i64()
    }

    /// No pixel is valid; the raster decodes to zeros.
    pub fn all_invalid(&self) -> bool {
        self.num_valid_pixel == 0
    }

    /// Every valid pixel holds the same value (`z_min`).
    #[allow(clippy::float_cmp)]
    pub fn is_constant(&self) -> bool {
        self.z_min == self.z_max
    }

    /// Byte and char rasters at `max_z_error == 0.5` may carry a Huffman
    /// flag byte ahead of the tiles.
    #[allow(clippy::float_cmp)]
    pub fn tries_huffman(&self) -> bool {
        self.version > 1
            && matches!(self.data_type, DataType::Byte | DataType::Char)
            && self.max_z_error == 0.5
    }
}

impl fmt::Display for HeaderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Lerc2 v{} {} {}x{} valid={} mb={} blob={} maxZError={} z=[{}, {}]",
            self.version,
            self.data_type,
            self.width,
            self.height,
            self.num_valid_pixel,
            self.micro_block_size,
            self.blob_size,
            self.max_z_error,
            self.z_min,
            self.z_max,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HeaderInfo {
        HeaderInfo {
            version: 3,
            checksum: 0xDEAD_BEEF,
            height: 3,
            width: 4,
            num_valid_pixel: 12,
            micro_block_size: 8,
            blob_size: 100,
            data_type: DataType::Float,
            max_z_error: 0.5,
            z_min: -1.0,
            z_max: 9.25,
        }
    }

    fn encoded(header: &HeaderInfo) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        header.write_to(&mut buf).unwrap();
        buf
    }

    #[test]
    fn parse_written_header() {
        let header = sample();
        let buf = encoded(&header);
        assert_eq!(&buf[0..6], b"Lerc2 ");
        assert_eq!(HeaderInfo::read_from(&buf).unwrap(), header);
    }

    #[test]
    fn fields_sit_at_fixed_offsets() {
        let buf = encoded(&sample());
        assert_eq!(i32::from_le_bytes(buf[6..10].try_into().unwrap()), 3);
        assert_eq!(u32::from_le_bytes(buf[10..14].try_into().unwrap()), 0xDEAD_BEEF);
        assert_eq!(i32::from_le_bytes(buf[18..22].try_into().unwrap()), 4);
        assert_eq!(i32::from_le_bytes(buf[34..38].try_into().unwrap()), 6);
        assert_eq!(f64::from_le_bytes(buf[54..62].try_into().unwrap()), 9.25);
    }

    #[test]
    fn read_advances_cursor_by_header_size() {
        let mut buf = encoded(&sample()).to_vec();
        buf.extend_from_slice(&[1, 2, 3]);
        let mut cursor = Cursor::new(&buf);
        HeaderInfo::read(&mut cursor).unwrap();
        assert_eq!(cursor.position(), HEADER_SIZE);
    }

    #[test]
    fn reject_bad_magic() {
        let mut buf = encoded(&sample());
        buf[0..6].copy_from_slice(b"Lerc1 ");
        assert!(matches!(
            HeaderInfo::read_from(&buf),
            Err(WireError::BadMagic { found }) if &found == b"Lerc1 "
        ));
    }

    #[test]
    fn reject_negative_valid_pixel_count() {
        let mut buf = encoded(&sample());
        buf[22..26].copy_from_slice(&(-1i32).to_le_bytes());
        assert!(matches!(
            HeaderInfo::read_from(&buf),
            Err(WireError::InvalidHeaderField {
                field: "num_valid_pixel",
                value: -1
            })
        ));
    }

    #[test]
    fn reject_valid_pixel_count_above_pixel_count() {
        let mut header = sample();
        header.num_valid_pixel = 13;
        let buf = encoded(&header);
        assert!(matches!(
            HeaderInfo::read_from(&buf),
            Err(WireError::InvalidHeaderField {
                field: "num_valid_pixel",
                ..
            })
        ));
    }

    #[test]
    fn reject_zero_micro_block_size() {
        let mut header = sample();
        header.micro_block_size = 0;
        let buf = encoded(&header);
        assert!(matches!(
            HeaderInfo::read_from(&buf),
            Err(WireError::InvalidHeaderField {
                field: "micro_block_size",
                value: 0
            })
        ));
    }

    #[test]
    fn reject_unsupported_versions() {
        for version in [0, 4, -7] {
            let mut header = sample();
            header.version = version;
            let buf = encoded(&header);
            assert!(matches!(
                HeaderInfo::read_from(&buf),
                Err(WireError::UnsupportedVersion { version: v }) if v == version
            ));
        }
    }

    #[test]
    fn reject_undefined_data_type() {
        let mut buf = encoded(&sample());
        buf[34..38].copy_from_slice(&8i32.to_le_bytes());
        assert!(matches!(
            HeaderInfo::read_from(&buf),
            Err(WireError::UnknownDataType { code: 8 })
        ));
    }

    #[test]
    fn reject_blob_size_smaller_than_header() {
        let mut header = sample();
        header.blob_size = 61;
        let buf = encoded(&header);
        assert!(matches!(
            HeaderInfo::read_from(&buf),
            Err(WireError::InvalidHeaderField {
                field: "blob_size",
                value: 61
            })
        ));
    }

    #[test]
    fn reject_buffer_too_short() {
        let buf = encoded(&sample());
        assert!(matches!(
            HeaderInfo::read_from(&buf[..40]),
            Err(WireError::UnexpectedEof {
                offset: 0,
                needed: 22
            })
        ));
    }

    #[test]
    fn degenerate_mask_predicates() {
        let mut header = sample();
        assert!(header.all_valid());
        assert!(!header.all_invalid());
        header.num_valid_pixel = 0;
        assert!(header.all_invalid());
        assert!(!header.all_valid());
    }

    #[test]
    fn huffman_candidates() {
        let mut header = sample();
        assert!(!header.tries_huffman());
        header.data_type = DataType::Byte;
        assert!(header.tries_huffman());
        header.version = 1;
        assert!(!header.tries_huffman());
    }
}
