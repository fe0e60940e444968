use lerc_wire::header::{CHECKSUM_START, HEADER_SIZE};
use lerc_wire::{Cursor, DataType, HeaderInfo, checksum};
use tracing::debug;

use crate::config::DecodeOptions;
use crate::error::{DecodeError, UnsupportedFeature};
use crate::mask::{ValidityMask, read_mask};
use crate::pixel::PixelBuffer;
use crate::tile::TileDecoder;

/// Image encode mode byte ahead of the tiles. Values above
/// `IMAGE_ENCODE_HUFFMAN` are invalid for versions up to 3.
const IMAGE_ENCODE_TILES: u8 = 0;
const IMAGE_ENCODE_HUFFMAN: u8 = 1;

/// The result of decoding one LERC2 blob.
///
/// ```text
/// ┌───────────────────────────────────────────────────────────┐
/// │ DecodedRaster                                             │
/// │   header:         HeaderInfo    ← dimensions, type, range │
/// │   mask:           ValidityMask  ← which pixels hold data  │
/// │   pixels:         PixelBuffer   ← row-major, LE, zeroed   │
/// │   bytes_consumed: usize         ← offset from blob start  │
/// └───────────────────────────────────────────────────────────┘
/// ```
#[derive(Clone, Debug)]
pub struct DecodedRaster {
    /// The validated header.
    pub header: HeaderInfo,

    /// Validity of each pixel.
    ///
    /// Invalid pixels are left at 0 in `pixels`, except inside a
    /// bit-stuffed tile that stores a value for every pixel of its block;
    /// those carry the stored value whatever the mask says.
    pub mask: ValidityMask,

    /// Decoded values at the declared data type.
    pub pixels: PixelBuffer,

    /// Bytes read from the start of the blob.
    ///
    /// Usually smaller than `header.blob_size`; callers walking
    /// concatenated planes should advance by `blob_size`.
    pub bytes_consumed: usize,
}

impl DecodedRaster {
    pub fn width(&self) -> usize {
        self.header.width_usize()
    }

    pub fn height(&self) -> usize {
        self.header.height_usize()
    }

    pub fn data_type(&self) -> DataType {
        self.header.data_type
    }

    pub fn z_min(&self) -> f64 {
        self.header.z_min
    }

    pub fn z_max(&self) -> f64 {
        self.header.z_max
    }

    /// Little-endian pixel bytes, `width * height * data_type.wire_width()` long.
    pub fn pixel_data(&self) -> &[u8] {
        self.pixels.as_bytes()
    }

    /// Value at (`row`, `col`) widened to `f64`, or `None` outside the raster.
    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        if row >= self.height() || col >= self.width() {
            return None;
        }
        self.pixels.get(row * self.width() + col)
    }

    /// Whether the pixel at linear index `k` holds data.
    pub fn is_valid(&self, k: usize) -> bool {
        k < self.header.pixel_count() && self.mask.is_valid(k)
    }

    /// Number of valid pixels, as declared by the header.
    #[allow(clippy::cast_sign_loss)]
    pub fn valid_count(&self) -> usize {
        self.header.num_valid_pixel as usize
    }

    pub fn into_pixel_data(self) -> Vec<u8> {
        self.pixels.into_bytes()
    }
}

/// Synchronous LERC2 decoder for a complete in-memory blob.
///
/// Decoding is a single linear pass over the blob:
///
///   1. **Header**: parse and validate the 62-byte header.
///   2. **Bounds**: `blob_size` must fit in the input; the checksum is
///      compared when [`DecodeOptions::verify_checksum`] is set; the raster
///      must not exceed [`DecodeOptions::max_pixels`].
///   3. **Mask**: read the mask size and, for partially valid rasters, the
///      RLE bitmask.
///   4. **Pixels**: one of
///      - nothing (no valid pixels),
///      - a constant fill when `z_min == z_max`,
///      - one-sweep raw values for every valid pixel,
///      - the tile grid, optionally preceded by a Huffman flag byte.
///
/// # Example
///
/// ```rust,no_run
/// use lerc_decoder::{DecodeOptions, LercDecoder};
///
/// let blob = std::fs::read("dem.lerc2").unwrap();
/// let raster = LercDecoder::decode_with_options(
///     &blob,
///     &DecodeOptions::default().with_checksum(true),
/// )
/// .unwrap();
/// println!("{}x{} {}", raster.width(), raster.height(), raster.data_type());
/// ```
pub struct LercDecoder;

impl LercDecoder {
    /// Decode the blob at the start of `bytes` with default options.
    ///
    /// # Errors
    ///
    /// See [`decode_with_options`](Self::decode_with_options).
    pub fn decode(bytes: &[u8]) -> Result<DecodedRaster, DecodeError> {
        Self::decode_with_options(bytes, &DecodeOptions::default())
    }

    /// Decode the blob at `options.start_offset` in `bytes`.
    ///
    /// # Errors
    ///
    /// - [`DecodeError::InvalidHeader`] if the header fails to parse or validate.
    /// - [`DecodeError::Truncated`] if `blob_size` exceeds the bytes available.
    /// - [`DecodeError::ChecksumMismatch`] if verification is on and fails.
    /// - [`DecodeError::RasterTooLarge`] if the raster exceeds `max_pixels`.
    /// - [`DecodeError::MaskInconsistent`] / [`DecodeError::MaskRle`] for a
    ///   bad mask section.
    /// - [`DecodeError::TileIntegrity`] / [`DecodeError::TileValueCount`]
    ///   for a corrupt tile.
    /// - [`DecodeError::InvalidHuffmanFlag`] / [`DecodeError::Unsupported`]
    ///   for Huffman-coded byte rasters.
    /// - [`DecodeError::Wire`] for reads past the end of the input.
    pub fn decode_with_options(
        bytes: &[u8],
        options: &DecodeOptions,
    ) -> Result<DecodedRaster, DecodeError> {
        let blob = bytes.get(options.start_offset..).unwrap_or_default();
        let header = HeaderInfo::read_from(blob).map_err(DecodeError::InvalidHeader)?;
        debug!(
            version = header.version,
            width = header.width,
            height = header.height,
            data_type = %header.data_type,
            num_valid_pixel = header.num_valid_pixel,
            blob_size = header.blob_size,
            "parsed Lerc2 header"
        );

        let blob_size = header.blob_size_usize();
        if blob_size > blob.len() {
            return Err(DecodeError::Truncated {
                blob_size,
                available: blob.len(),
            });
        }
        let blob = &blob[..blob_size];

        if options.verify_checksum && header.version >= checksum::CHECKSUM_VERSION {
            let computed = checksum::fletcher32(&blob[CHECKSUM_START..]);
            if computed != header.checksum {
                return Err(DecodeError::ChecksumMismatch {
                    expected: header.checksum,
                    computed,
                });
            }
        }

        let pixel_count = header.pixel_count();
        if pixel_count > options.max_pixels {
            return Err(DecodeError::RasterTooLarge {
                pixels: pixel_count,
                limit: options.max_pixels,
            });
        }

        let mut cursor = Cursor::new(blob);
        cursor.advance_to(HEADER_SIZE)?;
        let mut pixels = PixelBuffer::zeroed(header.data_type, pixel_count);
        let mask = read_mask(&mut cursor, &header)?;

        Self::read_pixels(&mut cursor, &header, &mask, &mut pixels)?;

        Ok(DecodedRaster {
            header,
            mask,
            pixels,
            bytes_consumed: cursor.position(),
        })
    }

    /// Parse only the header of the blob at the start of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidHeader`] if the header is malformed.
    pub fn read_info(bytes: &[u8]) -> Result<HeaderInfo, DecodeError> {
        HeaderInfo::read_from(bytes).map_err(DecodeError::InvalidHeader)
    }

    fn read_pixels(
        cursor: &mut Cursor<'_>,
        header: &HeaderInfo,
        mask: &ValidityMask,
        pixels: &mut PixelBuffer,
    ) -> Result<(), DecodeError> {
        if header.all_invalid() {
            debug!("no valid pixels");
            return Ok(());
        }

        let pixel_count = header.pixel_count();
        if header.is_constant() {
            debug!(z = header.z_min, "constant raster");
            for k in (0..pixel_count).filter(|&k| mask.is_valid(k)) {
                pixels.set(k, header.z_min);
            }
            return Ok(());
        }

        let one_sweep = cursor.read_u8()? != 0;
        if one_sweep {
            debug!("one-sweep raw values");
            for k in (0..pixel_count).filter(|&k| mask.is_valid(k)) {
                let value = header.data_type.read_value(cursor)?;
                pixels.set(k, value);
            }
            return Ok(());
        }

        if header.tries_huffman() {
            let offset = cursor.position();
            match cursor.read_u8()? {
                IMAGE_ENCODE_TILES => {}
                IMAGE_ENCODE_HUFFMAN => {
                    return Err(DecodeError::Unsupported(UnsupportedFeature::Huffman));
                }
                flag => return Err(DecodeError::InvalidHuffmanFlag { flag, offset }),
            }
        }

        debug!(micro_block_size = header.micro_block_size, "tiled");
        TileDecoder::new(header, mask).read_tiles(cursor, pixels)
    }
}
