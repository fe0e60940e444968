//! Bit-stuffed integer blocks.
//!
//! A block starts with one control byte, then the element count, then the
//! packed payload:
//!
//! ```text
//! control byte
//! ┌────┬────┬────┬────┬────┬────┬────┬────┐
//! │ 7  │ 6  │ 5  │ 4  │ 3  │ 2  │ 1  │ 0  │
//! └────┴────┴────┴────┴────┴────┴────┴────┘
//!  └─bits67─┘ LUT  └──────── numBits ───────┘
//!
//! bits67 → count width: 0 = u32, 1 = u16, 2 = u8   (little-endian)
//! ```
//!
//! Values are packed LSB-first into little-endian 32-bit words. The last
//! word is truncated to the bytes that actually carry bits, so a reader
//! must copy into a zero-padded word buffer before unpacking.
//!
//! With the LUT bit set, a table-size byte follows the count, then the
//! table (without its implicit leading zero) at `numBits`, then one index
//! per element at just enough bits to address the table.

use crate::cursor::Cursor;
use crate::error::WireError;

/// Bit-stuffed blocks in format versions before 3 use a different bit order.
pub const MIN_BIT_STUFF_VERSION: i32 = 3;

/// Widest value the 5-bit `numBits` field can describe.
pub const MAX_NUM_BITS: u32 = 31;

const LUT_FLAG: u8 = 0b0010_0000;
const NUM_BITS_MASK: u8 = 0b0001_1111;

/// Decoder for bit-stuffed blocks.
///
/// Holds no position: [`decode`](Self::decode) takes an absolute offset and
/// hands back the offset just past the block, which the caller applies to
/// its own cursor.
#[derive(Clone, Copy, Debug)]
pub struct BitUnstuffer {
    lerc_version: i32,
    max_elements: usize,
}

impl BitUnstuffer {
    /// Unstuffer for blobs of the given format version, with no element limit.
    pub fn new(lerc_version: i32) -> Self {
        Self {
            lerc_version,
            max_elements: usize::MAX,
        }
    }

    /// Reject blocks declaring more than `max_elements` values before
    /// allocating anything for them.
    #[must_use]
    pub fn with_max_elements(mut self, max_elements: usize) -> Self {
        self.max_elements = max_elements;
        self
    }

    /// Decode one block starting at `pos`.
    ///
    /// Returns the values and the offset of the first byte after the block.
    ///
    /// # Errors
    ///
    /// - [`WireError::UnsupportedVersion`] for format versions below 3.
    /// - [`WireError::InvalidCountWidth`] if bits 6-7 of the control byte are `3`.
    /// - [`WireError::TooManyElements`] if the count exceeds the configured limit.
    /// - [`WireError::InvalidLutSize`] / [`WireError::LutIndexOutOfRange`] for
    ///   a malformed lookup table.
    /// - [`WireError::UnexpectedEof`] if the payload runs past `bytes`.
    pub fn decode(&self, bytes: &[u8], pos: usize) -> Result<(Vec<u32>, usize), WireError> {
        if self.lerc_version < MIN_BIT_STUFF_VERSION {
            return Err(WireError::UnsupportedVersion {
                version: self.lerc_version,
            });
        }

        let mut cursor = Cursor::new(bytes);
        cursor.advance_to(pos)?;

        let control = cursor.read_u8()?;
        let bits67 = control >> 6;
        let count_width = match bits67 {
            0 => 4,
            1 => 2,
            2 => 1,
            _ => return Err(WireError::InvalidCountWidth { bits67, offset: pos }),
        };
        let do_lut = control & LUT_FLAG != 0;
        let num_bits = u32::from(control & NUM_BITS_MASK);

        let num_elements = read_count(&mut cursor, count_width)?;
        if num_elements > self.max_elements {
            return Err(WireError::TooManyElements {
                count: num_elements,
                limit: self.max_elements,
            });
        }

        let values = if do_lut {
            let lut_offset = cursor.position();
            let n_lut_byte = cursor.read_u8()?;
            if n_lut_byte < 2 {
                return Err(WireError::InvalidLutSize {
                    value: n_lut_byte,
                    offset: lut_offset,
                });
            }
            let n_lut = usize::from(n_lut_byte - 1);
            let lut = unstuff(&mut cursor, n_lut, num_bits)?;

            let n_bits_lut = bits_required(n_lut);
            let indices = unstuff(&mut cursor, num_elements, n_bits_lut)?;

            // Index 0 is the implicit zero that the encoder leaves out.
            let mut table = Vec::with_capacity(lut.len() + 1);
            table.push(0);
            table.extend_from_slice(&lut);

            indices
                .into_iter()
                .map(|index| {
                    table
                        .get(index as usize)
                        .copied()
                        .ok_or(WireError::LutIndexOutOfRange {
                            index,
                            len: table.len(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?
        } else {
            unstuff(&mut cursor, num_elements, num_bits)?
        };

        Ok((values, cursor.position()))
    }
}

/// Read the 1-, 2- or 4-byte little-endian element count.
fn read_count(cursor: &mut Cursor<'_>, width: usize) -> Result<usize, WireError> {
    let count = match width {
        1 => u32::from(cursor.read_u8()?),
        2 => u32::from(u16::from_le_bytes(cursor.read_array()?)),
        _ => cursor.read_u32_le()?,
    };
    Ok(count as usize)
}

/// Number of bits needed to represent `n`, i.e. `ceil(log2(n + 1))`.
fn bits_required(n: usize) -> u32 {
    usize::BITS - n.leading_zeros()
}

/// Trailing bytes of the last 32-bit word that carry no bits.
pub fn tail_bytes_not_needed(num_elements: usize, num_bits: u32) -> usize {
    let num_bits_tail = (num_elements * num_bits as usize) & 31;
    let num_bytes_tail = (num_bits_tail + 7) >> 3;
    if num_bytes_tail > 0 { 4 - num_bytes_tail } else { 0 }
}

/// Payload bytes occupied by `num_elements` values of `num_bits` each.
///
/// Returns `None` if the size overflows `usize`.
pub fn packed_len(num_elements: usize, num_bits: u32) -> Option<usize> {
    let total_bits = num_elements.checked_mul(num_bits as usize)?;
    let num_words = total_bits.checked_add(31)? / 32;
    Some(num_words * 4 - tail_bytes_not_needed(num_elements, num_bits))
}

/// Unpack `num_elements` values of `num_bits` bits each at the cursor.
fn unstuff(cursor: &mut Cursor<'_>, num_elements: usize, num_bits: u32) -> Result<Vec<u32>, WireError> {
    if num_elements == 0 || num_bits == 0 {
        return Ok(vec![0; num_elements]);
    }

    let num_bytes_used = packed_len(num_elements, num_bits).ok_or(WireError::TooManyElements {
        count: num_elements,
        limit: usize::MAX / num_bits as usize,
    })?;
    let src = cursor.take(num_bytes_used)?;

    // Zero-padded copy, plus one spare word so the straddle branch can
    // always look one word ahead.
    let num_words = num_bytes_used.div_ceil(4);
    let mut words = Vec::with_capacity(num_words + 1);
    for chunk in src.chunks(4) {
        let mut word = [0u8; 4];
        word[..chunk.len()].copy_from_slice(chunk);
        words.push(u32::from_le_bytes(word));
    }
    words.push(0);

    let nb = 32 - num_bits;
    let mut values = Vec::with_capacity(num_elements);
    let mut src_pos = 0;
    let mut bit_pos = 0u32;

    for _ in 0..num_elements {
        if nb >= bit_pos {
            values.push((words[src_pos] << (nb - bit_pos)) >> nb);
            bit_pos += num_bits;
            if bit_pos == 32 {
                src_pos += 1;
                bit_pos = 0;
            }
        } else {
            let low = words[src_pos] >> bit_pos;
            src_pos += 1;
            let high = (words[src_pos] << (64 - num_bits - bit_pos)) >> nb;
            values.push(low | high);
            bit_pos -= nb;
        }
    }

    Ok(values)
}

/// Pack `values` at `num_bits` each, exactly as [`BitUnstuffer`] expects to
/// find them after the count. Bits above `num_bits` are dropped.
///
/// # Panics
///
/// Panics if `num_bits` is not in `1..=32`.
pub fn stuff(values: &[u32], num_bits: u32) -> Vec<u8> {
    assert!((1..=32).contains(&num_bits), "num_bits must be in 1..=32, got {num_bits}");

    let num_words = (values.len() * num_bits as usize).div_ceil(32);
    let mut words = vec![0u32; num_words + 1];
    let mask = if num_bits == 32 { u32::MAX } else { (1u32 << num_bits) - 1 };

    let mut bit_pos = 0usize;
    for &value in values {
        let value = value & mask;
        let word = bit_pos / 32;
        #[allow(clippy::cast_possible_truncation)]
        let offset = (bit_pos % 32) as u32;
        words[word] |= value << offset;
        if offset + num_bits > 32 {
            words[word + 1] |= value >> (32 - offset);
        }
        bit_pos += num_bits as usize;
    }

    let mut bytes: Vec<u8> = words[..num_words].iter().flat_map(|w| w.to_le_bytes()).collect();
    bytes.truncate(num_words * 4 - tail_bytes_not_needed(values.len(), num_bits));
    bytes
}

/// Write a complete direct-path block (control byte, count, payload) using
/// the narrowest bit width that holds the largest value.
///
/// # Panics
///
/// Panics if `values` has more than `u32::MAX` elements, or if any value
/// needs more than [`MAX_NUM_BITS`] bits.
#[allow(clippy::cast_possible_truncation)]
pub fn encode(values: &[u32]) -> Vec<u8> {
    let max = values.iter().copied().max().unwrap_or(0);
    let num_bits = u32::BITS - max.leading_zeros();
    assert!(
        num_bits <= MAX_NUM_BITS,
        "bit-stuffed values must fit in {MAX_NUM_BITS} bits, got {max:#x}"
    );
    let count = u32::try_from(values.len()).expect("bit-stuffed block holds at most u32::MAX values");

    let mut out = Vec::new();
    let num_bits_byte = num_bits as u8;
    if count < 0x100 {
        out.push(0b1000_0000 | num_bits_byte);
        out.push(count as u8);
    } else if count < 0x1_0000 {
        out.push(0b0100_0000 | num_bits_byte);
        out.extend_from_slice(&(count as u16).to_le_bytes());
    } else {
        out.push(num_bits_byte);
        out.extend_from_slice(&count.to_le_bytes());
    }

    if num_bits > 0 {
        out.extend_from_slice(&stuff(values, num_bits));
    }
    out
}
