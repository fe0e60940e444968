/// Errors raised while reading the low-level LERC2 wire structures.
///
/// Every variant that can be caused by a short or malformed buffer carries
/// the byte offset (relative to the slice being read) where the problem was
/// detected. That offset is what you want when staring at a hex dump.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Input ended before a complete value could be read.
    #[error("unexpected end of input at offset {offset} (needed {needed} more bytes)")]
    UnexpectedEof { offset: usize, needed: usize },

    /// The first six bytes were not `"Lerc2 "`.
    #[error("invalid magic: expected \"Lerc2 \", got {found:02X?}")]
    BadMagic { found: [u8; 6] },

    /// Format version outside the range this decoder understands, or a
    /// bit-stuffed block in a blob older than version 3.
    #[error("unsupported LERC2 version {version}")]
    UnsupportedVersion { version: i32 },

    /// A header field violated one of its invariants.
    #[error("invalid header field {field}: {value}")]
    InvalidHeaderField { field: &'static str, value: i64 },

    /// Data type code outside `0..=7`.
    #[error("unknown data type code {code}")]
    UnknownDataType { code: i32 },

    /// Bits 6-7 of a bit-stuffer control byte selected no valid count width.
    #[error("invalid element count width selector {bits67} at offset {offset}")]
    InvalidCountWidth { bits67: u8, offset: usize },

    /// The lookup-table size byte describes an empty or negative table.
    #[error("invalid lookup table size byte {value} at offset {offset}")]
    InvalidLutSize { value: u8, offset: usize },

    /// A decoded index points past the end of the lookup table.
    #[error("lookup table index {index} out of range (table has {len} entries)")]
    LutIndexOutOfRange { index: u32, len: usize },

    /// A bit-stuffed block declares more elements than the caller allows.
    #[error("bit-stuffed block declares {count} elements, limit is {limit}")]
    TooManyElements { count: usize, limit: usize },
}
