use std::fmt;

use crate::cursor::Cursor;
use crate::error::WireError;

// ── Dispatch table macro ──────────────────────────────────────────────
//
// Each concrete data type is a (variant, wire code, Rust primitive) triple.
// The macro derives the width, the little-endian reader and the writer
// from that primitive, so the one-sweep, raw-tile and offset paths all go
// through the same table. `Undefined` is appended by hand: it has code 8,
// width 0, and never survives header validation.

macro_rules! data_types {
    (
        $( $(#[$vmeta:meta])* $variant:ident = $code:literal => $ty:ty, $name:literal ),+ $(,)?
    ) => {
        /// Pixel data type declared in the LERC2 header.
        ///
        /// ```text
        /// ┌──────┬──────────┬───────┐
        /// │ Code │ Variant  │ Width │
        /// ├──────┼──────────┼───────┤
        /// │ 0    │ Char     │ 1     │
        /// │ 1    │ Byte     │ 1     │
        /// │ 2    │ Short    │ 2     │
        /// │ 3    │ UShort   │ 2     │
        /// │ 4    │ Int      │ 4     │
        /// │ 5    │ UInt     │ 4     │
        /// │ 6    │ Float    │ 4     │
        /// │ 7    │ Double   │ 8     │
        /// │ 8    │ Undefined│ 0     │
        /// └──────┴──────────┴───────┘
        /// ```
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum DataType {
            $( $(#[$vmeta])* $variant, )+
            /// Placeholder code; not a decodable type.
            Undefined,
        }

        impl DataType {
            /// Wire code as stored in the header.
            pub fn code(self) -> i32 {
                match self {
                    $( Self::$variant => $code, )+
                    Self::Undefined => 8,
                }
            }

            /// Map a wire code back to its variant.
            ///
            /// # Errors
            ///
            /// Returns [`WireError::UnknownDataType`] for codes outside `0..=8`.
            pub fn from_code(code: i32) -> Result<Self, WireError> {
                match code {
                    $( $code => Ok(Self::$variant), )+
                    8 => Ok(Self::Undefined),
                    other => Err(WireError::UnknownDataType { code: other }),
                }
            }

            /// Bytes occupied by one value on the wire and in the pixel buffer.
            pub fn wire_width(self) -> usize {
                match self {
                    $( Self::$variant => std::mem::size_of::<$ty>(), )+
                    Self::Undefined => 0,
                }
            }

            /// Upper-case name used in diagnostics (`"FLOAT"`, `"BYTE"`, ...).
            pub fn name(self) -> &'static str {
                match self {
                    $( Self::$variant => $name, )+
                    Self::Undefined => "UNDEFINED",
                }
            }

            /// Read one little-endian value of this type and widen it to `f64`.
            ///
            /// # Errors
            ///
            /// Returns [`WireError::UnexpectedEof`] if the cursor runs out.
            pub fn read_value(self, cursor: &mut Cursor<'_>) -> Result<f64, WireError> {
                match self {
                    $( Self::$variant => Ok(f64::from(<$ty>::from_le_bytes(cursor.read_array()?))), )+
                    Self::Undefined => Ok(0.0),
                }
            }

            /// Decode one value from the front of `bytes`.
            ///
            /// Returns `None` when `bytes` is shorter than [`wire_width`](Self::wire_width).
            pub fn decode_le(self, bytes: &[u8]) -> Option<f64> {
                match self {
                    $( Self::$variant => {
                        let raw = bytes.get(..std::mem::size_of::<$ty>())?;
                        Some(f64::from(<$ty>::from_le_bytes(raw.try_into().ok()?)))
                    } )+
                    Self::Undefined => None,
                }
            }

            /// Narrow `value` to this type and write it little-endian into `out`.
            ///
            /// Integer targets truncate toward zero and saturate at the
            /// type's bounds.
            ///
            /// # Panics
            ///
            /// Panics if `out` is shorter than [`wire_width`](Self::wire_width).
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            pub fn write_le(self, value: f64, out: &mut [u8]) {
                match self {
                    $( Self::$variant => {
                        let bytes = (value as $ty).to_le_bytes();
                        out[..bytes.len()].copy_from_slice(&bytes);
                    } )+
                    Self::Undefined => {}
                }
            }
        }
    };
}

data_types! {
    /// Signed 8-bit.
    Char = 0 => i8, "CHAR",
    /// Unsigned 8-bit.
    Byte = 1 => u8, "BYTE",
    Short = 2 => i16, "SHORT",
    UShort = 3 => u16, "USHORT",
    Int = 4 => i32, "INT",
    UInt = 5 => u32, "UINT",
    Float = 6 => f32, "FLOAT",
    Double = 7 => f64, "DOUBLE",
}

impl DataType {
    /// True for the eight types a raster can actually hold.
    pub fn is_concrete(self) -> bool {
        self != Self::Undefined
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
