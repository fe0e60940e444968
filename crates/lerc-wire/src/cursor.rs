use crate::error::WireError;

/// Forward-only read position over an in-memory blob.
///
/// One `Cursor` belongs to exactly one decode call. It is threaded by
/// `&mut` through header, mask and tile readers, so two decodes never share
/// a position. Every read is bounds-checked and reports the offset it was
/// attempted at.
///
/// ```text
///   buf:  [ header(62) | mask | one-sweep flag | tiles ... ]
///                ▲
///                pos  (only ever moves right)
/// ```
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Create a cursor at offset 0 of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// The whole underlying buffer, regardless of position.
    pub fn buffer(&self) -> &'a [u8] {
        self.buf
    }

    /// Move forward to an absolute offset reported by a sub-reader.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedEof`] if `pos` lies past the end of
    /// the buffer.
    ///
    /// # Panics
    ///
    /// Debug builds assert that the cursor never moves backwards.
    pub fn advance_to(&mut self, pos: usize) -> Result<(), WireError> {
        debug_assert!(pos >= self.pos, "cursor moved backwards: {} -> {pos}", self.pos);
        if pos > self.buf.len() {
            return Err(WireError::UnexpectedEof {
                offset: self.buf.len(),
                needed: pos - self.buf.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    /// Borrow the next `n` bytes and advance past them.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedEof`] if fewer than `n` bytes remain.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        if self.remaining() < n {
            return Err(WireError::UnexpectedEof {
                offset: self.pos,
                needed: n - self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read a fixed-size array.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedEof`] if fewer than `N` bytes remain.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedEof`] at end of input.
    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.read_array::<1>()?[0])
    }

    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedEof`] at end of input.
    pub fn read_i32_le(&mut self) -> Result<i32, WireError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedEof`] at end of input.
    pub fn read_u32_le(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// # Errors
    ///
    /// Returns [`WireError::UnexpectedEof`] at end of input.
    pub fn read_f64_le(&mut self) -> Result<f64, WireError> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_fields_in_order() {
        let mut buf = vec![0xAB];
        buf.extend_from_slice(&(-2i32).to_le_bytes());
        buf.extend_from_slice(&7u32.to_le_bytes());
        buf.extend_from_slice(&1.5f64.to_le_bytes());

        let mut cursor = Cursor::new(&buf);
        assert_eq!(cursor.read_u8().unwrap(), 0xAB);
        assert_eq!(cursor.read_i32_le().unwrap(), -2);
        assert_eq!(cursor.read_u32_le().unwrap(), 7);
        assert!((cursor.read_f64_le().unwrap() - 1.5).abs() < f64::EPSILON);
        assert_eq!(cursor.remaining(), 0);
        assert_eq!(cursor.position(), 17);
    }

    #[test]
    fn short_read_reports_offset() {
        let buf = [1u8, 2, 3];
        let mut cursor = Cursor::new(&buf);
        cursor.read_u8().unwrap();
        let err = cursor.read_i32_le().unwrap_err();
        assert!(matches!(
            err,
            WireError::UnexpectedEof {
                offset: 1,
                needed: 2
            }
        ));
        // A failed read leaves the position untouched.
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn advance_to_rejects_past_end() {
        let buf = [0u8; 4];
        let mut cursor = Cursor::new(&buf);
        cursor.advance_to(4).unwrap();
        assert_eq!(cursor.remaining(), 0);

        let mut cursor = Cursor::new(&buf);
        assert!(matches!(
            cursor.advance_to(9),
            Err(WireError::UnexpectedEof { offset: 4, .. })
        ));
    }
}
