use lerc_wire::DataType;

/// Decoded pixel values, little-endian, row-major.
///
/// The buffer is `pixel_count * data_type.wire_width()` bytes and starts
/// zeroed, so pixels the decoder never writes read as 0.
/// Writes go through the [`DataType`] table, which narrows the `f64`
/// working value to the declared type.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    data_type: DataType,
    width: usize,
    bytes: Vec<u8>,
}

impl PixelBuffer {
    /// A zeroed buffer for `pixel_count` values of `data_type`.
    pub fn zeroed(data_type: DataType, pixel_count: usize) -> Self {
        Self {
            data_type,
            width: data_type.wire_width(),
            bytes: vec![0; pixel_count * data_type.wire_width()],
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Number of pixels held.
    pub fn len(&self) -> usize {
        if self.width == 0 { 0 } else { self.bytes.len() / self.width }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Store `value` at linear index `k`.
    ///
    /// # Panics
    ///
    /// Panics if `k` is out of range.
    pub fn set(&mut self, k: usize, value: f64) {
        let start = k * self.width;
        self.data_type
            .write_le(value, &mut self.bytes[start..start + self.width]);
    }

    /// Read back the value at linear index `k`, widened to `f64`.
    pub fn get(&self, k: usize) -> Option<f64> {
        let start = k.checked_mul(self.width)?;
        self.data_type.decode_le(self.bytes.get(start..)?)
    }

    /// Raw little-endian bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}
