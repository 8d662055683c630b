use crate::error::Result;
use structarr_common::RawBuffer;

/// Serialized form of a struct array.
///
/// It carries no layout descriptor: the receiver must deserialize
/// it into the same shape it was produced from. Moving the value
/// moves the buffer, so handing it to another thread copies nothing.
#[derive(Debug)]
pub struct SerializedStructArray {
    pub length: usize,
    pub buffer: RawBuffer,
}

impl SerializedStructArray {
    /// Wrap a copy of raw element bytes received from elsewhere.
    #[inline]
    pub fn from_bytes(length: usize, bs: &[u8]) -> Result<Self> {
        let buffer = RawBuffer::from_bytes(bs)?;
        Ok(SerializedStructArray { length, buffer })
    }

    /// Returns the raw element bytes, e.g. for upload as vertex data.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    /// Returns a copy of the raw element bytes. Move the whole value
    /// to hand the buffer off without copy.
    #[inline]
    pub fn to_vec(&self) -> Vec<u8> {
        self.buffer.to_vec()
    }
}
