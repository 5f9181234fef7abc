//! Field-by-field native-endian readers and writers.
//!
//! Producers and consumers share a byte order; nothing here negotiates
//! endianness. Every read is bounds-checked against the slice it was given.

use crate::prelude::{DecodeError, DecodeResult};

pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn take(&mut self, len: usize) -> DecodeResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(DecodeError::TruncatedPacket {
                needed: self.pos.saturating_add(len),
                available: self.data.len(),
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u32(&mut self) -> DecodeResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_f32(&mut self) -> DecodeResult<f32> {
        let b = self.take(4)?;
        Ok(f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Reads `count` consecutive float32 values.
    pub fn read_f32_array(&mut self, count: usize) -> DecodeResult<Vec<f32>> {
        let byte_len = count.checked_mul(4).ok_or(DecodeError::TruncatedPacket {
            needed: usize::MAX,
            available: self.data.len(),
        })?;
        let bytes = self.take(byte_len)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }
}

#[derive(Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_ne_bytes());
    }

    pub fn put_f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_ne_bytes());
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_fields_in_order() {
        let mut writer = ByteWriter::default();
        writer.put_u32(0xdead_beef);
        writer.put_u8(7);
        writer.put_f32(1.5);
        let bytes = writer.into_inner();

        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_u32().unwrap(), 0xdead_beef);
        assert_eq!(reader.read_u8().unwrap(), 7);
        assert_eq!(reader.read_f32().unwrap(), 1.5);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn short_read_reports_truncation_without_advancing() {
        let bytes = [1u8, 2, 3];
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(
            reader.read_u32(),
            Err(DecodeError::TruncatedPacket {
                needed: 4,
                available: 3
            })
        );
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn oversized_array_request_is_truncation() {
        let bytes = [0u8; 8];
        let mut reader = ByteReader::new(&bytes);
        assert!(matches!(
            reader.read_f32_array(usize::MAX / 2),
            Err(DecodeError::TruncatedPacket { .. })
        ));
    }
}
