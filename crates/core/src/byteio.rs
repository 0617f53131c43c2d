//! Byte-level reading of little-endian fields.
//!
//! Every multi-byte field on the channel is little-endian and every
//! conversion is unsigned: a raw byte is always 0-255, a word 0-65535.
//!
//! # Example
//! ```
//! use sosmon_core::byteio::ByteReader;
//!
//! let mut reader = ByteReader::new(&[0x05, 0x00, 0xFF]);
//! assert_eq!(reader.read_u16_le().unwrap(), 5);
//! assert_eq!(reader.read_u8().unwrap(), 255);
//! assert!(reader.read_u8().is_err());
//! ```

use crate::error::{ByteIoError, Result};

/// Reads unsigned little-endian fields from a byte slice.
///
/// # Invariants
/// - `position` never exceeds `data.len()`
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    /// Source data
    data: &'a [u8],
    /// Index of the next unread byte
    position: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a new ByteReader for the given data.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Read one unsigned byte.
    pub fn read_u8(&mut self) -> Result<u8> {
        let bytes = self.take(1)?;
        Ok(bytes[0])
    }

    /// Read an unsigned 16-bit little-endian word.
    pub fn read_u16_le(&mut self) -> Result<u16> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Read an unsigned 32-bit little-endian word.
    pub fn read_u32_le(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Skip `count` bytes (e.g., reserved fields).
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.take(count).map(|_| ())
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Current read position.
    pub fn position(&self) -> usize {
        self.position
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        let available = self.remaining();
        if count > available {
            return Err(ByteIoError::UnexpectedEof {
                requested: count,
                available,
            }
            .into());
        }

        let start = self.position;
        self.position += count;
        Ok(&self.data[start..self.position])
    }
}

/// Reconstruct an unsigned little-endian integer of 1, 2 or 4 bytes.
///
/// Returns `None` for any other width.
pub fn unsigned_le(bytes: &[u8]) -> Option<u32> {
    let mut reader = ByteReader::new(bytes);
    let value = match bytes.len() {
        1 => reader.read_u8().map(u32::from),
        2 => reader.read_u16_le().map(u32::from),
        4 => reader.read_u32_le(),
        _ => return None,
    };
    value.ok()
}
