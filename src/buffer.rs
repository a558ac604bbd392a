//! Input buffer contract shared by the section and descriptor decoders
//!
//! The demultiplexing layer hands payloads over as flat, randomly indexable
//! byte sequences. Anything that can expose its contents as `&[u8]` gets the
//! big-endian read helpers below for free.

use crate::error::{DecodeError, Result};

/// A flat, randomly indexable byte sequence
pub trait ByteSource {
    /// Borrow the whole buffer
    fn as_bytes(&self) -> &[u8];

    /// Number of bytes in the buffer
    fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Whether the buffer holds no bytes
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slice `[start, end)` out of the buffer
    fn slice(&self, start: usize, end: usize) -> Result<&[u8]> {
        let bytes = self.as_bytes();
        if start > end || end > bytes.len() {
            return Err(DecodeError::out_of_bounds(format!(
                "slice {}..{} outside buffer of {} bytes",
                start,
                end,
                bytes.len()
            )));
        }
        Ok(&bytes[start..end])
    }

    /// Read an 8-bit unsigned integer at `offset`
    fn read_u8(&self, offset: usize) -> Result<u8> {
        Ok(read_be(self.as_bytes(), offset, 1)? as u8)
    }

    /// Read a big-endian 16-bit unsigned integer at `offset`
    fn read_u16(&self, offset: usize) -> Result<u16> {
        Ok(read_be(self.as_bytes(), offset, 2)? as u16)
    }

    /// Read a big-endian 24-bit unsigned integer at `offset`
    fn read_u24(&self, offset: usize) -> Result<u32> {
        Ok(read_be(self.as_bytes(), offset, 3)? as u32)
    }

    /// Read a big-endian 32-bit unsigned integer at `offset`
    fn read_u32(&self, offset: usize) -> Result<u32> {
        Ok(read_be(self.as_bytes(), offset, 4)? as u32)
    }

    /// Read a big-endian 40-bit unsigned integer at `offset`
    fn read_u40(&self, offset: usize) -> Result<u64> {
        read_be(self.as_bytes(), offset, 5)
    }
}

fn read_be(bytes: &[u8], offset: usize, width: usize) -> Result<u64> {
    let end = offset
        .checked_add(width)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| {
            DecodeError::out_of_bounds(format!(
                "{}-byte read at offset {} outside buffer of {} bytes",
                width,
                offset,
                bytes.len()
            ))
        })?;

    Ok(bytes[offset..end]
        .iter()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}

impl ByteSource for [u8] {
    fn as_bytes(&self) -> &[u8] {
        self
    }
}

impl ByteSource for Vec<u8> {
    fn as_bytes(&self) -> &[u8] {
        self
    }
}

impl<const N: usize> ByteSource for [u8; N] {
    fn as_bytes(&self) -> &[u8] {
        self
    }
}
