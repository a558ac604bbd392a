//! Bit cursor and MSB-first bit reads
//!
//! Fields in PSI/SI syntax are not byte aligned, so the decoder tracks its
//! position as a byte index plus a bit offset inside that byte. Bit offset 0
//! is the most significant bit.

use crate::error::{DecodeError, Result};

/// A position in the buffer with sub-byte resolution
///
/// Cursors are small values: every decode step takes one and returns the
/// advanced one instead of mutating shared state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cursor {
    /// Byte index into the buffer
    pub position: usize,
    /// Bit offset inside the byte at `position` (0-7, 0 = MSB)
    pub bit_offset: u8,
}

impl Cursor {
    /// Create a byte-aligned cursor
    pub fn at(position: usize) -> Self {
        Cursor {
            position,
            bit_offset: 0,
        }
    }

    /// Rebuild a cursor from an absolute bit index
    pub fn from_bit_index(bit_index: usize) -> Self {
        Cursor {
            position: bit_index / 8,
            bit_offset: (bit_index % 8) as u8,
        }
    }

    /// Absolute bit index of this cursor
    pub fn bit_index(&self) -> usize {
        self.position * 8 + self.bit_offset as usize
    }

    /// Return the cursor advanced by `bits`
    pub fn advance(self, bits: usize) -> Self {
        Cursor::from_bit_index(self.bit_index() + bits)
    }

    /// Whether the cursor sits on a byte boundary
    pub fn is_aligned(&self) -> bool {
        self.bit_offset == 0
    }

    /// Bits left before the exclusive byte `limit`, zero if already past it
    pub fn bits_until(&self, limit: usize) -> usize {
        (limit * 8).saturating_sub(self.bit_index())
    }
}

impl std::fmt::Display for Cursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.position, self.bit_offset)
    }
}

/// Check that `bits` can be read at `cursor` without crossing `limit`
///
/// `limit` is an exclusive byte bound; the caller clamps it to the buffer.
pub fn ensure_available(cursor: Cursor, bits: usize, limit: usize) -> Result<()> {
    let available = cursor.bits_until(limit);
    if bits > available {
        return Err(DecodeError::out_of_bounds(format!(
            "{} bits requested at {} but only {} bits remain before byte {}",
            bits, cursor, available, limit
        )));
    }
    Ok(())
}

/// Read up to 64 bits MSB-first starting at `cursor`
///
/// Returns the value and the advanced cursor.
pub fn read_bits(data: &[u8], cursor: Cursor, bits: usize, limit: usize) -> Result<(u64, Cursor)> {
    if bits > 64 {
        return Err(DecodeError::invalid_length(format!(
            "{} bits do not fit a 64-bit value",
            bits
        )));
    }
    ensure_available(cursor, bits, limit.min(data.len()))?;

    let mut value = 0u64;
    let mut byte_pos = cursor.position;
    let mut bit_pos = cursor.bit_offset as usize;
    let mut remaining = bits;

    while remaining > 0 {
        let available = 8 - bit_pos;
        let take = remaining.min(available);
        let shift = available - take;
        let mask = ((1u16 << take) - 1) as u8;
        let chunk = (data[byte_pos] >> shift) & mask;

        value = (value << take) | u64::from(chunk);

        bit_pos += take;
        if bit_pos == 8 {
            bit_pos = 0;
            byte_pos += 1;
        }
        remaining -= take;
    }

    Ok((value, cursor.advance(bits)))
}

/// Read `count` consecutive items of `width` bits each (width <= 8)
pub fn read_units(
    data: &[u8],
    cursor: Cursor,
    width: usize,
    count: usize,
    limit: usize,
) -> Result<(Vec<u8>, Cursor)> {
    ensure_available(cursor, width * count, limit.min(data.len()))?;

    let mut items = Vec::with_capacity(count);
    let mut at = cursor;
    for _ in 0..count {
        let (item, next) = read_bits(data, at, width, limit)?;
        items.push(item as u8);
        at = next;
    }
    Ok((items, at))
}
