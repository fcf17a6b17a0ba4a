//! QUIC variable-length integer encoding (RFC 9000 §16).
//!
//! A varint occupies 1, 2, 4, or 8 bytes; the two most-significant bits of
//! the first byte give the width, leaving 6, 14, 30, or 62 usable bits.

use bytes::BufMut;

use crate::error::{Error, Result};

/// Largest value representable as a varint62.
pub const MAX: u64 = (1 << 62) - 1;

/// Number of bytes `v` occupies on the wire.
pub const fn len(v: u64) -> usize {
    if v <= 0x3f {
        1
    } else if v <= 0x3fff {
        2
    } else if v <= 0x3fff_ffff {
        4
    } else {
        8
    }
}

/// Append the varint62 encoding of `v` to `buf`.
///
/// Returns [`Error::VarintOverflow`] if `v` exceeds [`MAX`].
pub fn put<B: BufMut>(v: u64, buf: &mut B) -> Result<()> {
    if v > MAX {
        return Err(Error::VarintOverflow);
    }
    match len(v) {
        1 => buf.put_u8(v as u8),
        2 => buf.put_u16(0x4000 | v as u16),
        4 => buf.put_u32(0x8000_0000 | v as u32),
        _ => buf.put_u64(0xc000_0000_0000_0000 | v),
    }
    Ok(())
}

/// Decode one varint62 from the start of `buf`.
///
/// Returns `(value, bytes_consumed)`, or [`Error::BufferTooShort`] when the
/// buffer ends before the encoding does.
pub fn decode(buf: &[u8]) -> Result<(u64, usize)> {
    let first = *buf.first().ok_or(Error::BufferTooShort)?;
    let width = 1usize << (first >> 6);
    if buf.len() < width {
        return Err(Error::BufferTooShort);
    }
    let mut value = (first & 0x3f) as u64;
    for &byte in &buf[1..width] {
        value = (value << 8) | byte as u64;
    }
    Ok((value, width))
}
