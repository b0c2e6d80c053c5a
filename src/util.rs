//! Byte and bit helpers shared by every field kind.
//!
//! All functions are pure. Bit positions are LSB-0: position 0 is the least
//! significant bit of the integer, whatever the byte order on the wire.

use crate::codec::{CodecError, ErrorKind};
use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Byte order of a multi-byte field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Endianness {
    /// Network order (most significant byte first).
    #[default]
    Big,
    Little,
}

/// Bounds-checked read cursor over a source buffer.
///
/// Offsets reported in errors are absolute positions in the buffer the reader
/// was created over, so nested decodes report where in the whole input they failed.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    /// Reader positioned at `offset`. An offset past the end of `buf` fails as a truncation
    /// reported at the end of the buffer, `needed` being how far past it the offset lies.
    pub fn at(buf: &'a [u8], offset: usize) -> Result<Self, CodecError> {
        if offset > buf.len() {
            return Err(truncated(buf.len(), offset - buf.len(), 0));
        }
        Ok(Reader { buf, pos: offset })
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Take the next `n` bytes and advance past them.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let bytes = sub_slice(self.buf, self.pos, n)?;
        self.pos += n;
        Ok(bytes)
    }

    /// Fail with `TruncatedInput` unless at least `n` bytes remain. Does not advance.
    pub fn require(&self, n: usize) -> Result<(), CodecError> {
        if self.remaining() < n {
            return Err(truncated(self.pos, n, self.remaining()));
        }
        Ok(())
    }
}

/// `&buf[offset..offset + len]`, or `TruncatedInput` if that range is out of bounds.
pub fn sub_slice(buf: &[u8], offset: usize, len: usize) -> Result<&[u8], CodecError> {
    let available = buf.len().saturating_sub(offset);
    match offset.checked_add(len) {
        Some(end) if end <= buf.len() => Ok(&buf[offset..end]),
        _ => Err(truncated(offset, len, available)),
    }
}

fn truncated(offset: usize, needed: usize, available: usize) -> CodecError {
    CodecError::new(ErrorKind::TruncatedInput { needed, available }, offset)
}

fn check_width(width: usize) -> Result<(), CodecError> {
    if width == 0 || width > 8 {
        return Err(CodecError::from(ErrorKind::InvalidSchema(format!(
            "integer width must be 1..=8 bytes, got {}",
            width
        ))));
    }
    Ok(())
}

/// Largest unsigned value representable in `width` bytes.
pub fn max_uint(width: usize) -> u64 {
    if width >= 8 {
        u64::MAX
    } else {
        (1u64 << (width * 8)) - 1
    }
}

/// Read an unsigned integer of `width` bytes (1..=8) at `offset`.
pub fn read_uint(buf: &[u8], offset: usize, width: usize, endianness: Endianness) -> Result<u64, CodecError> {
    check_width(width)?;
    let bytes = sub_slice(buf, offset, width)?;
    Ok(match endianness {
        Endianness::Big => BigEndian::read_uint(bytes, width),
        Endianness::Little => LittleEndian::read_uint(bytes, width),
    })
}

/// Read a two's-complement signed integer of `width` bytes (1..=8) at `offset`.
pub fn read_int(buf: &[u8], offset: usize, width: usize, endianness: Endianness) -> Result<i64, CodecError> {
    check_width(width)?;
    let bytes = sub_slice(buf, offset, width)?;
    Ok(match endianness {
        Endianness::Big => BigEndian::read_int(bytes, width),
        Endianness::Little => LittleEndian::read_int(bytes, width),
    })
}

/// Encode `value` as an unsigned integer of `width` bytes.
pub fn write_uint(value: u64, width: usize, endianness: Endianness) -> Result<Vec<u8>, CodecError> {
    check_width(width)?;
    if value > max_uint(width) {
        return Err(CodecError::from(ErrorKind::ValueOutOfRange {
            value: value as i128,
            min: 0,
            max: max_uint(width) as i128,
        }));
    }
    let mut buf = vec![0u8; width];
    match endianness {
        Endianness::Big => BigEndian::write_uint(&mut buf, value, width),
        Endianness::Little => LittleEndian::write_uint(&mut buf, value, width),
    }
    Ok(buf)
}

/// Encode `value` as a two's-complement signed integer of `width` bytes.
pub fn write_int(value: i64, width: usize, endianness: Endianness) -> Result<Vec<u8>, CodecError> {
    check_width(width)?;
    let bits = (width * 8) as u32;
    let (min, max) = if bits == 64 {
        (i64::MIN, i64::MAX)
    } else {
        (-(1i64 << (bits - 1)), (1i64 << (bits - 1)) - 1)
    };
    if value < min || value > max {
        return Err(CodecError::from(ErrorKind::ValueOutOfRange {
            value: value as i128,
            min: min as i128,
            max: max as i128,
        }));
    }
    let mut buf = vec![0u8; width];
    match endianness {
        Endianness::Big => BigEndian::write_int(&mut buf, value, width),
        Endianness::Little => LittleEndian::write_int(&mut buf, value, width),
    }
    Ok(buf)
}

fn check_bit(position: u32, width: usize) -> Result<(), CodecError> {
    let width_bits = (width * 8) as u32;
    if position >= width_bits || position >= 64 {
        return Err(CodecError::from(ErrorKind::BitPositionOutOfRange { position, width_bits }));
    }
    Ok(())
}

/// Bit `position` (LSB-0) of an integer `width` bytes wide.
pub fn extract_bit(value: u64, position: u32, width: usize) -> Result<bool, CodecError> {
    check_bit(position, width)?;
    Ok((value >> position) & 1 != 0)
}

/// `value` with bit `position` (LSB-0) set to `bit`.
pub fn set_bit(value: u64, position: u32, bit: bool, width: usize) -> Result<u64, CodecError> {
    check_bit(position, width)?;
    Ok(if bit {
        value | (1u64 << position)
    } else {
        value & !(1u64 << position)
    })
}
