//! Integer and floating-point fields.

use crate::codec::{CodecError, ErrorKind};
use crate::util::{self, Endianness, Reader};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::fmt;

/// Fixed-width integer field: 1, 2, 4 or 8 bytes, signed or unsigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntField {
    width: usize,
    signed: bool,
    endianness: Endianness,
}

impl IntField {
    pub fn new(width: usize, signed: bool, endianness: Endianness) -> Result<Self, CodecError> {
        if ![1, 2, 4, 8].contains(&width) {
            return Err(CodecError::from(ErrorKind::InvalidSchema(format!(
                "integer field width must be 1, 2, 4 or 8 bytes, got {}",
                width
            ))));
        }
        Ok(IntField {
            width,
            signed,
            endianness,
        })
    }

    pub const fn u8() -> Self {
        IntField { width: 1, signed: false, endianness: Endianness::Big }
    }
    pub const fn i8() -> Self {
        IntField { width: 1, signed: true, endianness: Endianness::Big }
    }
    pub const fn u16(endianness: Endianness) -> Self {
        IntField { width: 2, signed: false, endianness }
    }
    pub const fn i16(endianness: Endianness) -> Self {
        IntField { width: 2, signed: true, endianness }
    }
    pub const fn u32(endianness: Endianness) -> Self {
        IntField { width: 4, signed: false, endianness }
    }
    pub const fn i32(endianness: Endianness) -> Self {
        IntField { width: 4, signed: true, endianness }
    }
    pub const fn u64(endianness: Endianness) -> Self {
        IntField { width: 8, signed: false, endianness }
    }
    pub const fn i64(endianness: Endianness) -> Self {
        IntField { width: 8, signed: true, endianness }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn min_value(&self) -> i128 {
        if self.signed {
            -(1i128 << (self.width * 8 - 1))
        } else {
            0
        }
    }

    pub fn max_value(&self) -> i128 {
        if self.signed {
            (1i128 << (self.width * 8 - 1)) - 1
        } else {
            (1i128 << (self.width * 8)) - 1
        }
    }

    /// Encode `v` on its own.
    pub fn encode(&self, v: i128) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(self.width);
        self.encode_into(v, &mut out)?;
        Ok(out)
    }

    /// Decode at `offset`, returning the value and the bytes consumed.
    pub fn decode(&self, buf: &[u8], offset: usize) -> Result<(i128, usize), CodecError> {
        let mut r = Reader::at(buf, offset)?;
        Ok((self.decode_from(&mut r)?, self.width))
    }

    pub(crate) fn encode_into(&self, v: i128, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let (min, max) = (self.min_value(), self.max_value());
        if v < min || v > max {
            return Err(CodecError::new(ErrorKind::ValueOutOfRange { value: v, min, max }, out.len()));
        }
        let bytes = if self.signed {
            util::write_int(v as i64, self.width, self.endianness)
        } else {
            util::write_uint(v as u64, self.width, self.endianness)
        }
        .map_err(|e| e.at(out.len()))?;
        out.extend_from_slice(&bytes);
        Ok(())
    }

    pub(crate) fn decode_from(&self, r: &mut Reader<'_>) -> Result<i128, CodecError> {
        let bytes = r.take(self.width)?;
        Ok(if self.signed {
            util::read_int(bytes, 0, self.width, self.endianness)? as i128
        } else {
            util::read_uint(bytes, 0, self.width, self.endianness)? as i128
        })
    }
}

/// Width in bytes of the long double slot.
pub const LONG_DOUBLE_WIDTH: usize = 16;

/// Which IEEE-754 format a [`FloatField`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatKind {
    /// binary32, 4 bytes.
    Single,
    /// binary64, 8 bytes.
    Double,
    /// x87 80-bit extended precision in a 16-byte slot.
    LongDouble,
}

impl FloatKind {
    pub fn width(&self) -> usize {
        match self {
            FloatKind::Single => 4,
            FloatKind::Double => 8,
            FloatKind::LongDouble => LONG_DOUBLE_WIDTH,
        }
    }
}

/// Floating-point field. Bit patterns are carried verbatim: NaN payloads are not canonicalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FloatField {
    kind: FloatKind,
    endianness: Endianness,
}

impl FloatField {
    pub const fn single(endianness: Endianness) -> Self {
        FloatField { kind: FloatKind::Single, endianness }
    }

    pub const fn double(endianness: Endianness) -> Self {
        FloatField { kind: FloatKind::Double, endianness }
    }

    pub const fn long_double(endianness: Endianness) -> Self {
        FloatField { kind: FloatKind::LongDouble, endianness }
    }

    pub fn kind(&self) -> FloatKind {
        self.kind
    }

    pub fn width(&self) -> usize {
        self.kind.width()
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub(crate) fn write_f32(&self, v: f32, out: &mut Vec<u8>) {
        let mut buf = [0u8; 4];
        match self.endianness {
            Endianness::Big => BigEndian::write_u32(&mut buf, v.to_bits()),
            Endianness::Little => LittleEndian::write_u32(&mut buf, v.to_bits()),
        }
        out.extend_from_slice(&buf);
    }

    pub(crate) fn write_f64(&self, v: f64, out: &mut Vec<u8>) {
        let mut buf = [0u8; 8];
        match self.endianness {
            Endianness::Big => BigEndian::write_u64(&mut buf, v.to_bits()),
            Endianness::Little => LittleEndian::write_u64(&mut buf, v.to_bits()),
        }
        out.extend_from_slice(&buf);
    }

    pub(crate) fn write_long_double(&self, v: LongDouble, out: &mut Vec<u8>) {
        let mut bytes = v.to_le_bytes();
        if self.endianness == Endianness::Big {
            bytes.reverse();
        }
        out.extend_from_slice(&bytes);
    }

    // Raw bits go through u32/u64 so no float register ever touches a signaling NaN.
    pub(crate) fn read_f32(&self, r: &mut Reader<'_>) -> Result<f32, CodecError> {
        let b = r.take(4)?;
        Ok(f32::from_bits(match self.endianness {
            Endianness::Big => BigEndian::read_u32(b),
            Endianness::Little => LittleEndian::read_u32(b),
        }))
    }

    pub(crate) fn read_f64(&self, r: &mut Reader<'_>) -> Result<f64, CodecError> {
        let b = r.take(8)?;
        Ok(f64::from_bits(match self.endianness {
            Endianness::Big => BigEndian::read_u64(b),
            Endianness::Little => LittleEndian::read_u64(b),
        }))
    }

    pub(crate) fn read_long_double(&self, r: &mut Reader<'_>) -> Result<LongDouble, CodecError> {
        let b = r.take(LONG_DOUBLE_WIDTH)?;
        let mut bytes = [0u8; LONG_DOUBLE_WIDTH];
        bytes.copy_from_slice(b);
        if self.endianness == Endianness::Big {
            bytes.reverse();
        }
        Ok(LongDouble::from_le_bytes(bytes))
    }
}

const F64_EXP_BIAS: i32 = 1023;
const EXT_EXP_BIAS: i32 = 16383;
const EXT_EXP_MAX: u16 = 0x7FFF;
const INTEGER_BIT: u64 = 1 << 63;

/// An x87 extended-precision value as it sits in a 16-byte `long double` slot.
///
/// Little-endian image: bytes 0..8 are the 64-bit significand (explicit integer bit),
/// bytes 8..10 hold the sign and the 15-bit exponent, bytes 10..16 are padding.
/// All 16 bytes are preserved, padding included, so decode followed by encode is exact.
/// The format is the x86-64 one; other platforms' long doubles are not interchangeable.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LongDouble([u8; LONG_DOUBLE_WIDTH]);

impl LongDouble {
    pub const fn from_le_bytes(bytes: [u8; LONG_DOUBLE_WIDTH]) -> Self {
        LongDouble(bytes)
    }

    pub const fn to_le_bytes(self) -> [u8; LONG_DOUBLE_WIDTH] {
        self.0
    }

    /// Build from sign, biased 15-bit exponent and 64-bit significand. Padding is zero.
    pub fn from_parts(negative: bool, exponent: u16, significand: u64) -> Self {
        let mut bytes = [0u8; LONG_DOUBLE_WIDTH];
        LittleEndian::write_u64(&mut bytes[0..8], significand);
        let se = (exponent & EXT_EXP_MAX) | if negative { 0x8000 } else { 0 };
        LittleEndian::write_u16(&mut bytes[8..10], se);
        LongDouble(bytes)
    }

    pub fn is_sign_negative(&self) -> bool {
        self.sign_exponent() & 0x8000 != 0
    }

    /// Biased exponent.
    pub fn exponent(&self) -> u16 {
        self.sign_exponent() & EXT_EXP_MAX
    }

    pub fn significand(&self) -> u64 {
        LittleEndian::read_u64(&self.0[0..8])
    }

    pub fn is_nan(&self) -> bool {
        self.exponent() == EXT_EXP_MAX && self.significand() << 1 != 0
    }

    pub fn is_infinite(&self) -> bool {
        self.exponent() == EXT_EXP_MAX && self.significand() << 1 == 0
    }

    fn sign_exponent(&self) -> u16 {
        LittleEndian::read_u16(&self.0[8..10])
    }

    /// Exact widening conversion. NaN payload bits move to the top of the significand.
    pub fn from_f64(v: f64) -> Self {
        let bits = v.to_bits();
        let negative = bits >> 63 != 0;
        let exp = ((bits >> 52) & 0x7FF) as i32;
        let frac = bits & ((1u64 << 52) - 1);
        if exp == 0x7FF {
            return LongDouble::from_parts(negative, EXT_EXP_MAX, INTEGER_BIT | (frac << 11));
        }
        if exp == 0 {
            if frac == 0 {
                return LongDouble::from_parts(negative, 0, 0);
            }
            // Subnormal binary64 becomes a normal extended value.
            let lz = frac.leading_zeros() as i32;
            let unbiased = (63 - lz) - 1074;
            return LongDouble::from_parts(negative, (unbiased + EXT_EXP_BIAS) as u16, frac << lz);
        }
        let unbiased = exp - F64_EXP_BIAS;
        LongDouble::from_parts(negative, (unbiased + EXT_EXP_BIAS) as u16, INTEGER_BIT | (frac << 11))
    }

    /// Narrowing conversion, round to nearest even. Out-of-range magnitudes become infinity or zero.
    pub fn to_f64(&self) -> f64 {
        let sign = if self.is_sign_negative() { 1u64 << 63 } else { 0 };
        let exp = self.exponent();
        let sig = self.significand();
        if exp == EXT_EXP_MAX {
            if sig << 1 == 0 {
                return f64::from_bits(sign | (0x7FFu64 << 52));
            }
            let mut frac = (sig >> 11) & ((1u64 << 52) - 1);
            if frac == 0 {
                // Payload lived only in the low bits; keep it a NaN.
                frac = 1 << 51;
            }
            return f64::from_bits(sign | (0x7FFu64 << 52) | frac);
        }
        if sig == 0 {
            return f64::from_bits(sign);
        }
        // Pseudo-denormals and denormals share exponent -16382.
        let mut unbiased = if exp == 0 { 1 - EXT_EXP_BIAS } else { exp as i32 - EXT_EXP_BIAS };
        let lz = sig.leading_zeros();
        let m = sig << lz;
        unbiased -= lz as i32;
        if unbiased > F64_EXP_BIAS {
            return f64::from_bits(sign | (0x7FFu64 << 52));
        }
        if unbiased >= 1 - F64_EXP_BIAS {
            // Normal: keep the 52 bits below the integer bit, rounding away the low 11.
            let rounded = round_shift(m & !INTEGER_BIT, 11);
            let biased = (unbiased + F64_EXP_BIAS) as u64;
            // A carry out of the fraction bumps the exponent, possibly to infinity.
            return f64::from_bits(sign | ((biased << 52) + rounded));
        }
        // Subnormal result: value = m * 2^(unbiased - 63), unit is 2^-1074.
        let shift = (-1011 - unbiased) as u32;
        f64::from_bits(sign | round_shift(m, shift))
    }
}

/// `value >> shift`, rounded to nearest, ties to even.
fn round_shift(value: u64, shift: u32) -> u64 {
    if shift == 0 {
        return value;
    }
    if shift > 64 {
        return 0;
    }
    let (kept, rem, half) = if shift == 64 {
        (0, value, INTEGER_BIT)
    } else {
        (value >> shift, value & ((1u64 << shift) - 1), 1u64 << (shift - 1))
    };
    if rem > half || (rem == half && kept & 1 == 1) {
        kept + 1
    } else {
        kept
    }
}

impl From<f64> for LongDouble {
    fn from(v: f64) -> Self {
        LongDouble::from_f64(v)
    }
}

impl fmt::Debug for LongDouble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LongDouble({}{:#06x}:{:#018x} ~ {})",
            if self.is_sign_negative() { "-" } else { "+" },
            self.exponent(),
            self.significand(),
            self.to_f64()
        )
    }
}

impl fmt::Display for LongDouble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}
