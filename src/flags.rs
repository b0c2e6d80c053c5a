//! Named bit flags packed into one unsigned integer.

use crate::codec::{CodecError, ErrorKind};
use crate::scalar::IntField;
use crate::util::{self, Endianness, Reader};
use std::fmt;

/// An unsigned integer field viewed as a set of named bits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlagField {
    int: IntField,
    flags: Vec<(String, u32)>,
}

impl FlagField {
    /// Flags over a `width`-byte unsigned integer. Bit positions are LSB-0.
    pub fn new<S, I>(width: usize, endianness: Endianness, flags: I) -> Result<Self, CodecError>
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, u32)>,
    {
        let int = IntField::new(width, false, endianness)?;
        let mut out: Vec<(String, u32)> = Vec::new();
        for (name, bit) in flags {
            let name = name.into();
            util::extract_bit(0, bit, width)?;
            if out.iter().any(|(n, _)| *n == name) {
                return Err(CodecError::from(ErrorKind::InvalidSchema(format!("duplicate flag name `{}`", name))));
            }
            if let Some((other, _)) = out.iter().find(|(_, b)| *b == bit) {
                return Err(CodecError::from(ErrorKind::InvalidSchema(format!(
                    "flags `{}` and `{}` share bit {}",
                    other, name, bit
                ))));
            }
            out.push((name, bit));
        }
        Ok(FlagField { int, flags: out })
    }

    pub fn width(&self) -> usize {
        self.int.width()
    }

    pub fn endianness(&self) -> Endianness {
        self.int.endianness()
    }

    /// Declared flags in declaration order.
    pub fn flags(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.flags.iter().map(|(n, b)| (n.as_str(), *b))
    }

    pub fn bit_of(&self, name: &str) -> Option<u32> {
        self.flags.iter().find(|(n, _)| n == name).map(|(_, b)| *b)
    }

    fn named_mask(&self) -> u64 {
        self.flags.iter().fold(0, |m, (_, b)| m | (1u64 << b))
    }

    /// Pack a flag set into the underlying integer.
    pub fn compose(&self, set: &FlagSet) -> Result<u64, CodecError> {
        let mut raw = set.reserved & !self.named_mask() & util::max_uint(self.width());
        for (name, on) in set.iter() {
            let bit = self
                .bit_of(name)
                .ok_or_else(|| CodecError::from(ErrorKind::UnknownFlagName(name.to_string())))?;
            raw = util::set_bit(raw, bit, on, self.width())?;
        }
        Ok(raw)
    }

    /// View an integer as a flag set. Bits no flag names are kept as reserved bits.
    pub fn view(&self, raw: u64) -> FlagSet {
        FlagSet {
            flags: self
                .flags
                .iter()
                .map(|(n, b)| (n.clone(), (raw >> b) & 1 != 0))
                .collect(),
            reserved: raw & !self.named_mask(),
        }
    }

    pub(crate) fn encode_into(&self, set: &FlagSet, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let raw = self.compose(set).map_err(|e| e.at(out.len()))?;
        self.int.encode_into(raw as i128, out)
    }

    pub(crate) fn decode_from(&self, r: &mut Reader<'_>) -> Result<FlagSet, CodecError> {
        let raw = self.int.decode_from(r)? as u64;
        Ok(self.view(raw))
    }
}

/// Flag name to bool mapping, plus the bits of the backing integer that no flag names.
///
/// A set built by hand has no reserved bits; a decoded set carries whatever the producer
/// put there, so re-encoding it reproduces the original integer. Equality looks at which
/// flags are on and at the reserved bits, so an omitted flag equals one set to `false`.
#[derive(Debug, Clone, Default)]
pub struct FlagSet {
    flags: Vec<(String, bool)>,
    reserved: u64,
}

impl FlagSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, on: bool) -> Self {
        self.set(name, on);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, on: bool) {
        let name = name.into();
        match self.flags.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = on,
            None => self.flags.push((name, on)),
        }
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        self.flags.iter().find(|(n, _)| n == name).map(|(_, on)| *on)
    }

    /// `true` only if the flag is present and on.
    pub fn is_set(&self, name: &str) -> bool {
        self.get(name).unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> + '_ {
        self.flags.iter().map(|(n, on)| (n.as_str(), *on))
    }

    pub fn reserved(&self) -> u64 {
        self.reserved
    }

    pub fn with_reserved(mut self, bits: u64) -> Self {
        self.reserved = bits;
        self
    }

    fn on_names(&self) -> Vec<&str> {
        let mut on: Vec<&str> = self.flags.iter().filter(|(_, on)| *on).map(|(n, _)| n.as_str()).collect();
        on.sort_unstable();
        on.dedup();
        on
    }
}

impl PartialEq for FlagSet {
    fn eq(&self, other: &Self) -> bool {
        self.reserved == other.reserved && self.on_names() == other.on_names()
    }
}

impl<S: Into<String>> FromIterator<(S, bool)> for FlagSet {
    fn from_iter<T: IntoIterator<Item = (S, bool)>>(iter: T) -> Self {
        let mut set = FlagSet::new();
        for (name, on) in iter {
            set.set(name, on);
        }
        set
    }
}

impl fmt::Display for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}", self.on_names().join(", "))?;
        if self.reserved != 0 {
            write!(f, " | reserved {:#x}", self.reserved)?;
        }
        write!(f, "}}")
    }
}
