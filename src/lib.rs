//! # fieldpack: typed binary packet codec
//!
//! Describe a packet as an ordered list of typed fields, then encode values to bytes
//! and decode bytes back to values. Decoding is a single forward walk: each field
//! consumes a prefix of the remaining buffer, and later fields may depend on values
//! decoded earlier (array lengths, conditional presence).
//!
//! ## Field kinds
//!
//! - Integers: 1, 2, 4 or 8 bytes, signed or unsigned, big or little endian
//! - Floats: binary32, binary64 and x87 extended precision (`long double`, 16-byte slot)
//! - Flags: an unsigned integer viewed as named bits
//! - Arrays: an inner field repeated a fixed count or a count taken from the previous field
//! - Packets: a whole schema nested as one field, inline or by registry name
//!
//! Fields can be conditional on an earlier field (`kind == 2`, `flags.ack`); absent
//! fields occupy no bytes.
//!
//! ## Example DSL
//!
//! ```text
//! packet Reading {
//!   flags: flags(u8) { calibrated: 0, extended: 1 };
//!   count: u16;
//!   samples: f32[count];
//!   extra: u32 if flags.extended;
//! }
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use fieldpack::{Codec, Registry};
//!
//! let codec = Codec::new(Registry::from_dsl(SOURCE)?);
//! let decoded = codec.decode("Reading", &bytes)?;
//! let again = codec.encode(&decoded.packet)?;
//! assert_eq!(again, bytes[..decoded.consumed]);
//! ```
//!
//! Schemas can also be built in code with [`Schema::builder`].

pub mod array;
pub mod codec;
pub mod field;
pub mod flags;
pub mod packet;
pub mod parser;
pub mod scalar;
pub mod schema;
pub mod util;
pub mod value;

pub use array::{ArrayField, Count};
pub use codec::{Codec, CodecError, DecodeOptions, ErrorKind, FieldPath, PathSegment};
pub use field::{Field, PacketField, SchemaRef};
pub use flags::{FlagField, FlagSet};
pub use packet::{Decoded, Packet};
pub use parser::parse;
pub use scalar::{FloatField, FloatKind, IntField, LongDouble, LONG_DOUBLE_WIDTH};
pub use schema::{Condition, FieldDef, Registry, Schema, SchemaBuilder, Test};
pub use util::{extract_bit, read_int, read_uint, set_bit, write_int, write_uint, Endianness, Reader};
pub use value::Value;
