//! The field contract shared by every field kind.
//!
//! A [`Field`] is a closed set of kinds; each knows its width and how to encode
//! a [`Value`] and decode one back from a buffer.

use crate::array::{ArrayField, Count};
use crate::codec::{CodecError, Context, DecodeOptions, ErrorKind};
use crate::flags::FlagField;
use crate::packet::Packet;
use crate::scalar::{FloatField, FloatKind, IntField, LongDouble};
use crate::schema::{Registry, Schema};
use crate::util::Reader;
use crate::value::Value;
use std::sync::Arc;

/// One field kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Int(IntField),
    Float(FloatField),
    Flags(FlagField),
    Array(ArrayField),
    Packet(PacketField),
}

/// Where a nested packet schema comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaRef {
    Inline(Arc<Schema>),
    /// Looked up in the codec's registry when used, which allows recursive schemas.
    Named(String),
}

impl SchemaRef {
    pub fn name(&self) -> &str {
        match self {
            SchemaRef::Inline(s) => s.name(),
            SchemaRef::Named(n) => n,
        }
    }

    pub(crate) fn resolve(&self, registry: &Registry, offset: usize) -> Result<Arc<Schema>, CodecError> {
        match self {
            SchemaRef::Inline(s) => Ok(Arc::clone(s)),
            SchemaRef::Named(n) => registry
                .get(n)
                .cloned()
                .ok_or_else(|| CodecError::new(ErrorKind::UnknownPacket(n.clone()), offset)),
        }
    }
}

/// A whole packet embedded as one field.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketField {
    schema: SchemaRef,
}

impl PacketField {
    pub fn new(schema: Arc<Schema>) -> Self {
        PacketField {
            schema: SchemaRef::Inline(schema),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        PacketField {
            schema: SchemaRef::Named(name.into()),
        }
    }

    pub fn schema_ref(&self) -> &SchemaRef {
        &self.schema
    }

    fn encode_into(&self, packet: &Packet, out: &mut Vec<u8>, ctx: &Context<'_>) -> Result<(), CodecError> {
        let schema = self.schema.resolve(ctx.registry, out.len())?;
        if !Arc::ptr_eq(&schema, packet.schema()) && *schema != **packet.schema() {
            return Err(CodecError::new(
                ErrorKind::SchemaMismatch {
                    expected: schema.name().to_string(),
                    found: packet.schema().name().to_string(),
                },
                out.len(),
            ));
        }
        let ctx = ctx.nested(out.len())?;
        packet.encode_into(out, &ctx)
    }

    fn decode_from(&self, r: &mut Reader<'_>, ctx: &Context<'_>) -> Result<Packet, CodecError> {
        let schema = self.schema.resolve(ctx.registry, r.position())?;
        let ctx = ctx.nested(r.position())?;
        Packet::decode_from(&schema, r, &ctx)
    }
}

impl Field {
    pub fn array(element: Field, count: usize) -> Self {
        Field::Array(ArrayField::fixed(element, count))
    }

    pub fn prefixed_array(element: Field) -> Self {
        Field::Array(ArrayField::prefixed(element))
    }

    pub fn packet(schema: Arc<Schema>) -> Self {
        Field::Packet(PacketField::new(schema))
    }

    pub fn packet_named(name: impl Into<String>) -> Self {
        Field::Packet(PacketField::named(name))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Field::Int(_) => "integer",
            Field::Float(f) => match f.kind() {
                FloatKind::Single => "float",
                FloatKind::Double => "double",
                FloatKind::LongDouble => "long double",
            },
            Field::Flags(_) => "flag set",
            Field::Array(_) => "list",
            Field::Packet(_) => "packet",
        }
    }

    /// Width in bytes when it does not depend on the data.
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            Field::Int(f) => Some(f.width()),
            Field::Float(f) => Some(f.width()),
            Field::Flags(f) => Some(f.width()),
            Field::Array(a) => match a.count() {
                Count::Fixed(n) => a.element().fixed_width().and_then(|w| w.checked_mul(*n)),
                Count::Prefixed => None,
            },
            Field::Packet(p) => match p.schema_ref() {
                SchemaRef::Inline(s) => s.fixed_size(),
                SchemaRef::Named(_) => None,
            },
        }
    }

    /// Smallest number of bytes this field can occupy. Named packet references count as zero.
    pub fn min_width(&self) -> usize {
        match self {
            Field::Int(f) => f.width(),
            Field::Float(f) => f.width(),
            Field::Flags(f) => f.width(),
            Field::Array(a) => match a.count() {
                Count::Fixed(n) => a.element().min_width().saturating_mul(*n),
                Count::Prefixed => 0,
            },
            Field::Packet(p) => match p.schema_ref() {
                SchemaRef::Inline(s) => s.min_size(),
                SchemaRef::Named(_) => 0,
            },
        }
    }

    /// Encode one value on its own. Named packet references cannot be resolved here.
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let registry = Registry::default();
        let options = DecodeOptions::default();
        let mut out = Vec::new();
        self.encode_into(value, &mut out, &Context::new(&registry, &options))?;
        Ok(out)
    }

    /// Decode one value at `offset`, returning it with the number of bytes consumed.
    pub fn decode(&self, buf: &[u8], offset: usize) -> Result<(Value, usize), CodecError> {
        let registry = Registry::default();
        let options = DecodeOptions::default();
        let mut r = Reader::at(buf, offset)?;
        let value = self.decode_from(&mut r, &Context::new(&registry, &options))?;
        Ok((value, r.position() - offset))
    }

    /// Widen `value` to what decoding this field yields, when encode would widen it anyway.
    /// Anything else is returned untouched for encode to accept or reject.
    pub(crate) fn normalize(&self, value: Value) -> Value {
        match (self, value) {
            (Field::Float(f), v) => match (f.kind(), v) {
                (FloatKind::Single, Value::Int(x)) => Value::Float(x as f32),
                (FloatKind::Double, Value::Float(x)) => Value::Double(x as f64),
                (FloatKind::Double, Value::Int(x)) => Value::Double(x as f64),
                (FloatKind::LongDouble, Value::Double(x)) => Value::LongDouble(LongDouble::from_f64(x)),
                (FloatKind::LongDouble, Value::Float(x)) => Value::LongDouble(LongDouble::from_f64(x as f64)),
                (FloatKind::LongDouble, Value::Int(x)) => Value::LongDouble(LongDouble::from_f64(x as f64)),
                (_, v) => v,
            },
            (Field::Array(a), Value::List(items)) => {
                Value::List(items.into_iter().map(|v| a.element().normalize(v)).collect())
            }
            (_, v) => v,
        }
    }

    pub(crate) fn encode_into(&self, value: &Value, out: &mut Vec<u8>, ctx: &Context<'_>) -> Result<(), CodecError> {
        let mismatch = |at: usize| {
            CodecError::new(
                ErrorKind::TypeMismatch {
                    expected: self.type_name(),
                    found: value.type_name(),
                },
                at,
            )
        };
        match (self, value) {
            (Field::Int(f), Value::Int(v)) => f.encode_into(*v, out),
            (Field::Float(f), v) => {
                match (f.kind(), v) {
                    (FloatKind::Single, Value::Float(x)) => f.write_f32(*x, out),
                    (FloatKind::Single, Value::Int(x)) => f.write_f32(*x as f32, out),
                    (FloatKind::Double, Value::Double(x)) => f.write_f64(*x, out),
                    (FloatKind::Double, Value::Float(x)) => f.write_f64(*x as f64, out),
                    (FloatKind::Double, Value::Int(x)) => f.write_f64(*x as f64, out),
                    (FloatKind::LongDouble, Value::LongDouble(x)) => f.write_long_double(*x, out),
                    (FloatKind::LongDouble, Value::Double(x)) => f.write_long_double(LongDouble::from_f64(*x), out),
                    (FloatKind::LongDouble, Value::Float(x)) => {
                        f.write_long_double(LongDouble::from_f64(*x as f64), out)
                    }
                    (FloatKind::LongDouble, Value::Int(x)) => f.write_long_double(LongDouble::from_f64(*x as f64), out),
                    _ => return Err(mismatch(out.len())),
                }
                Ok(())
            }
            (Field::Flags(f), Value::Flags(set)) => f.encode_into(set, out),
            (Field::Array(a), Value::List(items)) => a.encode_into(items, None, out, ctx),
            (Field::Packet(p), Value::Packet(packet)) => p.encode_into(packet, out, ctx),
            _ => Err(mismatch(out.len())),
        }
    }

    pub(crate) fn decode_from(&self, r: &mut Reader<'_>, ctx: &Context<'_>) -> Result<Value, CodecError> {
        match self {
            Field::Int(f) => f.decode_from(r).map(Value::Int),
            Field::Float(f) => match f.kind() {
                FloatKind::Single => f.read_f32(r).map(Value::Float),
                FloatKind::Double => f.read_f64(r).map(Value::Double),
                FloatKind::LongDouble => f.read_long_double(r).map(Value::LongDouble),
            },
            Field::Flags(f) => f.decode_from(r).map(Value::Flags),
            Field::Array(a) => match a.count() {
                Count::Fixed(n) => a.decode_n(r, *n, ctx).map(Value::List),
                Count::Prefixed => Err(CodecError::new(
                    ErrorKind::InvalidSchema("length-prefixed array decoded without its length field".to_string()),
                    r.position(),
                )),
            },
            Field::Packet(p) => p.decode_from(r, ctx).map(|packet| Value::Packet(Box::new(packet))),
        }
    }
}

impl From<IntField> for Field {
    fn from(f: IntField) -> Self {
        Field::Int(f)
    }
}

impl From<FloatField> for Field {
    fn from(f: FloatField) -> Self {
        Field::Float(f)
    }
}

impl From<FlagField> for Field {
    fn from(f: FlagField) -> Self {
        Field::Flags(f)
    }
}

impl From<ArrayField> for Field {
    fn from(f: ArrayField) -> Self {
        Field::Array(f)
    }
}

impl From<PacketField> for Field {
    fn from(f: PacketField) -> Self {
        Field::Packet(f)
    }
}
