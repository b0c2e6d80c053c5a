//! Packet instances: a schema plus one value slot per field.

use crate::codec::{CodecError, Context, DecodeOptions, ErrorKind};
use crate::field::Field;
use crate::schema::{Registry, Schema};
use crate::util::Reader;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Result of a decode: the packet and how many bytes it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub packet: Packet,
    pub consumed: usize,
}

/// Values for one schema, kept in schema order.
///
/// Absent conditional fields simply have no value. Two packets are equal when they use
/// the same schema (same `Arc`, or an identical definition) and hold equal values.
#[derive(Debug, Clone)]
pub struct Packet {
    schema: Arc<Schema>,
    values: Vec<Option<Value>>,
}

impl Packet {
    pub fn new(schema: Arc<Schema>) -> Self {
        let values = vec![None; schema.len()];
        Packet { schema, values }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    fn slot(&self, name: &str) -> Result<usize, CodecError> {
        self.schema
            .index_of(name)
            .ok_or_else(|| CodecError::from(ErrorKind::UnknownField(name.to_string())))
    }

    /// Assign a field. Type and range are checked at encode time.
    ///
    /// Values a float field widens on encode are stored already widened (an integer or
    /// `f32` set on a double field is kept as `Value::Double`), so the packet equals its
    /// own decode.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self, CodecError> {
        let i = self.slot(name)?;
        let value = self.schema.fields()[i].field().normalize(value.into());
        self.values[i] = Some(value);
        Ok(self)
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Result<Self, CodecError> {
        self.set(name, value)?;
        Ok(self)
    }

    pub fn unset(&mut self, name: &str) -> Option<Value> {
        let i = self.schema.index_of(name)?;
        self.values[i].take()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema.index_of(name).and_then(|i| self.values[i].as_ref())
    }

    pub fn get_int(&self, name: &str) -> Option<i128> {
        self.get(name).and_then(Value::as_int)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Assigned fields in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.schema
            .fields()
            .iter()
            .zip(&self.values)
            .filter_map(|(def, v)| v.as_ref().map(|v| (def.name(), v)))
    }

    /// Number of assigned fields.
    pub fn len(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fields that must be assigned before encode: unconditional ones, and conditional
    /// ones whose condition holds for the current values.
    pub fn missing_fields(&self) -> Vec<&str> {
        self.schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(i, def)| self.values[*i].is_none() && self.required(def.condition()))
            .map(|(_, def)| def.name())
            .collect()
    }

    /// True when encode will not fail for a missing value.
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    fn required(&self, condition: Option<&crate::schema::Condition>) -> bool {
        match condition {
            None => true,
            Some(c) => c.evaluate(self.get(c.field())),
        }
    }

    /// Encode with no registry; fine unless the schema refers to packets by name.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let registry = Registry::default();
        let options = DecodeOptions::default();
        let mut out = Vec::new();
        self.encode_into(&mut out, &Context::new(&registry, &options))?;
        Ok(out)
    }

    /// Lenient decode from the start of `bytes` with no registry.
    pub fn decode(schema: &Arc<Schema>, bytes: &[u8]) -> Result<Decoded, CodecError> {
        let registry = Registry::default();
        let options = DecodeOptions::default();
        let mut r = Reader::new(bytes);
        let packet = Packet::decode_from(schema, &mut r, &Context::new(&registry, &options))?;
        Ok(Decoded {
            packet,
            consumed: r.position(),
        })
    }

    pub(crate) fn encode_into(&self, out: &mut Vec<u8>, ctx: &Context<'_>) -> Result<(), CodecError> {
        let fields = self.schema.fields();
        for (i, def) in fields.iter().enumerate() {
            let slot = self.values[i].as_ref();
            let at = out.len();
            let value = match (def.condition(), slot) {
                (None, Some(v)) => v,
                (None, None) => return Err(CodecError::new(ErrorKind::MissingField, at).in_field(def.name())),
                (Some(cond), slot) => {
                    let holds = cond.evaluate(self.get(cond.field()));
                    match (holds, slot) {
                        (true, Some(v)) => v,
                        (false, None) => continue,
                        (holds, _) => {
                            return Err(CodecError::new(ErrorKind::InconsistentConditional { assigned: !holds }, at)
                                .in_field(def.name()))
                        }
                    }
                }
            };
            let result = match (def.field(), value) {
                (Field::Array(a), Value::List(items)) if a.is_prefixed() => {
                    let n = self.prefix_count(i, at)?;
                    a.encode_into(items, Some(n), out, ctx)
                }
                (field, value) => field.encode_into(value, out, ctx),
            };
            result.map_err(|e| e.in_field(def.name()))?;
            tracing::trace!(field = def.name(), offset = at, len = out.len() - at, "encoded field");
        }
        Ok(())
    }

    pub(crate) fn decode_from(schema: &Arc<Schema>, r: &mut Reader<'_>, ctx: &Context<'_>) -> Result<Packet, CodecError> {
        let mut packet = Packet::new(Arc::clone(schema));
        for (i, def) in schema.fields().iter().enumerate() {
            let at = r.position();
            if let Some(cond) = def.condition() {
                if !cond.evaluate(packet.get(cond.field())) {
                    tracing::debug!(field = def.name(), offset = at, "conditional field absent");
                    continue;
                }
            }
            let value = match def.field() {
                Field::Array(a) if a.is_prefixed() => {
                    let n = packet.prefix_count(i, at)?;
                    a.decode_prefixed(r, n, ctx).map(Value::List)
                }
                field => field.decode_from(r, ctx),
            }
            .map_err(|e| e.in_field(def.name()))?;
            tracing::trace!(field = def.name(), offset = at, len = r.position() - at, "decoded field");
            packet.values[i] = Some(value);
        }
        Ok(packet)
    }

    /// Element count for the length-prefixed array at index `i`, read from field `i - 1`.
    fn prefix_count(&self, i: usize, offset: usize) -> Result<usize, CodecError> {
        let defs = self.schema.fields();
        let prev = &defs[i - 1];
        let raw = self.values[i - 1]
            .as_ref()
            .and_then(Value::as_int)
            .ok_or_else(|| CodecError::new(ErrorKind::MissingField, offset).in_field(prev.name()))?;
        usize::try_from(raw).map_err(|_| {
            CodecError::new(
                ErrorKind::ValueOutOfRange {
                    value: raw,
                    min: 0,
                    max: usize::MAX as i128,
                },
                offset,
            )
            .in_field(prev.name())
        })
    }
}

impl PartialEq for Packet {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.schema, &other.schema) || self.schema == other.schema) && self.values == other.values
    }
}

impl Packet {
    fn write_tree(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        writeln!(f, "{} {{", self.name())?;
        for (name, value) in self.iter() {
            write!(f, "{:width$}{}: ", "", name, width = indent + 2)?;
            match value {
                Value::Packet(p) => p.write_tree(f, indent + 2)?,
                v => writeln!(f, "{}", v)?,
            }
        }
        writeln!(f, "{:width$}}}", "", width = indent)
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f, 0)
    }
}
