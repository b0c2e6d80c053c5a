//! Codec entry points, options and error types.
//!
//! [`Codec`] owns a [`Registry`] of packet schemas and the [`DecodeOptions`] used for every
//! decode. Errors carry the field path and the absolute byte offset where they happened.

use crate::packet::{Decoded, Packet};
use crate::schema::{Registry, Schema};
use crate::util::Reader;
use std::fmt;
use std::sync::Arc;

/// What went wrong, independent of where.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ErrorKind {
    #[error("truncated input: need {needed} bytes, {available} available")]
    TruncatedInput { needed: usize, available: usize },
    #[error("value {value} out of range [{min}, {max}]")]
    ValueOutOfRange { value: i128, min: i128, max: i128 },
    #[error("bit position {position} out of range for a {width_bits}-bit field")]
    BitPositionOutOfRange { position: u32, width_bits: u32 },
    #[error("unknown flag name: {0}")]
    UnknownFlagName(String),
    #[error("length mismatch: expected {expected} elements, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("missing field value")]
    MissingField,
    #[error("{}", conditional_message(.assigned))]
    InconsistentConditional { assigned: bool },
    #[error("{remaining} trailing bytes after packet")]
    TrailingData { remaining: usize },
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: &'static str, found: &'static str },
    #[error("unknown field: {0}")]
    UnknownField(String),
    #[error("unknown packet: {0}")]
    UnknownPacket(String),
    #[error("expected a `{expected}` packet, got `{found}`")]
    SchemaMismatch { expected: String, found: String },
    #[error("packet nesting deeper than {0} levels")]
    NestingTooDeep(usize),
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
}

fn conditional_message(assigned: &bool) -> &'static str {
    if *assigned {
        "conditional field has a value but its condition is false"
    } else {
        "conditional field condition holds but no value is assigned"
    }
}

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

/// Location of a failure inside a (possibly nested) packet, outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<packet>");
        }
        for (i, seg) in self.0.iter().enumerate() {
            match seg {
                PathSegment::Field(name) if i == 0 => write!(f, "{}", name)?,
                PathSegment::Field(name) => write!(f, ".{}", name)?,
                PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

/// A codec failure: the kind, the field path and the absolute byte offset.
///
/// For decode the offset is a position in the input buffer; for encode it is
/// the length of the output written so far.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{path} @ byte {offset}: {kind}")]
pub struct CodecError {
    pub kind: ErrorKind,
    pub path: FieldPath,
    pub offset: usize,
}

impl CodecError {
    pub fn new(kind: ErrorKind, offset: usize) -> Self {
        CodecError {
            kind,
            path: FieldPath::default(),
            offset,
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Prefix the path with a field name (called while unwinding out of that field).
    pub fn in_field(mut self, name: &str) -> Self {
        self.path.0.insert(0, PathSegment::Field(name.to_string()));
        self
    }

    /// Prefix the path with an array index.
    pub fn at_index(mut self, index: usize) -> Self {
        self.path.0.insert(0, PathSegment::Index(index));
        self
    }

    /// Set the offset, for errors raised by position-agnostic helpers.
    pub fn at(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

impl From<ErrorKind> for CodecError {
    fn from(kind: ErrorKind) -> Self {
        CodecError::new(kind, 0)
    }
}

/// Knobs for decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Fail with `TrailingData` when bytes remain after the top-level packet.
    pub strict_length: bool,
    /// Maximum nesting of packet fields (guards recursive schemas).
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            strict_length: false,
            max_depth: 32,
        }
    }
}

impl DecodeOptions {
    pub fn strict() -> Self {
        DecodeOptions {
            strict_length: true,
            ..Default::default()
        }
    }
}

/// State threaded through one encode or decode call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Context<'a> {
    pub registry: &'a Registry,
    pub options: &'a DecodeOptions,
    pub depth: usize,
}

impl<'a> Context<'a> {
    pub fn new(registry: &'a Registry, options: &'a DecodeOptions) -> Self {
        Context {
            registry,
            options,
            depth: 0,
        }
    }

    /// Context for one level deeper; fails past `max_depth`.
    pub fn nested(&self, offset: usize) -> Result<Context<'a>, CodecError> {
        if self.depth >= self.options.max_depth {
            return Err(CodecError::new(ErrorKind::NestingTooDeep(self.options.max_depth), offset));
        }
        Ok(Context {
            depth: self.depth + 1,
            ..*self
        })
    }
}

/// Encoder/decoder over a registry of named packet schemas.
#[derive(Debug, Default)]
pub struct Codec {
    registry: Registry,
    options: DecodeOptions,
}

impl Codec {
    pub fn new(registry: Registry) -> Self {
        Codec {
            registry,
            options: DecodeOptions::default(),
        }
    }

    pub fn with_options(registry: Registry, options: DecodeOptions) -> Self {
        Codec { registry, options }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Empty packet instance for a registered schema.
    pub fn new_packet(&self, name: &str) -> Result<Packet, CodecError> {
        Ok(Packet::new(self.schema(name)?))
    }

    /// Decode a packet of the named schema from the start of `bytes`.
    pub fn decode(&self, name: &str, bytes: &[u8]) -> Result<Decoded, CodecError> {
        self.decode_at(name, bytes, 0)
    }

    /// Decode a packet of the named schema starting at `offset`.
    pub fn decode_at(&self, name: &str, bytes: &[u8], offset: usize) -> Result<Decoded, CodecError> {
        let schema = self.schema(name)?;
        self.decode_schema_at(&schema, bytes, offset)
    }

    /// Decode with a schema that need not be registered (its named references still resolve here).
    pub fn decode_schema(&self, schema: &Arc<Schema>, bytes: &[u8]) -> Result<Decoded, CodecError> {
        self.decode_schema_at(schema, bytes, 0)
    }

    pub fn decode_schema_at(&self, schema: &Arc<Schema>, bytes: &[u8], offset: usize) -> Result<Decoded, CodecError> {
        let ctx = Context::new(&self.registry, &self.options);
        let mut r = Reader::at(bytes, offset)?;
        let packet = Packet::decode_from(schema, &mut r, &ctx)?;
        let consumed = r.position() - offset;
        if self.options.strict_length && r.remaining() > 0 {
            return Err(CodecError::new(
                ErrorKind::TrailingData {
                    remaining: r.remaining(),
                },
                r.position(),
            ));
        }
        tracing::debug!(packet = schema.name(), offset, consumed, "decoded packet");
        Ok(Decoded { packet, consumed })
    }

    /// Encode a fully populated packet.
    pub fn encode(&self, packet: &Packet) -> Result<Vec<u8>, CodecError> {
        let ctx = Context::new(&self.registry, &self.options);
        let mut out = Vec::new();
        packet.encode_into(&mut out, &ctx)?;
        tracing::debug!(packet = packet.schema().name(), len = out.len(), "encoded packet");
        Ok(out)
    }

    fn schema(&self, name: &str) -> Result<Arc<Schema>, CodecError> {
        self.registry
            .get(name)
            .cloned()
            .ok_or_else(|| CodecError::from(ErrorKind::UnknownPacket(name.to_string())))
    }
}
