//! Repetition of an inner field.

use crate::codec::{CodecError, Context, DecodeOptions, ErrorKind};
use crate::field::Field;
use crate::schema::Registry;
use crate::util::Reader;
use crate::value::Value;

/// How many elements an [`ArrayField`] holds.
#[derive(Debug, Clone, PartialEq)]
pub enum Count {
    /// A literal count fixed by the schema.
    Fixed(usize),
    /// The value of the immediately-preceding sibling field.
    Prefixed,
}

/// An inner field repeated `count` times back to back. The array never writes its own length.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayField {
    element: Box<Field>,
    count: Count,
}

impl ArrayField {
    pub fn fixed(element: Field, count: usize) -> Self {
        ArrayField {
            element: Box::new(element),
            count: Count::Fixed(count),
        }
    }

    /// Array whose length is the value of the field declared just before it.
    pub fn prefixed(element: Field) -> Self {
        ArrayField {
            element: Box::new(element),
            count: Count::Prefixed,
        }
    }

    pub fn element(&self) -> &Field {
        &self.element
    }

    pub fn count(&self) -> &Count {
        &self.count
    }

    pub fn is_prefixed(&self) -> bool {
        self.count == Count::Prefixed
    }

    /// Decode exactly `count` elements at `offset`, whatever the count policy.
    pub fn decode_counted(&self, buf: &[u8], offset: usize, count: usize) -> Result<(Vec<Value>, usize), CodecError> {
        let registry = Registry::default();
        let options = DecodeOptions::default();
        let ctx = Context::new(&registry, &options);
        let mut r = Reader::at(buf, offset)?;
        let items = self.decode_n(&mut r, count, &ctx)?;
        Ok((items, r.position() - offset))
    }

    /// Encode `items`, checking them against `expected` elements when that is known.
    pub(crate) fn encode_into(
        &self,
        items: &[Value],
        expected: Option<usize>,
        out: &mut Vec<u8>,
        ctx: &Context<'_>,
    ) -> Result<(), CodecError> {
        let expected = match (&self.count, expected) {
            (Count::Fixed(n), _) => Some(*n),
            (Count::Prefixed, e) => e,
        };
        if let Some(n) = expected {
            if items.len() != n {
                return Err(CodecError::new(
                    ErrorKind::LengthMismatch {
                        expected: n,
                        actual: items.len(),
                    },
                    out.len(),
                ));
            }
        }
        for (i, item) in items.iter().enumerate() {
            self.element.encode_into(item, out, ctx).map_err(|e| e.at_index(i))?;
        }
        Ok(())
    }

    /// Decode a count read from the input. When elements may be empty, every element
    /// must still be backed by at least one remaining byte.
    pub(crate) fn decode_prefixed(
        &self,
        r: &mut Reader<'_>,
        count: usize,
        ctx: &Context<'_>,
    ) -> Result<Vec<Value>, CodecError> {
        if self.element.min_width() == 0 {
            r.require(count)?;
        }
        self.decode_n(r, count, ctx)
    }

    pub(crate) fn decode_n(&self, r: &mut Reader<'_>, count: usize, ctx: &Context<'_>) -> Result<Vec<Value>, CodecError> {
        // Reject impossible counts before allocating for them.
        let min = self.element.min_width();
        if min > 0 {
            r.require(count.saturating_mul(min))?;
        }
        let mut items = Vec::with_capacity(count.min(r.remaining().max(1)));
        for i in 0..count {
            let item = self.element.decode_from(r, ctx).map_err(|e| e.at_index(i))?;
            items.push(item);
        }
        Ok(items)
    }
}
