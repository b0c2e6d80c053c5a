//! Parse packet schema DSL source using PEST.
//!
//! ```text
//! default_endian little;          # optional, big endian otherwise
//!
//! packet Header {
//!     kind: u8;
//!     flags: flags(u8) { ack: 0, syn: 1 };
//!     len: u16be;
//!     items: i32[len];            # count read from the field just before
//!     coords: f64[3];
//!     extra: u32 if flags.ack;
//!     body: Body if kind == 2;    # packets are referenced by name
//! }
//! ```

use crate::array::ArrayField;
use crate::field::Field;
use crate::flags::FlagField;
use crate::scalar::{FloatField, IntField};
use crate::schema::{Condition, Schema, SchemaBuilder};
use crate::util::Endianness;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "grammar.pest"]
struct SchemaParser;

type Pair<'i> = pest::iterators::Pair<'i, Rule>;

/// Parse DSL source into schemas, in declaration order.
pub fn parse(source: &str) -> Result<Vec<Schema>, String> {
    let pairs = SchemaParser::parse(Rule::schema_file, source).map_err(|e| format!("Parse error: {}", e))?;
    let file = pairs.into_iter().next().ok_or("Empty parse")?;
    let mut endianness = Endianness::Big;
    let mut schemas = Vec::new();
    for inner in file.into_inner() {
        match inner.as_rule() {
            Rule::default_endian => {
                let e = inner.into_inner().next().ok_or("default_endian: missing value")?;
                endianness = match e.as_str() {
                    "little" => Endianness::Little,
                    _ => Endianness::Big,
                };
            }
            Rule::packet_section => schemas.push(build_packet(inner, endianness)?),
            _ => {}
        }
    }
    Ok(schemas)
}

fn build_packet(pair: Pair<'_>, endianness: Endianness) -> Result<Schema, String> {
    let mut it = pair.into_inner();
    let name = it.next().ok_or("packet: missing name")?.as_str().to_string();
    let mut builder = Schema::builder(name.clone());
    let mut previous: Option<String> = None;
    for field in it {
        if field.as_rule() != Rule::packet_field {
            continue;
        }
        let (field_name, kind, condition) = build_field(field, endianness, previous.as_deref())?;
        builder = add(builder, &field_name, kind, condition);
        previous = Some(field_name);
    }
    builder.build().map_err(|e| e.to_string())
}

fn add(builder: SchemaBuilder, name: &str, field: Field, condition: Option<Condition>) -> SchemaBuilder {
    match condition {
        Some(c) => builder.conditional(name, field, c),
        None => builder.field(name, field),
    }
}

fn build_field(
    pair: Pair<'_>,
    endianness: Endianness,
    previous: Option<&str>,
) -> Result<(String, Field, Option<Condition>), String> {
    let mut name = String::new();
    let mut field = None;
    let mut condition = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::ident => name = inner.as_str().to_string(),
            Rule::type_spec => field = Some(build_type_spec(inner, endianness, &name, previous)?),
            Rule::condition => condition = Some(build_condition(inner)?),
            _ => {}
        }
    }
    let field = field.ok_or_else(|| format!("field `{}`: missing type", name))?;
    Ok((name, field, condition))
}

fn build_type_spec(pair: Pair<'_>, endianness: Endianness, name: &str, previous: Option<&str>) -> Result<Field, String> {
    let mut it = pair.into_inner();
    let element = build_element(it.next().ok_or("type_spec: missing element type")?, endianness)?;
    let Some(suffix) = it.next() else {
        return Ok(element);
    };
    let len = suffix.into_inner().next().ok_or("array: missing length")?;
    match len.as_rule() {
        Rule::num => {
            let n = parse_int(len.as_str())?;
            let n = usize::try_from(n).map_err(|_| format!("array `{}`: bad length {}", name, n))?;
            Ok(Field::Array(ArrayField::fixed(element, n)))
        }
        Rule::ident if Some(len.as_str()) == previous => Ok(Field::Array(ArrayField::prefixed(element))),
        Rule::ident => Err(format!(
            "array `{}`: length `{}` must name the field declared just before it",
            name,
            len.as_str()
        )),
        _ => Err("array: unexpected length".to_string()),
    }
}

fn build_element(pair: Pair<'_>, endianness: Endianness) -> Result<Field, String> {
    let inner = pair.into_inner().next().ok_or("Empty element type")?;
    match inner.as_rule() {
        Rule::scalar_type => parse_scalar(inner.as_str(), endianness),
        Rule::flags_type => {
            let mut it = inner.into_inner();
            let base = it.next().ok_or("flags: missing integer type")?;
            let int = match parse_scalar(base.as_str(), endianness)? {
                Field::Int(i) if !i.is_signed() => i,
                _ => return Err(format!("flags({}): backing type must be an unsigned integer", base.as_str())),
            };
            let mut bits = Vec::new();
            for bit in it {
                let mut b = bit.into_inner();
                let flag = b.next().ok_or("flag: missing name")?.as_str().to_string();
                let pos = parse_int(b.next().ok_or("flag: missing bit")?.as_str())?;
                let pos = u32::try_from(pos).map_err(|_| format!("flag `{}`: bad bit {}", flag, pos))?;
                bits.push((flag, pos));
            }
            FlagField::new(int.width(), int.endianness(), bits)
                .map(Field::Flags)
                .map_err(|e| e.to_string())
        }
        Rule::packet_ref => Ok(Field::packet_named(inner.as_str())),
        _ => Err(format!("Unhandled type rule: {:?}", inner.as_rule())),
    }
}

fn parse_scalar(s: &str, default: Endianness) -> Result<Field, String> {
    let (base, endianness) = if let Some(b) = s.strip_suffix("be") {
        (b, Endianness::Big)
    } else if let Some(b) = s.strip_suffix("le") {
        (b, Endianness::Little)
    } else {
        (s, default)
    };
    let int = |width: usize, signed: bool| IntField::new(width, signed, endianness).map(Field::Int).map_err(|e| e.to_string());
    match base {
        "u8" => int(1, false),
        "u16" => int(2, false),
        "u32" => int(4, false),
        "u64" => int(8, false),
        "i8" => int(1, true),
        "i16" => int(2, true),
        "i32" => int(4, true),
        "i64" => int(8, true),
        "f32" => Ok(Field::Float(FloatField::single(endianness))),
        "f64" => Ok(Field::Float(FloatField::double(endianness))),
        "f80" => Ok(Field::Float(FloatField::long_double(endianness))),
        _ => Err(format!("Unknown scalar type: {}", s)),
    }
}

fn build_condition(pair: Pair<'_>) -> Result<Condition, String> {
    let inner = pair.into_inner().next().ok_or("Empty condition")?;
    match inner.as_rule() {
        Rule::flag_test => {
            let mut negated = false;
            let mut idents = Vec::new();
            for p in inner.into_inner() {
                match p.as_rule() {
                    Rule::negation => negated = true,
                    Rule::ident => idents.push(p.as_str().to_string()),
                    _ => {}
                }
            }
            let [field, flag]: [String; 2] = idents.try_into().map_err(|_| "flag test: expected field.flag")?;
            Ok(if negated {
                Condition::flag_clear(field, flag)
            } else {
                Condition::flag_set(field, flag)
            })
        }
        Rule::compare => {
            let mut it = inner.into_inner();
            let field = it.next().ok_or("compare: missing field")?.as_str().to_string();
            let op = it.next().ok_or("compare: missing operator")?.as_str();
            let value = parse_int(it.next().ok_or("compare: missing value")?.as_str())?;
            Ok(match op {
                "!=" => Condition::not_equals(field, value),
                _ => Condition::equals(field, value),
            })
        }
        _ => Err("Unknown condition".to_string()),
    }
}

fn parse_int(s: &str) -> Result<i128, String> {
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let magnitude = match digits.strip_prefix("0x") {
        Some(hex) => i128::from_str_radix(hex, 16),
        None => digits.parse::<i128>(),
    }
    .map_err(|_| format!("Invalid integer literal: {}", s))?;
    Ok(if negative { -magnitude } else { magnitude })
}
