//! Packet schemas and the registry that names them.

use crate::codec::{CodecError, ErrorKind};
use crate::field::{Field, SchemaRef};
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Predicate on one earlier field's value, deciding whether a conditional field is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    field: String,
    test: Test,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Test {
    Equals(i128),
    NotEquals(i128),
    FlagSet(String),
    FlagClear(String),
}

impl Condition {
    pub fn new(field: impl Into<String>, test: Test) -> Self {
        Condition {
            field: field.into(),
            test,
        }
    }

    pub fn equals(field: impl Into<String>, value: i128) -> Self {
        Condition::new(field, Test::Equals(value))
    }

    pub fn not_equals(field: impl Into<String>, value: i128) -> Self {
        Condition::new(field, Test::NotEquals(value))
    }

    pub fn flag_set(field: impl Into<String>, flag: impl Into<String>) -> Self {
        Condition::new(field, Test::FlagSet(flag.into()))
    }

    pub fn flag_clear(field: impl Into<String>, flag: impl Into<String>) -> Self {
        Condition::new(field, Test::FlagClear(flag.into()))
    }

    /// Name of the field the predicate reads.
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn test(&self) -> &Test {
        &self.test
    }

    /// Evaluate against the subject field's value. An absent subject makes the predicate false.
    pub fn evaluate(&self, subject: Option<&Value>) -> bool {
        let Some(v) = subject else {
            return false;
        };
        match &self.test {
            Test::Equals(n) => v.as_int() == Some(*n),
            Test::NotEquals(n) => v.as_int().is_some_and(|x| x != *n),
            Test::FlagSet(flag) => v.as_flags().is_some_and(|f| f.is_set(flag)),
            Test::FlagClear(flag) => v.as_flags().is_some_and(|f| !f.is_set(flag)),
        }
    }
}

/// One member of a schema: a name, a field kind and an optional presence condition.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    name: String,
    field: Field,
    condition: Option<Condition>,
}

impl FieldDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    pub fn is_conditional(&self) -> bool {
        self.condition.is_some()
    }
}

/// Immutable, ordered packet layout.
///
/// A schema without conditional fields describes a basic packet; conditional fields make
/// the layout depend on earlier values (an advanced packet). Share schemas through
/// `Arc<Schema>`; they are never mutated after [`SchemaBuilder::build`].
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    name: String,
    fields: Vec<FieldDef>,
    by_name: HashMap<String, usize>,
}

impl Schema {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.index_of(name).map(|i| &self.fields[i])
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True when some field is conditional.
    pub fn has_conditionals(&self) -> bool {
        self.fields.iter().any(FieldDef::is_conditional)
    }

    /// Bytes every encoding of this schema needs at least. Conditional fields contribute nothing.
    pub fn min_size(&self) -> usize {
        self.fields
            .iter()
            .filter(|d| !d.is_conditional())
            .fold(0usize, |acc, d| acc.saturating_add(d.field.min_width()))
    }

    /// Encoded size when it is the same for every packet of this schema.
    pub fn fixed_size(&self) -> Option<usize> {
        self.fields.iter().try_fold(0usize, |acc, d| {
            if d.is_conditional() {
                return None;
            }
            acc.checked_add(d.field.fixed_width()?)
        })
    }

    /// Names of packets this schema refers to by name, directly or through arrays.
    pub fn named_references(&self) -> Vec<&str> {
        fn collect<'a>(field: &'a Field, out: &mut Vec<&'a str>) {
            match field {
                Field::Array(a) => collect(a.element(), out),
                Field::Packet(p) => match p.schema_ref() {
                    SchemaRef::Named(n) => out.push(n),
                    SchemaRef::Inline(s) => {
                        for d in &s.fields {
                            collect(&d.field, out);
                        }
                    }
                },
                _ => {}
            }
        }
        let mut out = Vec::new();
        for d in &self.fields {
            collect(&d.field, &mut out);
        }
        out
    }
}

/// Collects field definitions in order and validates them into a [`Schema`].
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldDef>,
}

impl SchemaBuilder {
    pub fn field(mut self, name: impl Into<String>, field: impl Into<Field>) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            field: field.into(),
            condition: None,
        });
        self
    }

    /// A field present only when `condition` holds for an earlier field.
    pub fn conditional(mut self, name: impl Into<String>, field: impl Into<Field>, condition: Condition) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            field: field.into(),
            condition: Some(condition),
        });
        self
    }

    /// Check the layout rules and freeze the schema.
    ///
    /// Field names must be unique; a condition may only read a field declared before it
    /// (an integer for `Equals`/`NotEquals`, a flag field declaring the flag otherwise);
    /// a length-prefixed array must directly follow an integer field, cannot have elements
    /// that are always zero bytes wide, and cannot be nested inside another array.
    pub fn build(self) -> Result<Schema, CodecError> {
        let invalid = |msg: String| CodecError::from(ErrorKind::InvalidSchema(format!("{}: {}", self.name, msg)));
        let mut by_name = HashMap::new();
        for (i, def) in self.fields.iter().enumerate() {
            if by_name.insert(def.name.clone(), i).is_some() {
                return Err(invalid(format!("duplicate field name `{}`", def.name)));
            }
            if let Some(cond) = &def.condition {
                let subject = match by_name.get(cond.field.as_str()) {
                    Some(&j) if j < i => &self.fields[j],
                    _ => {
                        return Err(invalid(format!(
                            "condition of `{}` reads `{}`, which is not declared before it",
                            def.name, cond.field
                        )))
                    }
                };
                match (&cond.test, &subject.field) {
                    (Test::Equals(_) | Test::NotEquals(_), Field::Int(_)) => {}
                    (Test::FlagSet(flag) | Test::FlagClear(flag), Field::Flags(f)) => {
                        if f.bit_of(flag).is_none() {
                            return Err(CodecError::from(ErrorKind::UnknownFlagName(flag.clone())).in_field(&def.name));
                        }
                    }
                    _ => {
                        return Err(invalid(format!(
                            "condition of `{}` cannot test {} field `{}`",
                            def.name,
                            subject.field.type_name(),
                            subject.name
                        )))
                    }
                }
            }
            if let Field::Array(a) = &def.field {
                if a.is_prefixed() {
                    let prev = i.checked_sub(1).map(|j| &self.fields[j].field);
                    if !matches!(prev, Some(Field::Int(_))) {
                        return Err(invalid(format!(
                            "length-prefixed array `{}` must follow an integer field",
                            def.name
                        )));
                    }
                }
                if a.is_prefixed() && a.element().fixed_width() == Some(0) {
                    return Err(invalid(format!(
                        "length-prefixed array `{}` has zero-width elements",
                        def.name
                    )));
                }
                if nested_prefix(a.element()) {
                    return Err(invalid(format!(
                        "array `{}` contains a length-prefixed array, which has no sibling to read its length from",
                        def.name
                    )));
                }
            }
        }
        Ok(Schema {
            name: self.name,
            fields: self.fields,
            by_name,
        })
    }
}

fn nested_prefix(field: &Field) -> bool {
    match field {
        Field::Array(a) => a.is_prefixed() || nested_prefix(a.element()),
        _ => false,
    }
}

/// Named packet schemas. Build one explicitly and hand it to a [`Codec`](crate::Codec);
/// there is no process-wide registry.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    schemas: Vec<Arc<Schema>>,
    by_name: HashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse schema DSL source and register every packet in it.
    pub fn from_dsl(source: &str) -> Result<Self, CodecError> {
        let schemas = crate::parser::parse(source).map_err(|e| CodecError::from(ErrorKind::InvalidSchema(e)))?;
        let mut registry = Registry::new();
        for schema in schemas {
            registry.register(schema)?;
        }
        registry.check_references()?;
        Ok(registry)
    }

    /// Add a schema; names must be unique.
    pub fn register(&mut self, schema: impl Into<Arc<Schema>>) -> Result<Arc<Schema>, CodecError> {
        let schema = schema.into();
        if self.by_name.contains_key(schema.name()) {
            return Err(CodecError::from(ErrorKind::InvalidSchema(format!(
                "duplicate packet name: {}",
                schema.name()
            ))));
        }
        self.by_name.insert(schema.name().to_string(), self.schemas.len());
        self.schemas.push(Arc::clone(&schema));
        tracing::debug!(packet = schema.name(), fields = schema.len(), "registered schema");
        Ok(schema)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Schema>> {
        self.by_name.get(name).map(|&i| &self.schemas[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Registered schemas in registration order.
    pub fn schemas(&self) -> impl Iterator<Item = &Arc<Schema>> + '_ {
        self.schemas.iter()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Fail with `UnknownPacket` if any schema refers by name to a packet not registered here.
    pub fn check_references(&self) -> Result<(), CodecError> {
        for schema in &self.schemas {
            for name in schema.named_references() {
                if !self.contains(name) {
                    return Err(CodecError::from(ErrorKind::UnknownPacket(name.to_string())).in_field(schema.name()));
                }
            }
        }
        Ok(())
    }
}
