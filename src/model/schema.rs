// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Attribute and record schema definitions.

use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::compiler::Expr;
use crate::model::path::Path;
use crate::model::value::Value;

/// The three kinds of record schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordTag {
    Record,
    Entity,
    Event,
}

impl fmt::Display for RecordTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordTag::Record => "record",
            RecordTag::Entity => "entity",
            RecordTag::Event => "event",
        })
    }
}

/// Signature of a check predicate: the value and an optional format parameter.
pub type CheckFn = dyn Fn(&Value, Option<&str>) -> bool + Send + Sync;

/// A named check predicate.
#[derive(Clone)]
pub struct Check {
    pub name: String,
    predicate: Arc<CheckFn>,
}

impl Check {
    pub fn new(
        name: impl Into<String>,
        predicate: impl Fn(&Value, Option<&str>) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn test(&self, value: &Value, format: Option<&str>) -> bool {
        (self.predicate)(value, format)
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Check").field("name", &self.name).finish()
    }
}

/// Default for an absent attribute value.
#[derive(Clone)]
pub enum DefaultValue {
    Literal(Value),
    /// Zero-argument generator, e.g. a fresh UUID.
    Generator {
        name: String,
        generate: Arc<dyn Fn() -> Value + Send + Sync>,
    },
}

impl DefaultValue {
    pub fn generator(name: impl Into<String>, generate: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        DefaultValue::Generator {
            name: name.into(),
            generate: Arc::new(generate),
        }
    }

    pub fn produce(&self) -> Value {
        match self {
            DefaultValue::Literal(v) => v.clone(),
            DefaultValue::Generator { generate, .. } => generate(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            DefaultValue::Generator { name, .. } => f.debug_tuple("Generator").field(name).finish(),
        }
    }
}

/// What an attribute's values are checked against.
#[derive(Debug, Clone)]
pub enum AttributeKind {
    /// Another named attribute schema, or a record/entity/event type.
    Type(Path),
    Check(Check),
    ListOf(Path),
    SetOf(Path),
    /// Computed from an expression at runtime; never supplied by callers.
    Expr(Expr),
    /// Filled in by a query at runtime.
    Query(Expr),
}

#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub kind: AttributeKind,
    pub format: Option<String>,
    pub optional: bool,
    pub unique: bool,
    pub immutable: bool,
    pub indexed: bool,
    pub default: Option<DefaultValue>,
    /// Name of a writer/serializer override applied by storage collaborators.
    pub writer: Option<String>,
}

impl AttributeSchema {
    pub fn new(kind: AttributeKind) -> Self {
        Self {
            kind,
            format: None,
            optional: false,
            unique: false,
            immutable: false,
            indexed: false,
            default: None,
            writer: None,
        }
    }

    pub fn of_type(path: impl Into<Path>) -> Self {
        Self::new(AttributeKind::Type(path.into()))
    }

    pub fn check(check: Check) -> Self {
        Self::new(AttributeKind::Check(check))
    }

    pub fn list_of(path: impl Into<Path>) -> Self {
        Self::new(AttributeKind::ListOf(path.into()))
    }

    pub fn set_of(path: impl Into<Path>) -> Self {
        Self::new(AttributeKind::SetOf(path.into()))
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Unique and immutable together make an identity attribute.
    pub fn is_identity(&self) -> bool {
        self.unique && self.immutable
    }

    pub fn is_computed(&self) -> bool {
        matches!(self.kind, AttributeKind::Expr(_) | AttributeKind::Query(_))
    }
}

/// Declared shape of a record, entity or event.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    pub tag: RecordTag,
    pub path: Path,
    /// Attribute name → fully qualified type path, in declaration order.
    pub attributes: Vec<(String, Path)>,
    /// Inferred schemas are not validated.
    pub inferred: bool,
}

impl RecordSchema {
    pub fn attribute_type(&self, name: &str) -> Option<&Path> {
        self.attributes.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute_type(name).is_some()
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|(n, _)| n.as_str())
    }
}

/// How a record declaration names the type of one attribute.
#[derive(Debug, Clone)]
pub enum AttributeDecl {
    /// Reference to an existing attribute schema or record type.
    Type(Path),
    /// Inline schema, interned as `<Record>.<attribute>` alongside the record.
    Inline(AttributeSchema),
}

impl From<&str> for AttributeDecl {
    fn from(s: &str) -> Self {
        AttributeDecl::Type(Path::parse(s))
    }
}

impl From<AttributeSchema> for AttributeDecl {
    fn from(schema: AttributeSchema) -> Self {
        AttributeDecl::Inline(schema)
    }
}

/// A record definition before interning.
#[derive(Debug, Clone)]
pub struct RecordDecl {
    pub tag: RecordTag,
    pub attributes: Vec<(String, AttributeDecl)>,
    pub inferred: bool,
}

impl RecordDecl {
    pub fn new(tag: RecordTag) -> Self {
        Self {
            tag,
            attributes: Vec::new(),
            inferred: false,
        }
    }

    pub fn record() -> Self {
        Self::new(RecordTag::Record)
    }

    pub fn entity() -> Self {
        Self::new(RecordTag::Entity)
    }

    pub fn event() -> Self {
        Self::new(RecordTag::Event)
    }

    pub fn attribute(mut self, name: impl Into<String>, decl: impl Into<AttributeDecl>) -> Self {
        self.attributes.push((name.into(), decl.into()));
        self
    }

    pub fn inferred(mut self) -> Self {
        self.inferred = true;
        self
    }
}
