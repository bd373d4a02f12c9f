// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Runtime values, instances and first-class error values.
//!
//! An attribute value is a [`Value`]. Constructing a typed value through the
//! validating constructor yields a [`Tagged`]: either a valid [`Instance`] or an
//! [`ErrorValue`]. Errors are ordinary data here; they can be inspected, logged or
//! embedded inside other values, and only become a Rust `Err` when a caller
//! explicitly asks for one with [`Tagged::into_result`].

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::model::path::Path;
use crate::model::schema::RecordTag;

/// Attribute name → value, ordered by name.
pub type Attributes = BTreeMap<String, Value>;

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    /// Unordered collection; a well-formed set holds no duplicates.
    Set(Vec<Value>),
    Map(BTreeMap<String, Value>),
    Instance(Box<Instance>),
    Error(Box<ErrorValue>),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Build a set, dropping duplicates while keeping first occurrences.
    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        let mut unique: Vec<Value> = Vec::new();
        for item in items {
            if !unique.contains(&item) {
                unique.push(item);
            }
        }
        Value::Set(unique)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Instance(inst) => Some(inst),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    /// Ordering used by guard comparisons. Numbers compare across `Int`/`Float`;
    /// values of unrelated kinds are unordered.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (a, b) if a.is_number() && b.is_number() => a.as_f64()?.partial_cmp(&b.as_f64()?),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (a, b) if a == b => Some(Ordering::Equal),
            _ => None,
        }
    }

    /// Follow a dotted path through nested instances and maps.
    pub fn lookup(&self, segments: &[&str]) -> Option<&Value> {
        let Some((head, rest)) = segments.split_first() else {
            return Some(self);
        };
        let next = match self {
            Value::Instance(inst) => inst.attributes.get(*head)?,
            Value::Map(map) => map.get(*head)?,
            _ => return None,
        };
        next.lookup(rest)
    }
}

/// Structural equality, except that sets compare by membership regardless of
/// element order.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => same_members(a, b),
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Instance(a), Value::Instance(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            _ => false,
        }
    }
}

/// Equal as multisets: each element of `a` pairs off with a distinct element of `b`.
fn same_members(a: &[Value], b: &[Value]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut unmatched: Vec<&Value> = b.iter().collect();
    a.iter().all(|item| match unmatched.iter().position(|other| *other == item) {
        Some(index) => {
            unmatched.swap_remove(index);
            true
        }
        None => false,
    })
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<serde_yaml::Value> for Value {
    fn from(yaml: serde_yaml::Value) -> Self {
        match yaml {
            serde_yaml::Value::Null => Value::Null,
            serde_yaml::Value::Bool(b) => Value::Bool(b),
            serde_yaml::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_yaml::Value::String(s) => Value::Text(s),
            serde_yaml::Value::Sequence(items) => Value::List(items.into_iter().map(Value::from).collect()),
            serde_yaml::Value::Mapping(map) => Value::Map(
                map.into_iter()
                    .filter_map(|(k, v)| k.as_str().map(|k| (k.to_string(), Value::from(v))))
                    .collect(),
            ),
            serde_yaml::Value::Tagged(tagged) => Value::from(tagged.value),
        }
    }
}

/// JSON rendering used when surfacing values and errors to callers.
impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        use serde_json::json;
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => json!(b),
            Value::Int(i) => json!(i),
            Value::Float(f) => json!(f),
            Value::Text(s) => json!(s),
            Value::List(items) | Value::Set(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), serde_json::Value::from(v))).collect(),
            ),
            Value::Instance(inst) => {
                let attrs: serde_json::Map<String, serde_json::Value> = inst
                    .attributes
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect();
                let mut tagged = serde_json::Map::new();
                tagged.insert(inst.path.to_string(), serde_json::Value::Object(attrs));
                serde_json::Value::Object(tagged)
            }
            Value::Error(err) => {
                let extra: serde_json::Map<String, serde_json::Value> = err
                    .attributes
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect();
                json!({ "error": { "kind": err.kind.to_string(), "message": err.message, "attributes": extra } })
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", serde_json::Value::from(self))
    }
}

/// A typed record value: `{tag, path, attributes}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub tag: RecordTag,
    pub path: Path,
    pub attributes: Attributes,
}

impl Instance {
    pub fn new(tag: RecordTag, path: Path, attributes: Attributes) -> Self {
        Self { tag, path, attributes }
    }

    pub fn get(&self, attribute: &str) -> Option<&Value> {
        self.attributes.get(attribute)
    }
}

/// Why a value failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    CheckFailed,
    NotAList,
    InvalidListElement,
    NotASet,
    InvalidSetElement,
    NoDefault,
    UnknownAttribute,
    SchemaNotFound,
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValidationErrorKind::CheckFailed => "check_failed",
            ValidationErrorKind::NotAList => "not_a_list",
            ValidationErrorKind::InvalidListElement => "invalid_list_element",
            ValidationErrorKind::NotASet => "not_a_set",
            ValidationErrorKind::InvalidSetElement => "invalid_set_element",
            ValidationErrorKind::NoDefault => "no_default",
            ValidationErrorKind::UnknownAttribute => "unknown_attribute",
            ValidationErrorKind::SchemaNotFound => "schema_not_found",
        };
        f.write_str(s)
    }
}

/// A validation failure carried as data.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ErrorValue {
    pub kind: ValidationErrorKind,
    pub message: String,
    /// Extra diagnostic fields, e.g. the offending attribute and value.
    pub attributes: Attributes,
}

impl ErrorValue {
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            attributes: Attributes::new(),
        }
    }

    /// Attach an extra diagnostic field.
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }

    /// The attribute this error was raised for, if recorded.
    pub fn attribute(&self) -> Option<&str> {
        self.attributes.get("attribute").and_then(Value::as_text)
    }
}

/// Outcome of the validating instance constructor.
#[derive(Debug, Clone, PartialEq)]
pub enum Tagged {
    Instance(Instance),
    Error(ErrorValue),
}

impl Tagged {
    pub fn is_error(&self) -> bool {
        matches!(self, Tagged::Error(_))
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Tagged::Instance(inst) => Some(inst),
            Tagged::Error(_) => None,
        }
    }

    /// Convert at a boundary where an error value must become a failure.
    pub fn into_result(self) -> Result<Instance, ErrorValue> {
        match self {
            Tagged::Instance(inst) => Ok(inst),
            Tagged::Error(err) => Err(err),
        }
    }
}

impl From<Tagged> for Value {
    fn from(tagged: Tagged) -> Self {
        match tagged {
            Tagged::Instance(inst) => Value::Instance(Box::new(inst)),
            Tagged::Error(err) => Value::Error(Box::new(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_constructor_drops_duplicates() {
        let set = Value::set(vec![Value::Int(1), Value::Int(2), Value::Int(1)]);
        assert_eq!(set, Value::Set(vec![Value::Int(1), Value::Int(2)]));
    }

    #[test]
    fn test_set_equality_ignores_order() {
        struct TestCase {
            name: &'static str,
            left: Value,
            right: Value,
            equal: bool,
        }

        let cases = vec![
            TestCase {
                name: "same members reordered",
                left: Value::set(vec![Value::text("a"), Value::text("b"), Value::Int(3)]),
                right: Value::set(vec![Value::Int(3), Value::text("a"), Value::text("b")]),
                equal: true,
            },
            TestCase {
                name: "different members",
                left: Value::set(vec![Value::text("a"), Value::text("b")]),
                right: Value::set(vec![Value::text("a"), Value::text("c")]),
                equal: false,
            },
            TestCase {
                name: "subset",
                left: Value::set(vec![Value::text("a")]),
                right: Value::set(vec![Value::text("a"), Value::text("b")]),
                equal: false,
            },
            TestCase {
                name: "lists stay ordered",
                left: Value::List(vec![Value::Int(1), Value::Int(2)]),
                right: Value::List(vec![Value::Int(2), Value::Int(1)]),
                equal: false,
            },
            TestCase {
                name: "set is not a list",
                left: Value::Set(vec![Value::Int(1)]),
                right: Value::List(vec![Value::Int(1)]),
                equal: false,
            },
            TestCase {
                name: "nested sets",
                left: Value::Map(BTreeMap::from([(
                    "Tags".to_string(),
                    Value::set(vec![Value::Int(1), Value::Int(2)]),
                )])),
                right: Value::Map(BTreeMap::from([(
                    "Tags".to_string(),
                    Value::set(vec![Value::Int(2), Value::Int(1)]),
                )])),
                equal: true,
            },
        ];

        for case in cases {
            assert_eq!(case.left == case.right, case.equal, "{}", case.name);
        }
    }

    #[test]
    fn test_compare_mixes_int_and_float() {
        assert_eq!(Value::Int(2).compare(&Value::Float(1.5)), Some(Ordering::Greater));
        assert_eq!(Value::Float(2.0).compare(&Value::Int(2)), Some(Ordering::Equal));
        assert_eq!(Value::text("a").compare(&Value::Int(1)), None);
    }

    #[test]
    fn test_lookup_through_nested_instance() {
        let inner = Instance::new(
            RecordTag::Entity,
            Path::new("Acme", "Order"),
            Attributes::from([("Total".to_string(), Value::Int(40))]),
        );
        let outer = Value::Map(BTreeMap::from([(
            "Instance".to_string(),
            Value::Instance(Box::new(inner)),
        )]));

        assert_eq!(outer.lookup(&["Instance", "Total"]), Some(&Value::Int(40)));
        assert_eq!(outer.lookup(&["Instance", "Missing"]), None);
    }

    #[test]
    fn test_json_conversion() {
        let json: serde_json::Value = serde_json::json!({"a": [1, 2.5, "x", true, null]});
        let value = Value::from(json);
        assert_eq!(
            value.lookup(&["a"]),
            Some(&Value::List(vec![
                Value::Int(1),
                Value::Float(2.5),
                Value::text("x"),
                Value::Bool(true),
                Value::Null
            ]))
        );
    }

    #[test]
    fn test_tagged_into_result() {
        let err = ErrorValue::new(ValidationErrorKind::NoDefault, "no default defined")
            .with("attribute", Value::text("Balance"));
        let tagged = Tagged::Error(err.clone());
        assert!(tagged.is_error());
        assert_eq!(tagged.into_result(), Err(err.clone()));
        assert_eq!(err.attribute(), Some("Balance"));
        assert_eq!(err.to_string(), "no default defined");
    }
}
