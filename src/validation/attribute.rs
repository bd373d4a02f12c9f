// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::model::{AttributeKind, AttributeSchema, ErrorValue, Path, ValidationErrorKind, Value};
use crate::registry::NamespaceTable;

/// Attribute types may alias other attribute types; a chain deeper than this is
/// treated as a malformed definition.
const MAX_TYPE_DEPTH: usize = 32;

fn failure(kind: ValidationErrorKind, message: &str, attribute: &str, value: Option<&Value>) -> ErrorValue {
    let err = ErrorValue::new(kind, message).with("attribute", Value::text(attribute));
    match value {
        Some(v) => err.with("value", v.clone()),
        None => err,
    }
}

/// Validate one attribute value against its schema.
///
/// An absent or null value is replaced by the schema's default. The returned
/// value is what should be stored; validating it again yields the same value.
pub fn validate(
    table: &NamespaceTable,
    name: &str,
    value: Option<&Value>,
    schema: &AttributeSchema,
) -> Result<Value, ErrorValue> {
    validate_at_depth(table, name, value, schema, None, 0)
}

fn validate_at_depth(
    table: &NamespaceTable,
    name: &str,
    value: Option<&Value>,
    schema: &AttributeSchema,
    inherited_format: Option<&str>,
    depth: usize,
) -> Result<Value, ErrorValue> {
    if depth > MAX_TYPE_DEPTH {
        return Err(failure(
            ValidationErrorKind::CheckFailed,
            "attribute type chain too deep",
            name,
            value,
        ));
    }

    let Some(value) = value.filter(|v| !v.is_null()) else {
        return default_value(table, schema).ok_or_else(|| {
            failure(ValidationErrorKind::NoDefault, "no default defined", name, None)
        });
    };

    // The referring schema's format overrides one further down the chain.
    let format = inherited_format.or(schema.format.as_deref());

    match &schema.kind {
        AttributeKind::Type(path) => match table.find_attribute_schema(path) {
            Some(inner) => validate_at_depth(table, name, Some(value), inner, format, depth + 1),
            None => Ok(value.clone()),
        },
        AttributeKind::Check(check) => {
            if check.test(value, format) {
                Ok(value.clone())
            } else {
                Err(failure(ValidationErrorKind::CheckFailed, "check failed", name, Some(value))
                    .with("check", Value::text(check.name.clone())))
            }
        }
        AttributeKind::ListOf(element) => {
            let Value::List(items) = value else {
                return Err(failure(ValidationErrorKind::NotAList, "not a list", name, Some(value)));
            };
            let checked = validate_elements(table, name, items, element, format, depth)
                .map_err(|_| {
                    failure(
                        ValidationErrorKind::InvalidListElement,
                        "invalid list element",
                        name,
                        Some(value),
                    )
                })?;
            Ok(Value::List(checked))
        }
        AttributeKind::SetOf(element) => {
            // Payloads decoded from JSON or YAML carry sets as lists.
            let items = match value {
                Value::Set(items) | Value::List(items) => items,
                _ => return Err(failure(ValidationErrorKind::NotASet, "not a set", name, Some(value))),
            };
            if has_duplicates(items) {
                return Err(failure(ValidationErrorKind::NotASet, "not a set", name, Some(value)));
            }
            let checked = validate_elements(table, name, items, element, format, depth)
                .map_err(|_| {
                    failure(
                        ValidationErrorKind::InvalidSetElement,
                        "invalid set element",
                        name,
                        Some(value),
                    )
                })?;
            Ok(Value::Set(checked))
        }
        AttributeKind::Expr(_) | AttributeKind::Query(_) => Ok(value.clone()),
    }
}

fn has_duplicates(items: &[Value]) -> bool {
    items
        .iter()
        .enumerate()
        .any(|(i, item)| items[..i].contains(item))
}

/// Check each element against the element type: an attribute schema is
/// validated recursively, a record type requires an instance of that record.
fn validate_elements(
    table: &NamespaceTable,
    name: &str,
    items: &[Value],
    element: &Path,
    format: Option<&str>,
    depth: usize,
) -> Result<Vec<Value>, ErrorValue> {
    if let Some(schema) = table.find_attribute_schema(element) {
        return items
            .iter()
            .map(|item| validate_at_depth(table, name, Some(item), schema, format, depth + 1))
            .collect();
    }

    if table.find_record_schema(element).is_some() {
        return items
            .iter()
            .map(|item| match item.as_instance() {
                Some(inst) if inst.path == *element => Ok(item.clone()),
                _ => Err(failure(
                    ValidationErrorKind::CheckFailed,
                    "not an instance of the element type",
                    name,
                    Some(item),
                )),
            })
            .collect();
    }

    Ok(items.to_vec())
}

/// The default for an absent value, following the type chain until a schema
/// defines one.
pub fn default_value(table: &NamespaceTable, schema: &AttributeSchema) -> Option<Value> {
    let mut current = schema;
    for _ in 0..=MAX_TYPE_DEPTH {
        if let Some(default) = &current.default {
            return Some(default.produce());
        }
        match &current.kind {
            AttributeKind::Type(path) => current = &**table.find_attribute_schema(path)?,
            _ => return None,
        }
    }
    None
}
