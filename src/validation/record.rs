// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::model::{Attributes, ErrorValue, Instance, Path, Tagged, ValidationErrorKind, Value};
use crate::registry::NamespaceTable;
use crate::validation::attribute::validate;

fn schema_not_found(path: &Path) -> ErrorValue {
    ErrorValue::new(ValidationErrorKind::SchemaNotFound, format!("schema not found: {}", path))
        .with("record", Value::text(path.to_string()))
}

/// Validate a full attribute map against a record schema.
///
/// Unknown keys are rejected before any attribute is checked. Inferred schemas
/// accept anything. Computed attributes are carried through unchecked, and an
/// optional attribute with no value and no default stays absent.
pub fn validate_record(
    table: &NamespaceTable,
    record: &Path,
    attributes: &Attributes,
) -> Result<Attributes, ErrorValue> {
    let schema = table
        .find_record_schema(record)
        .ok_or_else(|| schema_not_found(record))?;

    if schema.inferred {
        return Ok(attributes.clone());
    }

    let unknown: Vec<Value> = attributes
        .keys()
        .filter(|name| !schema.has_attribute(name))
        .map(|name| Value::text(name.clone()))
        .collect();
    if !unknown.is_empty() {
        return Err(
            ErrorValue::new(ValidationErrorKind::UnknownAttribute, "unknown attributes")
                .with("record", Value::text(record.to_string()))
                .with("attributes", Value::List(unknown)),
        );
    }

    let mut validated = Attributes::new();
    for (name, ty) in &schema.attributes {
        let value = attributes.get(name);
        let annotate = |err: ErrorValue| err.with("record", Value::text(record.to_string()));

        match table.find_attribute_schema(ty) {
            Some(attr) if attr.is_computed() => {
                if let Some(v) = value {
                    validated.insert(name.clone(), v.clone());
                }
            }
            Some(attr) => {
                let absent = value.map_or(true, Value::is_null);
                if absent && attr.optional && attr.default.is_none() {
                    continue;
                }
                let v = validate(table, name, value, attr).map_err(annotate)?;
                validated.insert(name.clone(), v);
            }
            None => match value.filter(|v| !v.is_null()) {
                Some(v) => {
                    validated.insert(name.clone(), v.clone());
                }
                None => {
                    return Err(annotate(
                        ErrorValue::new(ValidationErrorKind::NoDefault, "no default defined")
                            .with("attribute", Value::text(name.clone())),
                    ))
                }
            },
        }
    }
    Ok(validated)
}

/// Build an instance of `record`, promoting nested maps to instances.
///
/// A single-key map whose key names a known record type becomes a nested
/// instance of that type, through lists and sets too. Existing instances are
/// re-tagged to their canonical tag and path. A failure is returned as
/// [`Tagged::Error`], never as a panic.
pub fn make_instance(table: &NamespaceTable, record: &Path, attributes: Attributes, check: bool) -> Tagged {
    match build_instance(table, record, attributes, check) {
        Ok(inst) => Tagged::Instance(inst),
        Err(err) => Tagged::Error(err),
    }
}

fn build_instance(
    table: &NamespaceTable,
    record: &Path,
    attributes: Attributes,
    check: bool,
) -> Result<Instance, ErrorValue> {
    let schema = table
        .find_record_schema(record)
        .ok_or_else(|| schema_not_found(record))?;
    let current = record.namespace().unwrap_or_default();

    let promoted = attributes
        .into_iter()
        .map(|(name, value)| {
            promote(table, current, value, check)
                .map(|v| (name.clone(), v))
                .map_err(|err| err.with("within", Value::text(name)))
        })
        .collect::<Result<Attributes, _>>()?;

    let attributes = if check {
        validate_record(table, &schema.path, &promoted)?
    } else {
        promoted
    };
    Ok(Instance::new(schema.tag, schema.path.clone(), attributes))
}

fn promote(table: &NamespaceTable, current: &str, value: Value, check: bool) -> Result<Value, ErrorValue> {
    match value {
        Value::Map(mut map) if map.len() == 1 => {
            let Some((key, inner)) = map.pop_first() else {
                return Ok(Value::Map(map));
            };
            match (table.resolve_record(current, &Path::parse(&key)), inner) {
                (Some(path), Value::Map(attrs)) => {
                    build_instance(table, &path, attrs, check).map(|inst| Value::Instance(Box::new(inst)))
                }
                (_, inner) => Ok(Value::Map([(key, inner)].into())),
            }
        }
        Value::List(items) => items
            .into_iter()
            .map(|item| promote(table, current, item, check))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        Value::Set(items) => items
            .into_iter()
            .map(|item| promote(table, current, item, check))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::set),
        Value::Instance(mut inst) => {
            if let Some(schema) = table
                .resolve_record(current, &inst.path)
                .and_then(|path| table.find_record_schema(&path))
            {
                inst.tag = schema.tag;
                inst.path = schema.path.clone();
            }
            Ok(Value::Instance(inst))
        }
        other => Ok(other),
    }
}
