// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Built-in scalar attribute types and named check predicates.
//!
//! The `Kernel` namespace is present in every registry. Unqualified type names
//! that are not defined in the current namespace resolve here, so a record can
//! declare `Balance: Number` without an import.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use regex::Regex;

use crate::config::consts::KERNEL_NAMESPACE;
use crate::model::{AttributeSchema, Check, DefaultValue, Path, Value};
use crate::registry::namespace::{Namespace, NamespaceSpec};

/// Format applied to the kernel `Email` type.
pub const EMAIL_FORMAT: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

/// Default generator producing a fresh v4 UUID string.
pub fn uuid_generator() -> DefaultValue {
    DefaultValue::generator("uuid", || Value::Text(uuid::Uuid::new_v4().to_string()))
}

/// Default generator producing the current time in RFC 3339.
pub fn now_generator() -> DefaultValue {
    DefaultValue::generator("now", || Value::Text(chrono::Utc::now().to_rfc3339()))
}

/// Compiled attribute formats, keyed by pattern. `None` marks a pattern that
/// failed to compile.
fn format_cache() -> &'static RwLock<HashMap<String, Option<Regex>>> {
    static FORMATS: OnceLock<RwLock<HashMap<String, Option<Regex>>>> = OnceLock::new();
    FORMATS.get_or_init(|| RwLock::new(HashMap::new()))
}

fn compiled_format(pattern: &str) -> Option<Regex> {
    if let Some(cached) = format_cache().read().get(pattern) {
        return cached.clone();
    }
    format_cache()
        .write()
        .entry(pattern.to_string())
        .or_insert_with(|| Regex::new(pattern).ok())
        .clone()
}

fn string_check(value: &Value, format: Option<&str>) -> bool {
    let Some(s) = value.as_text() else {
        return false;
    };
    match format {
        // An unparseable format never matches.
        Some(pattern) => compiled_format(pattern).is_some_and(|re| re.is_match(s)),
        None => true,
    }
}

/// Named check predicates available to schema definitions.
#[derive(Debug, Clone)]
pub struct CheckTable(BTreeMap<String, Check>);

impl CheckTable {
    /// The kernel predicates: string, int, float, number, boolean, uuid, datetime, map, any.
    pub fn builtin() -> Self {
        let checks = vec![
            Check::new("string", string_check),
            Check::new("int", |v, _| matches!(v, Value::Int(_))),
            Check::new("float", |v, _| v.is_number()),
            Check::new("number", |v, _| v.is_number()),
            Check::new("boolean", |v, _| matches!(v, Value::Bool(_))),
            Check::new("uuid", |v, _| {
                v.as_text().is_some_and(|s| uuid::Uuid::parse_str(s).is_ok())
            }),
            Check::new("datetime", |v, _| {
                v.as_text()
                    .is_some_and(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok())
            }),
            Check::new("map", |v, _| matches!(v, Value::Map(_))),
            Check::new("any", |_, _| true),
        ];
        Self(checks.into_iter().map(|c| (c.name.clone(), c)).collect())
    }

    pub fn get(&self, name: &str) -> Option<&Check> {
        self.0.get(name)
    }

    pub fn insert(&mut self, check: Check) {
        self.0.insert(check.name.clone(), check);
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }
}

impl Default for CheckTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Build the `Kernel` namespace from the builtin check table.
pub fn kernel_namespace() -> Namespace {
    let checks = CheckTable::builtin();
    let mut ns = Namespace::empty(KERNEL_NAMESPACE, NamespaceSpec::default());
    let kernel = |name: &str| Path::new(KERNEL_NAMESPACE, name);

    let mut scalar = |type_name: &str, check_name: &str| {
        if let Some(check) = checks.get(check_name) {
            ns.attributes.insert(
                type_name.to_string(),
                Arc::new(AttributeSchema::check(check.clone())),
            );
        }
    };
    scalar("String", "string");
    scalar("Int", "int");
    scalar("Float", "float");
    scalar("Number", "number");
    scalar("Boolean", "boolean");
    scalar("UUID", "uuid");
    scalar("DateTime", "datetime");
    scalar("Map", "map");
    scalar("Any", "any");

    ns.attributes.insert(
        "Email".to_string(),
        Arc::new(AttributeSchema::of_type(kernel("String")).with_format(EMAIL_FORMAT)),
    );
    ns.attributes.insert(
        "Identity".to_string(),
        Arc::new(
            AttributeSchema::of_type(kernel("UUID"))
                .unique()
                .immutable()
                .indexed()
                .with_default(uuid_generator()),
        ),
    );
    ns.attributes.insert(
        "Now".to_string(),
        Arc::new(AttributeSchema::of_type(kernel("DateTime")).with_default(now_generator())),
    );

    ns
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_checks_table_driven() {
        let table = CheckTable::builtin();
        let cases = vec![
            ("string", Value::text("x"), None, true),
            ("string", Value::Int(1), None, false),
            ("string", Value::text("abc"), Some("^a"), true),
            ("string", Value::text("abc"), Some("^b"), false),
            ("string", Value::text("abc"), Some("("), false),
            ("int", Value::Int(3), None, true),
            ("int", Value::Float(3.0), None, false),
            ("number", Value::Float(3.5), None, true),
            ("boolean", Value::Bool(false), None, true),
            ("uuid", Value::text("67e55044-10b1-426f-9247-bb680e5fe0c8"), None, true),
            ("uuid", Value::text("not-a-uuid"), None, false),
            ("datetime", Value::text("2024-05-01T10:00:00Z"), None, true),
            ("datetime", Value::text("yesterday"), None, false),
            ("any", Value::Null, None, true),
        ];

        for (name, value, format, expected) in cases {
            let check = table.get(name).unwrap();
            assert_eq!(
                check.test(&value, format),
                expected,
                "check '{}' on {:?} with format {:?}",
                name,
                value,
                format
            );
        }
    }

    #[test]
    fn test_formats_compile_once() {
        let table = CheckTable::builtin();
        let check = table.get("string").unwrap();
        let pattern = "^[A-Z]{2}-[0-9]{4}$";

        assert!(check.test(&Value::text("AB-1234"), Some(pattern)));
        let first = format_cache().read().get(pattern).cloned().flatten().unwrap();
        assert!(!check.test(&Value::text("ab-1234"), Some(pattern)));
        let second = format_cache().read().get(pattern).cloned().flatten().unwrap();
        assert_eq!(first.as_str(), second.as_str());

        assert!(!check.test(&Value::text("x"), Some("[unclosed")));
        assert!(matches!(format_cache().read().get("[unclosed"), Some(None)));
    }

    #[test]
    fn test_kernel_namespace_types() {
        let ns = kernel_namespace();
        for name in ["String", "Int", "Number", "UUID", "Email", "Identity", "DateTime"] {
            assert!(ns.attributes.contains_key(name), "kernel should define {}", name);
        }
        assert!(ns.attributes["Identity"].is_identity());
        assert_eq!(ns.attributes["Email"].format.as_deref(), Some(EMAIL_FORMAT));
    }

    #[test]
    fn test_uuid_generator_produces_valid_uuids() {
        let value = uuid_generator().produce();
        let checks = CheckTable::builtin();
        assert!(checks.get("uuid").unwrap().test(&value, None));
        assert_ne!(value, uuid_generator().produce());
    }
}
