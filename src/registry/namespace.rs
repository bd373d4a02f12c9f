// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Deserialize;

use crate::config::consts::{
    IDENTITY_ATTRIBUTE, IMPORT_ALIAS_KEYWORD, KERNEL_NAMESPACE, NAMESPACE_INITIALIZED_EVENT,
};
use crate::dataflow::Dataflow;
use crate::errors::CompileError;
use crate::model::{AttributeSchema, Path, RecordSchema, RecordTag};
use crate::registry::kernel::uuid_generator;
use crate::resolver::ResolverSpec;

/// Options accepted when creating a namespace.
///
/// # Example
/// ```yaml
/// imports: ["Acme.Shared as S", "Acme.Billing"]
/// resolver: { name: core, type: memory }
/// interop: ["chrono"]
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct NamespaceSpec {
    /// `Namespace` or `Namespace as Alias`
    #[serde(default)]
    pub imports: Vec<String>,
    /// Namespace-level default resolver
    #[serde(default)]
    pub resolver: Option<ResolverSpec>,
    /// Host-language interop imports, carried as opaque data
    #[serde(default)]
    pub interop: Vec<String>,
}

impl NamespaceSpec {
    pub fn with_import(mut self, import: impl Into<String>) -> Self {
        self.imports.push(import.into());
        self
    }
}

/// A parsed `imports` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    pub namespace: String,
    pub alias: Option<String>,
}

fn namespace_name_regex() -> &'static Regex {
    static NAME: OnceLock<Regex> = OnceLock::new();
    NAME.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").expect("static pattern")
    })
}

fn alias_regex() -> &'static Regex {
    static ALIAS: OnceLock<Regex> = OnceLock::new();
    ALIAS.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static pattern"))
}

/// Namespaces and dotted definition names share one grammar.
pub fn is_valid_name(name: &str) -> bool {
    namespace_name_regex().is_match(name)
}

impl ImportSpec {
    /// Parse `Acme.Core` or `Acme.Core as C`; anything else is malformed.
    pub fn parse(owner: &str, spec: &str) -> Result<Self, CompileError> {
        let malformed = || CompileError::MalformedImport {
            namespace: owner.to_string(),
            spec: spec.to_string(),
        };

        let tokens: Vec<&str> = spec.split_whitespace().collect();
        match tokens.as_slice() {
            [ns] if is_valid_name(ns) => Ok(Self {
                namespace: ns.to_string(),
                alias: None,
            }),
            [ns, kw, alias]
                if *kw == IMPORT_ALIAS_KEYWORD && is_valid_name(ns) && alias_regex().is_match(alias) =>
            {
                Ok(Self {
                    namespace: ns.to_string(),
                    alias: Some(alias.to_string()),
                })
            }
            _ => Err(malformed()),
        }
    }
}

/// One namespace: its schemas, dataflows and resolver specs.
#[derive(Debug, Clone)]
pub struct Namespace {
    pub name: String,
    pub spec: NamespaceSpec,
    pub imports: Vec<ImportSpec>,
    pub attributes: BTreeMap<String, Arc<AttributeSchema>>,
    pub records: BTreeMap<String, Arc<RecordSchema>>,
    /// Event name → dataflows in registration order
    pub events: BTreeMap<String, Vec<Arc<Dataflow>>>,
    /// Type name (or the namespace-level key) → installed resolver specs
    pub resolvers: BTreeMap<String, Vec<ResolverSpec>>,
}

impl Namespace {
    /// Create a namespace with its identity attribute and initialization event.
    pub fn new(name: &str, spec: NamespaceSpec) -> Result<Self, CompileError> {
        if !is_valid_name(name) {
            return Err(CompileError::InvalidName {
                kind: "namespace".into(),
                name: name.to_string(),
            });
        }

        let imports = spec
            .imports
            .iter()
            .map(|s| ImportSpec::parse(name, s))
            .collect::<Result<Vec<_>, _>>()?;

        let mut ns = Self::empty(name, spec);
        ns.imports = imports;

        let identity = AttributeSchema::of_type(Path::new(KERNEL_NAMESPACE, "UUID"))
            .unique()
            .immutable()
            .indexed()
            .with_default(uuid_generator());
        ns.attributes
            .insert(IDENTITY_ATTRIBUTE.to_string(), Arc::new(identity));

        ns.records.insert(
            NAMESPACE_INITIALIZED_EVENT.to_string(),
            Arc::new(RecordSchema {
                tag: RecordTag::Event,
                path: Path::new(name, NAMESPACE_INITIALIZED_EVENT),
                attributes: Vec::new(),
                inferred: true,
            }),
        );

        Ok(ns)
    }

    pub(crate) fn empty(name: &str, spec: NamespaceSpec) -> Self {
        Self {
            name: name.to_string(),
            spec,
            imports: Vec::new(),
            attributes: BTreeMap::new(),
            records: BTreeMap::new(),
            events: BTreeMap::new(),
            resolvers: BTreeMap::new(),
        }
    }

    /// The namespace an import alias stands for.
    pub fn alias_target(&self, alias: &str) -> Option<&str> {
        self.imports
            .iter()
            .find(|i| i.alias.as_deref() == Some(alias))
            .map(|i| i.namespace.as_str())
    }

    pub fn dataflow_count(&self) -> usize {
        self.events.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_parsing_table_driven() {
        struct TestCase {
            spec: &'static str,
            expected: Option<(&'static str, Option<&'static str>)>,
        }

        let cases = vec![
            TestCase { spec: "Acme.Core", expected: Some(("Acme.Core", None)) },
            TestCase { spec: "Acme.Core as C", expected: Some(("Acme.Core", Some("C"))) },
            TestCase { spec: "Acme.Core as", expected: None },
            TestCase { spec: "Acme.Core alias C", expected: None },
            TestCase { spec: "Acme..Core", expected: None },
            TestCase { spec: "Acme.Core as C.D", expected: None },
            TestCase { spec: "", expected: None },
        ];

        for case in cases {
            let result = ImportSpec::parse("Owner", case.spec);
            match case.expected {
                Some((ns, alias)) => {
                    let import = result.unwrap_or_else(|e| panic!("'{}' should parse: {}", case.spec, e));
                    assert_eq!(import.namespace, ns);
                    assert_eq!(import.alias.as_deref(), alias);
                }
                None => assert!(
                    matches!(result, Err(CompileError::MalformedImport { .. })),
                    "'{}' should be malformed",
                    case.spec
                ),
            }
        }
    }

    #[test]
    fn test_new_namespace_gets_identity_and_init_event() {
        let ns = Namespace::new("Acme.Core", NamespaceSpec::default()).unwrap();

        let identity = ns.attributes.get(IDENTITY_ATTRIBUTE).unwrap();
        assert!(identity.is_identity());
        assert!(identity.default.is_some());

        let init = ns.records.get(NAMESPACE_INITIALIZED_EVENT).unwrap();
        assert_eq!(init.tag, RecordTag::Event);
        assert!(init.inferred);
    }

    #[test]
    fn test_invalid_namespace_name_is_rejected() {
        let result = Namespace::new("acme/core", NamespaceSpec::default());
        assert!(matches!(result, Err(CompileError::InvalidName { .. })));
    }
}
