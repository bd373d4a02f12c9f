// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::model::{Path, RecordSchema};
use crate::registry::NamespaceTable;

/// Scratch state for one compilation session.
///
/// Carries the current namespace explicitly, so two sessions compiling in
/// different namespaces never share state. Holds a registry snapshot taken when
/// the session started, the record schemas resolved so far, bound local
/// variables with their types when known, and import aliases.
#[derive(Debug, Clone)]
pub struct CompilationContext {
    namespace: String,
    table: Arc<NamespaceTable>,
    schemas: BTreeMap<Path, Arc<RecordSchema>>,
    variables: BTreeMap<String, Option<Path>>,
    aliases: BTreeMap<String, String>,
}

impl CompilationContext {
    /// Start a session in `namespace`, picking up its import aliases.
    pub fn new(table: Arc<NamespaceTable>, namespace: &str) -> Self {
        let aliases = table
            .namespace(namespace)
            .map(|ns| {
                ns.imports
                    .iter()
                    .filter_map(|i| i.alias.clone().map(|a| (a, i.namespace.clone())))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            namespace: namespace.to_string(),
            table,
            schemas: BTreeMap::new(),
            variables: BTreeMap::new(),
            aliases,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn table(&self) -> &NamespaceTable {
        &self.table
    }

    pub fn bind_variable(&mut self, name: impl Into<String>, ty: Option<Path>) {
        self.variables.insert(name.into(), ty);
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    /// The type of a bound variable, when it is known.
    pub fn variable_type(&self, name: &str) -> Option<&Path> {
        self.variables.get(name).and_then(Option::as_ref)
    }

    pub fn add_alias(&mut self, alias: impl Into<String>, namespace: impl Into<String>) {
        self.aliases.insert(alias.into(), namespace.into());
    }

    /// Replace an alias namespace segment and qualify bare names with the
    /// current namespace.
    pub fn expand(&self, path: &Path) -> Path {
        match path.namespace() {
            Some(ns) => match self.aliases.get(ns) {
                Some(target) => path.with_namespace(target.clone()),
                None => path.clone(),
            },
            None => path.qualify(&self.namespace),
        }
    }

    /// Look up a record schema, remembering it for the rest of the session.
    pub fn record_schema(&mut self, path: &Path) -> Option<Arc<RecordSchema>> {
        let qualified = self.expand(path);
        if let Some(found) = self.schemas.get(&qualified) {
            return Some(found.clone());
        }
        let schema = self.table.find_record_schema(&qualified)?.clone();
        self.schemas.insert(qualified, schema.clone());
        Some(schema)
    }

    /// Record schemas resolved in this session, in path order.
    pub fn known_schemas(&self) -> impl Iterator<Item = &Path> {
        self.schemas.keys()
    }
}
