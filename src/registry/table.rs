// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::consts::KERNEL_NAMESPACE;
use crate::dataflow::Dataflow;
use crate::errors::CompileError;
use crate::model::{AttributeKind, AttributeSchema, Path, RecordSchema, RecordTag};
use crate::registry::kernel::kernel_namespace;
use crate::registry::namespace::Namespace;

/// An immutable view of every namespace at one point in time.
///
/// All lookups take fully qualified paths unless stated otherwise. Resolution
/// of bare names happens in [`NamespaceTable::resolve_type`] and friends, which
/// take the current namespace explicitly.
#[derive(Debug, Clone)]
pub struct NamespaceTable {
    namespaces: BTreeMap<String, Arc<Namespace>>,
}

impl Default for NamespaceTable {
    fn default() -> Self {
        let mut namespaces = BTreeMap::new();
        namespaces.insert(KERNEL_NAMESPACE.to_string(), Arc::new(kernel_namespace()));
        Self { namespaces }
    }
}

impl NamespaceTable {
    pub fn namespace(&self, name: &str) -> Option<&Arc<Namespace>> {
        self.namespaces.get(name)
    }

    pub fn contains_namespace(&self, name: &str) -> bool {
        self.namespaces.contains_key(name)
    }

    pub fn namespace_names(&self) -> impl Iterator<Item = &String> {
        self.namespaces.keys()
    }

    pub(crate) fn insert_namespace(&mut self, ns: Namespace) -> bool {
        self.namespaces
            .insert(ns.name.clone(), Arc::new(ns))
            .is_some()
    }

    pub(crate) fn remove_namespace(&mut self, name: &str) -> bool {
        self.namespaces.remove(name).is_some()
    }

    /// Writable access for a transaction; a missing namespace is a hard error.
    pub(crate) fn namespace_mut(
        &mut self,
        namespace: &str,
        tag: &str,
        name: &str,
    ) -> Result<&mut Namespace, CompileError> {
        self.namespaces
            .get_mut(namespace)
            .map(Arc::make_mut)
            .ok_or_else(|| CompileError::NamespaceNotFound {
                namespace: namespace.to_string(),
                tag: tag.to_string(),
                name: name.to_string(),
            })
    }

    pub fn find_attribute_schema(&self, path: &Path) -> Option<&Arc<AttributeSchema>> {
        self.namespace(path.namespace()?)?.attributes.get(path.name())
    }

    pub fn find_record_schema(&self, path: &Path) -> Option<&Arc<RecordSchema>> {
        self.namespace(path.namespace()?)?.records.get(path.name())
    }

    fn find_tagged(&self, path: &Path, tag: RecordTag) -> Option<&Arc<RecordSchema>> {
        self.find_record_schema(path).filter(|s| s.tag == tag)
    }

    pub fn find_entity_schema(&self, path: &Path) -> Option<&Arc<RecordSchema>> {
        self.find_tagged(path, RecordTag::Entity)
    }

    pub fn find_event_schema(&self, path: &Path) -> Option<&Arc<RecordSchema>> {
        self.find_tagged(path, RecordTag::Event)
    }

    /// Dataflows registered on an event, in registration order.
    pub fn dataflows_for_event(&self, event: &Path) -> &[Arc<Dataflow>] {
        event
            .namespace()
            .and_then(|ns| self.namespace(ns))
            .and_then(|ns| ns.events.get(event.name()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Replace an import alias in `path` with the namespace it stands for.
    pub fn expand_alias(&self, current: &str, path: &Path) -> Path {
        match path.namespace() {
            Some(alias) => match self.namespace(current).and_then(|ns| ns.alias_target(alias)) {
                Some(target) => path.with_namespace(target),
                None => path.clone(),
            },
            None => path.clone(),
        }
    }

    /// Resolve a type reference to the attribute or record schema it names.
    ///
    /// Qualified paths are used verbatim after alias expansion. Bare names are
    /// looked up in `current` and then in the kernel namespace.
    pub fn resolve_type(&self, current: &str, path: &Path) -> Option<Path> {
        let exists = |p: &Path| self.find_attribute_schema(p).is_some() || self.find_record_schema(p).is_some();
        if path.is_qualified() {
            let expanded = self.expand_alias(current, path);
            return exists(&expanded).then_some(expanded);
        }
        [current, KERNEL_NAMESPACE]
            .into_iter()
            .map(|ns| path.qualify(ns))
            .find(|p| exists(p))
    }

    /// Like [`resolve_type`](Self::resolve_type) but only for record schemas.
    pub fn resolve_record(&self, current: &str, path: &Path) -> Option<Path> {
        let qualified = if path.is_qualified() {
            self.expand_alias(current, path)
        } else {
            path.qualify(current)
        };
        self.find_record_schema(&qualified).map(|_| qualified)
    }

    /// Resolve a type reference that appears inside a definition.
    ///
    /// `pending` names a record being interned in the same transaction, which may
    /// legitimately refer to itself.
    pub(crate) fn resolve_reference(
        &self,
        current: &str,
        path: &Path,
        referenced_from: &Path,
        pending: Option<&Path>,
    ) -> Result<Path, CompileError> {
        if let Some(found) = self.resolve_type(current, path) {
            return Ok(found);
        }
        let qualified = self.expand_alias(current, path).qualify(current);
        if pending == Some(&qualified) {
            return Ok(qualified);
        }
        Err(CompileError::SchemaNotFound {
            path: path.to_string(),
            referenced_from: referenced_from.to_string(),
        })
    }

    /// Resolve every type path inside an attribute schema before it is interned.
    pub(crate) fn resolve_attribute_refs(
        &self,
        current: &str,
        schema: AttributeSchema,
        referenced_from: &Path,
        pending: Option<&Path>,
    ) -> Result<AttributeSchema, CompileError> {
        let resolve = |path: &Path| self.resolve_reference(current, path, referenced_from, pending);

        let kind = match schema.kind {
            AttributeKind::Type(p) => AttributeKind::Type(resolve(&p)?),
            AttributeKind::ListOf(p) => AttributeKind::ListOf(resolve(&p)?),
            AttributeKind::SetOf(p) => AttributeKind::SetOf(resolve(&p)?),
            other => other,
        };
        Ok(AttributeSchema { kind, ..schema })
    }

    /// Every identity attribute of a record, in declaration order.
    pub fn identity_attributes(&self, record: &Path) -> Vec<String> {
        let Some(schema) = self.find_record_schema(record) else {
            return Vec::new();
        };
        schema
            .attributes
            .iter()
            .filter(|(_, ty)| self.find_attribute_schema(ty).is_some_and(|a| a.is_identity()))
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::namespace::NamespaceSpec;

    fn table_with(ns: &str, spec: NamespaceSpec) -> NamespaceTable {
        let mut table = NamespaceTable::default();
        table.insert_namespace(Namespace::new(ns, spec).unwrap());
        table
    }

    #[test]
    fn test_resolve_type_falls_back_to_kernel() {
        let table = table_with("Acme", NamespaceSpec::default());

        assert_eq!(
            table.resolve_type("Acme", &Path::parse("Number")),
            Some(Path::new("Kernel", "Number"))
        );
        assert_eq!(
            table.resolve_type("Acme", &Path::parse("Id")),
            Some(Path::new("Acme", "Id"))
        );
        assert_eq!(table.resolve_type("Acme", &Path::parse("Missing")), None);
    }

    #[test]
    fn test_alias_expansion() {
        let mut table = table_with("Acme.Shared", NamespaceSpec::default());
        table.insert_namespace(
            Namespace::new("Acme.Core", NamespaceSpec::default().with_import("Acme.Shared as S")).unwrap(),
        );

        assert_eq!(
            table.resolve_type("Acme.Core", &Path::parse("S/Id")),
            Some(Path::new("Acme.Shared", "Id"))
        );
    }

    #[test]
    fn test_namespace_mut_reports_missing_namespace() {
        let mut table = NamespaceTable::default();
        let err = table.namespace_mut("Foo", "attribute", "Email").unwrap_err();
        assert_eq!(
            err,
            CompileError::NamespaceNotFound {
                namespace: "Foo".into(),
                tag: "attribute".into(),
                name: "Email".into(),
            }
        );
    }
}
