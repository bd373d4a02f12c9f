// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The namespace registry: every namespace, schema, dataflow and resolver spec.
//!
//! Reads go through an immutable [`NamespaceTable`] snapshot. Every write is a
//! transaction over a private copy of the whole table that is swapped in only
//! when it succeeds, so readers never see a half-interned record and a failed
//! write leaves the registry exactly as it was.

mod kernel;
mod namespace;
mod table;

use std::sync::Arc;

pub use kernel::{kernel_namespace, now_generator, uuid_generator, CheckTable, EMAIL_FORMAT};
pub use namespace::{is_valid_name, ImportSpec, Namespace, NamespaceSpec};
pub use table::NamespaceTable;

use crate::config::consts::{KERNEL_NAMESPACE, REFERENCE_SEPARATOR};
use crate::errors::CompileError;
use crate::model::{AttributeDecl, AttributeSchema, Path, RecordDecl, RecordSchema, RecordTag};
use crate::observability::messages::registry::{
    InternRejected, NamespaceCreated, NamespaceRemoved, ResolverSpecInstalled, SchemaInterned,
};
use crate::observability::messages::StructuredLog;
use crate::resolver::{ResolutionMode, ResolverSpec};
use crate::utils::SnapshotCell;

/// Owner of the namespace table.
///
/// One registry belongs to one [`Runtime`](crate::engine::Runtime); there is no
/// process-global instance.
#[derive(Default)]
pub struct NamespaceRegistry {
    table: SnapshotCell<NamespaceTable>,
}

/// Split a qualified path into its namespace, rejecting bare names.
fn owning_namespace<'a>(path: &'a Path, tag: &str) -> Result<&'a str, CompileError> {
    path.namespace().ok_or_else(|| CompileError::InvalidName {
        kind: format!("unqualified {}", tag),
        name: path.to_string(),
    })
}

fn check_name(path: &Path, tag: &str) -> Result<(), CompileError> {
    if is_valid_name(path.name()) {
        Ok(())
    } else {
        Err(CompileError::InvalidName {
            kind: tag.to_string(),
            name: path.to_string(),
        })
    }
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current table. Holding it does not block writers.
    pub fn snapshot(&self) -> Arc<NamespaceTable> {
        self.table.snapshot()
    }

    /// Run a write against a private copy of the table. Failures are logged and
    /// leave the registry untouched.
    pub(crate) fn transact<R>(
        &self,
        name: &str,
        tag: &str,
        f: impl FnOnce(&mut NamespaceTable) -> Result<R, CompileError>,
    ) -> Result<R, CompileError> {
        self.table.transact(f).map_err(|error| {
            InternRejected {
                name,
                tag,
                error: &error,
            }
            .log();
            error
        })
    }

    /// Create or replace a namespace. Returns true when an existing namespace
    /// was replaced.
    pub fn create_namespace(&self, name: &str, spec: NamespaceSpec) -> Result<bool, CompileError> {
        if name == KERNEL_NAMESPACE {
            return Err(CompileError::InvalidName {
                kind: "reserved namespace".into(),
                name: name.to_string(),
            });
        }
        let ns = Namespace::new(name, spec)?;
        let replaced = self.transact(name, "namespace", |table| Ok(table.insert_namespace(ns)))?;

        NamespaceCreated {
            namespace: name,
            replaced,
        }
        .log();
        Ok(replaced)
    }

    /// Drop a namespace with everything it holds. The kernel namespace stays.
    pub fn remove_namespace(&self, name: &str) -> bool {
        if name == KERNEL_NAMESPACE {
            return false;
        }
        let removed = self
            .table
            .transact(|table| Ok::<_, CompileError>(table.remove_namespace(name)))
            .unwrap_or(false);
        if removed {
            NamespaceRemoved { namespace: name }.log();
        }
        removed
    }

    /// Intern a named attribute schema at a fully qualified path.
    pub fn intern_attribute(&self, path: &Path, schema: AttributeSchema) -> Result<(), CompileError> {
        let label = path.to_string();
        self.transact(&label, "attribute", |table| {
            let ns = owning_namespace(path, "attribute")?;
            table.namespace_mut(ns, "attribute", &label)?;
            check_name(path, "attribute")?;

            let resolved = table.resolve_attribute_refs(ns, schema, path, None)?;
            table
                .namespace_mut(ns, "attribute", &label)?
                .attributes
                .insert(path.name().to_string(), Arc::new(resolved));
            Ok(())
        })?;

        SchemaInterned {
            path: &label,
            tag: "attribute",
        }
        .log();
        Ok(())
    }

    /// Intern a record, entity or event schema.
    ///
    /// Inline attribute schemas are interned next to it as `<Record>.<attribute>`.
    /// An attribute may refer to the record being interned.
    pub fn intern_record(&self, path: &Path, decl: RecordDecl) -> Result<Arc<RecordSchema>, CompileError> {
        let label = path.to_string();
        let tag = decl.tag.to_string();
        let schema = self.transact(&label, &tag, |table| {
            let ns = owning_namespace(path, &tag)?;
            table.namespace_mut(ns, &tag, &label)?;
            check_name(path, &tag)?;
            intern_record_in(table, ns, path, decl)
        })?;

        SchemaInterned {
            path: &label,
            tag: &tag,
        }
        .log();
        Ok(schema)
    }

    pub fn intern_entity(&self, path: &Path, decl: RecordDecl) -> Result<Arc<RecordSchema>, CompileError> {
        self.intern_record(path, RecordDecl { tag: RecordTag::Entity, ..decl })
    }

    pub fn intern_event(&self, path: &Path, decl: RecordDecl) -> Result<Arc<RecordSchema>, CompileError> {
        self.intern_record(path, RecordDecl { tag: RecordTag::Event, ..decl })
    }

    /// Record a resolver spec against a type (or `*` for the whole namespace).
    ///
    /// Compose specs append to the target's list; override specs replace it.
    pub fn install_resolver(&self, namespace: &str, target: &str, spec: ResolverSpec) -> Result<(), CompileError> {
        let label = format!("{}/{}", namespace, target);
        let resolver = spec.name.clone();
        self.transact(&label, "resolver", |table| {
            let ns = table.namespace_mut(namespace, "resolver", &label)?;
            let slot = ns.resolvers.entry(target.to_string()).or_default();
            match spec.mode {
                ResolutionMode::Compose => slot.push(spec),
                ResolutionMode::Override => *slot = vec![spec],
            }
            Ok(())
        })?;

        ResolverSpecInstalled {
            namespace,
            target,
            resolver: &resolver,
        }
        .log();
        Ok(())
    }

    pub fn find_attribute_schema(&self, path: &Path) -> Option<Arc<AttributeSchema>> {
        self.snapshot().find_attribute_schema(path).cloned()
    }

    pub fn find_record_schema(&self, path: &Path) -> Option<Arc<RecordSchema>> {
        self.snapshot().find_record_schema(path).cloned()
    }

    pub fn find_entity_schema(&self, path: &Path) -> Option<Arc<RecordSchema>> {
        self.snapshot().find_entity_schema(path).cloned()
    }

    pub fn find_event_schema(&self, path: &Path) -> Option<Arc<RecordSchema>> {
        self.snapshot().find_event_schema(path).cloned()
    }
}

/// Intern a record inside an open transaction.
pub(crate) fn intern_record_in(
    table: &mut NamespaceTable,
    ns: &str,
    path: &Path,
    decl: RecordDecl,
) -> Result<Arc<RecordSchema>, CompileError> {
    let mut attributes = Vec::with_capacity(decl.attributes.len());
    let mut inline = Vec::new();

    for (name, attr) in decl.attributes {
        let ty = match attr {
            AttributeDecl::Type(p) => table.resolve_reference(ns, &p, path, Some(path))?,
            AttributeDecl::Inline(schema) => {
                let inline_path = Path::new(ns, format!("{}{}{}", path.name(), REFERENCE_SEPARATOR, name));
                let resolved = table.resolve_attribute_refs(ns, schema, &inline_path, Some(path))?;
                inline.push((inline_path.name().to_string(), Arc::new(resolved)));
                inline_path
            }
        };
        attributes.push((name, ty));
    }

    let schema = Arc::new(RecordSchema {
        tag: decl.tag,
        path: path.clone(),
        attributes,
        inferred: decl.inferred,
    });

    let target = table.namespace_mut(ns, &decl.tag.to_string(), &path.to_string())?;
    target.attributes.extend(inline);
    target.records.insert(path.name().to_string(), schema.clone());
    Ok(schema)
}
