// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Registration of dataflows into the namespace registry.

use std::sync::Arc;

use crate::compiler::Expr;
use crate::config::consts::{LIFECYCLE_INSTANCE_ATTRIBUTE, REFERENCE_SEPARATOR};
use crate::dataflow::{Dataflow, DataflowHead, LifecycleKind, LifecycleTarget, Pattern, PredicateTable};
use crate::errors::CompileError;
use crate::model::{AttributeDecl, Attributes, Instance, Path, RecordDecl, RecordTag, Tagged, Value};
use crate::observability::messages::registry::DataflowRegistered;
use crate::observability::messages::StructuredLog;
use crate::registry::{intern_record_in, NamespaceRegistry, NamespaceTable};
use crate::validation::make_instance;

fn event_namespace<'a>(event: &'a Path, tag: &str) -> Result<&'a str, CompileError> {
    event.namespace().ok_or_else(|| CompileError::InvalidName {
        kind: format!("unqualified {}", tag),
        name: event.to_string(),
    })
}

/// Append a dataflow to its event's list, interning an inferred event schema
/// when the event has not been declared.
fn append_dataflow(table: &mut NamespaceTable, dataflow: Dataflow) -> Result<(Arc<Dataflow>, usize), CompileError> {
    let event = dataflow.event.clone();
    let label = event.to_string();
    let ns = event_namespace(&event, "dataflow")?;
    table.namespace_mut(ns, "dataflow", &label)?;

    match table.find_record_schema(&event).map(|s| s.tag) {
        Some(RecordTag::Event) => {}
        Some(other) => {
            return Err(CompileError::InvalidName {
                kind: format!("dataflow event ({} found)", other),
                name: label,
            })
        }
        None => {
            intern_record_in(table, ns, &event, RecordDecl::event().inferred())?;
        }
    }

    let dataflow = Arc::new(dataflow);
    let list = table
        .namespace_mut(ns, "dataflow", &label)?
        .events
        .entry(event.name().to_string())
        .or_default();
    list.push(dataflow.clone());
    Ok((dataflow, list.len() - 1))
}

fn log_registered(dataflow: &Dataflow, position: usize) {
    let event = dataflow.event.to_string();
    DataflowRegistered {
        event: &event,
        position,
        pattern_count: dataflow.patterns.len(),
    }
    .log();
}

impl NamespaceRegistry {
    /// Register a dataflow on `event`. Dataflows accumulate in registration
    /// order; registering the same body twice yields two dataflows.
    pub fn register_dataflow(
        &self,
        event: &Path,
        head: DataflowHead,
        patterns: Vec<Pattern>,
        predicates: &PredicateTable,
    ) -> Result<Arc<Dataflow>, CompileError> {
        if let Some(guard) = &head.guard {
            guard.validate(predicates)?;
        }

        let label = event.to_string();
        let (dataflow, position) = self.transact(&label, "dataflow", |table| {
            append_dataflow(table, Dataflow::new(event.clone(), head, patterns))
        })?;

        log_registered(&dataflow, position);
        Ok(dataflow)
    }

    /// Register `patterns` on all four lifecycle events of `entity`.
    ///
    /// Each derived dataflow starts by binding the entity name to the event's
    /// `Instance` payload. Lifecycle event schemas are interned on first use.
    /// Either all four dataflows are registered or none are.
    pub fn register_entity_dataflow(
        &self,
        entity: &Path,
        head: DataflowHead,
        patterns: Vec<Pattern>,
        predicates: &PredicateTable,
    ) -> Result<Vec<Arc<Dataflow>>, CompileError> {
        if let Some(guard) = &head.guard {
            guard.validate(predicates)?;
        }

        let label = entity.to_string();
        let registered = self.transact(&label, "dataflow", |table| {
            let ns = event_namespace(entity, "entity")?;
            table.namespace_mut(ns, "dataflow", &label)?;
            if table.find_entity_schema(entity).is_none() {
                return Err(CompileError::SchemaNotFound {
                    path: label.clone(),
                    referenced_from: "entity dataflow".into(),
                });
            }

            let mut registered = Vec::with_capacity(LifecycleKind::ALL.len());
            for kind in LifecycleKind::ALL {
                let event = kind.event_for(entity);
                if table.find_event_schema(&event).is_none() {
                    let decl = RecordDecl::event()
                        .attribute(LIFECYCLE_INSTANCE_ATTRIBUTE, AttributeDecl::Type(entity.clone()));
                    intern_record_in(table, ns, &event, decl)?;
                }

                let binding = Pattern::Bind {
                    alias: entity.name().to_string(),
                    source: Expr::reference(format!(
                        "{}{}{}",
                        event.name(),
                        REFERENCE_SEPARATOR,
                        LIFECYCLE_INSTANCE_ATTRIBUTE
                    )),
                };
                let head = DataflowHead {
                    on_entity_event: Some(LifecycleTarget {
                        entity: entity.clone(),
                        kind,
                    }),
                    ..head.clone()
                };
                let body = std::iter::once(binding).chain(patterns.iter().cloned()).collect();
                registered.push(append_dataflow(table, Dataflow::new(event, head, body))?);
            }
            Ok(registered)
        })?;

        for (dataflow, position) in &registered {
            log_registered(dataflow, *position);
        }
        Ok(registered.into_iter().map(|(d, _)| d).collect())
    }
}

/// Build the lifecycle event instance carrying `instance` as its payload.
pub fn lifecycle_event(table: &NamespaceTable, instance: &Instance, kind: LifecycleKind) -> Tagged {
    let mut attributes = Attributes::new();
    attributes.insert(
        LIFECYCLE_INSTANCE_ATTRIBUTE.to_string(),
        Value::Instance(Box::new(instance.clone())),
    );
    make_instance(table, &kind.event_for(&instance.path), attributes, true)
}
