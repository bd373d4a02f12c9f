// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Dataflows: event-triggered, ordered sequences of patterns.
//!
//! This module owns the dataflow data model, guard conditions, registration
//! into the namespace registry (including entity lifecycle expansion) and the
//! event matcher that selects the dataflows a concrete event triggers.

mod condition;
mod matcher;
mod registrar;

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::Deserialize;

use crate::compiler::{CompiledDataflow, Expr};
use crate::model::Path;

pub use condition::{CompareOp, Condition, Operand, PredicateFn, PredicateTable};
pub use matcher::{dataflows_for_event, matches_event};
pub use registrar::lifecycle_event;

/// The four lifecycle events derived for every entity with a dataflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleKind {
    OnUpsertBefore,
    OnUpsertAfter,
    OnDeleteBefore,
    OnDeleteAfter,
}

impl LifecycleKind {
    pub const ALL: [LifecycleKind; 4] = [
        LifecycleKind::OnUpsertBefore,
        LifecycleKind::OnUpsertAfter,
        LifecycleKind::OnDeleteBefore,
        LifecycleKind::OnDeleteAfter,
    ];

    /// Suffix appended to the entity name to form the event name.
    pub fn suffix(self) -> &'static str {
        match self {
            LifecycleKind::OnUpsertBefore => "_OnUpsert_Before",
            LifecycleKind::OnUpsertAfter => "_OnUpsert_After",
            LifecycleKind::OnDeleteBefore => "_OnDelete_Before",
            LifecycleKind::OnDeleteAfter => "_OnDelete_After",
        }
    }

    /// The lifecycle event path for `entity`.
    pub fn event_for(self, entity: &Path) -> Path {
        entity.with_suffix(self.suffix())
    }

    /// Split a lifecycle event path back into its entity and kind.
    pub fn parse_event(event: &Path) -> Option<(Path, LifecycleKind)> {
        let namespace = event.namespace()?;
        Self::ALL.into_iter().find_map(|kind| {
            event
                .name()
                .strip_suffix(kind.suffix())
                .filter(|entity| !entity.is_empty())
                .map(|entity| (Path::new(namespace, entity), kind))
        })
    }
}

/// The entity lifecycle event a dataflow was derived for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleTarget {
    pub entity: Path,
    pub kind: LifecycleKind,
}

/// Optional metadata attached to a dataflow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataflowHead {
    pub guard: Option<Condition>,
    pub on_entity_event: Option<LifecycleTarget>,
    pub doc: Option<String>,
}

impl DataflowHead {
    pub fn with_guard(mut self, guard: Condition) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

/// An attribute-assignment map over one record type.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordPattern {
    pub record: Path,
    pub alias: Option<String>,
    /// Assignments in declaration order
    pub attributes: Vec<(String, Expr)>,
}

impl RecordPattern {
    pub fn new(record: impl Into<Path>) -> Self {
        Self {
            record: record.into(),
            alias: None,
            attributes: Vec::new(),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn assign(mut self, name: impl Into<String>, value: Expr) -> Self {
        self.attributes.push((name.into(), value));
        self
    }
}

/// One step of a dataflow body.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Record(RecordPattern),
    /// Bind a local name to a value taken from what is already in scope
    Bind { alias: String, source: Expr },
}

impl From<RecordPattern> for Pattern {
    fn from(pattern: RecordPattern) -> Self {
        Pattern::Record(pattern)
    }
}

/// Single-assignment cache for a dataflow's compiled form.
///
/// Concurrent callers may all compile; the first to store wins and the others
/// get the stored value back.
#[derive(Debug, Clone, Default)]
pub struct OpcodeCell(OnceLock<Arc<CompiledDataflow>>);

impl OpcodeCell {
    pub fn get(&self) -> Option<Arc<CompiledDataflow>> {
        self.0.get().cloned()
    }

    /// Store `compiled` unless a value is already present. Returns the cached
    /// value and whether this call stored it.
    pub fn set(&self, compiled: CompiledDataflow) -> (Arc<CompiledDataflow>, bool) {
        let candidate = Arc::new(compiled);
        let stored = self.0.set(candidate.clone()).is_ok();
        match self.0.get() {
            Some(current) => (current.clone(), stored),
            None => (candidate, stored),
        }
    }

    /// Return the cached value or compute and store it.
    pub fn get_or_try_init<E>(
        &self,
        compile: impl FnOnce() -> Result<CompiledDataflow, E>,
    ) -> Result<(Arc<CompiledDataflow>, bool), E> {
        if let Some(cached) = self.get() {
            return Ok((cached, false));
        }
        Ok(self.set(compile()?))
    }
}

/// An event-triggered sequence of patterns.
#[derive(Debug, Clone)]
pub struct Dataflow {
    pub event: Path,
    pub head: DataflowHead,
    pub patterns: Vec<Pattern>,
    pub opcode: OpcodeCell,
}

impl Dataflow {
    pub fn new(event: Path, head: DataflowHead, patterns: Vec<Pattern>) -> Self {
        Self {
            event,
            head,
            patterns,
            opcode: OpcodeCell::default(),
        }
    }

    pub fn is_lifecycle(&self) -> bool {
        self.head.on_entity_event.is_some()
    }
}

impl fmt::Display for Dataflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} patterns", self.event, self.patterns.len())?;
        if self.head.guard.is_some() {
            f.write_str(", guarded")?;
        }
        f.write_str(")")
    }
}
