// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pattern compilation: classify each assignment, extract its dependencies,
//! reject cycles and unresolved references, then order the assignments.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::compiler::context::CompilationContext;
use crate::compiler::dependency_graph::DependencyGraph;
use crate::compiler::expr::{is_reference, Expr};
use crate::compiler::ordering::topological_order;
use crate::config::consts::{QUERY_MARKER, REFERENCE_SEPARATOR};
use crate::dataflow::RecordPattern;
use crate::errors::CompileError;
use crate::model::{Path, RecordSchema};
use crate::observability::messages::compiler::{
    CyclicAttributeDependencyDetected, PatternCompiled, ReferenceRejected,
};
use crate::observability::messages::StructuredLog;

/// How an assignment produces its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeClass {
    /// The attribute name carries the query marker
    Query,
    /// A literal value
    Computed,
    /// A direct reference or variable
    Refs,
    /// A call or list expression
    Compound,
}

/// The pattern attributes an assignment reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependencies {
    None,
    Single(String),
    /// Union of the dependencies of a nested expression's sub-terms
    Multiple(BTreeSet<String>),
}

impl Dependencies {
    pub fn names(&self) -> Vec<&str> {
        match self {
            Dependencies::None => Vec::new(),
            Dependencies::Single(name) => vec![name.as_str()],
            Dependencies::Multiple(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompiledAssignment {
    pub name: String,
    pub class: AttributeClass,
    pub expr: Expr,
    pub dependencies: Dependencies,
}

/// A pattern with its assignments in evaluation order.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledPattern {
    pub record: Path,
    pub alias: Option<String>,
    pub assignments: Vec<CompiledAssignment>,
}

impl CompiledPattern {
    pub fn order(&self) -> Vec<&str> {
        self.assignments.iter().map(|a| a.name.as_str()).collect()
    }
}

impl fmt::Display for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.record)?;
        if let Some(alias) = &self.alias {
            write!(f, " as {}", alias)?;
        }
        f.write_str(" {")?;
        for (i, a) in self.assignments.iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{}: {}", sep, a.name, a.expr)?;
        }
        f.write_str(" }")
    }
}

/// Strip the query marker from an assignment name.
pub fn bare_name(name: &str) -> &str {
    name.strip_suffix(QUERY_MARKER).unwrap_or(name)
}

fn split_head(s: &str) -> (&str, Option<&str>) {
    match s.split_once(REFERENCE_SEPARATOR) {
        Some((head, rest)) => (head, Some(rest)),
        None => (s, None),
    }
}

/// Classify one assignment.
pub fn classify(name: &str, value: &Expr) -> Result<AttributeClass, CompileError> {
    let invalid = |reason: &str| CompileError::InvalidAttributePattern {
        attribute: name.to_string(),
        reason: reason.to_string(),
    };

    if name.ends_with(QUERY_MARKER) {
        return Ok(AttributeClass::Query);
    }
    match value {
        v if v.is_literal() => Ok(AttributeClass::Computed),
        Expr::Ref(r) | Expr::Var(r) if is_reference(r) => Ok(AttributeClass::Refs),
        Expr::Ref(r) | Expr::Var(r) => Err(invalid(&format!("'{}' is not a reference", r))),
        Expr::Call { op, .. } if op.is_empty() => Err(invalid("call without an operator")),
        Expr::Call { .. } | Expr::List(_) => Ok(AttributeClass::Compound),
        _ => Err(invalid("nil is not a value")),
    }
}

/// Names a pattern reference may resolve against.
pub struct PatternScope<'a> {
    record: Option<&'a RecordSchema>,
    /// Bare attribute name → assignment name as written
    attributes: BTreeMap<String, String>,
}

impl<'a> PatternScope<'a> {
    pub fn new(record: Option<&'a RecordSchema>, assignments: &[(String, Expr)]) -> Self {
        let attributes = assignments
            .iter()
            .map(|(name, _)| (bare_name(name).to_string(), name.clone()))
            .collect();
        Self { record, attributes }
    }

    /// A scope with no pattern attributes and no enclosing record.
    pub fn empty() -> Self {
        Self {
            record: None,
            attributes: BTreeMap::new(),
        }
    }

    fn record_has(&self, attribute: &str) -> bool {
        self.record
            .is_some_and(|r| r.inferred || r.has_attribute(attribute))
    }
}

fn unresolved(attribute: &str, reference: &str) -> CompileError {
    ReferenceRejected {
        attribute,
        reference,
        reason: "reference not in context",
    }
    .log();
    CompileError::UnresolvedReference {
        attribute: attribute.to_string(),
        reference: reference.to_string(),
    }
}

/// Check that `attribute_path` (the part after a typed head) names an
/// attribute of `ty`. Unknown types and inferred schemas accept anything.
fn typed_member_exists(ctx: &mut CompilationContext, ty: &Path, attribute_path: &str) -> bool {
    let (first, _) = split_head(attribute_path);
    match ctx.record_schema(ty) {
        Some(schema) => schema.inferred || schema.has_attribute(first),
        None => true,
    }
}

/// Resolve one reference, returning the pattern attribute it depends on.
fn resolve_reference(
    ctx: &mut CompilationContext,
    scope: &PatternScope,
    attribute: &str,
    reference: &str,
) -> Result<Option<String>, CompileError> {
    if !is_reference(reference) {
        return Err(unresolved(attribute, reference));
    }

    let path = Path::parse(reference);
    if path.is_qualified() {
        let (record, rest) = split_head(path.name());
        let record_path = Path::new(path.namespace().unwrap_or_default(), record);
        if let Some(schema) = ctx.record_schema(&record_path) {
            let (first, _) = rest.map(split_head).unwrap_or(("", None));
            let own_record = scope.record.is_some_and(|r| r.path == schema.path);
            return match rest {
                None => Ok(None),
                Some(_) if own_record && scope.attributes.contains_key(first) => {
                    Ok(scope.attributes.get(first).cloned())
                }
                Some(_) if schema.inferred || schema.has_attribute(first) => Ok(None),
                Some(_) => Err(unresolved(attribute, reference)),
            };
        }
        let expanded = ctx.expand(&path);
        return match ctx.table().find_attribute_schema(&expanded) {
            Some(_) => Ok(None),
            None => Err(unresolved(attribute, reference)),
        };
    }

    let (head, rest) = split_head(reference);

    if let Some(name) = scope.attributes.get(head) {
        return Ok(Some(name.clone()));
    }

    // A bound variable shadows the enclosing record's name.
    if ctx.is_bound(head) {
        let ty = ctx.variable_type(head).cloned();
        return match (ty, rest) {
            (Some(ty), Some(rest)) if !typed_member_exists(ctx, &ty, rest) => Err(unresolved(attribute, reference)),
            _ => Ok(None),
        };
    }

    if let (Some(record), Some(rest)) = (scope.record, rest) {
        if head == record.path.name() {
            let (first, _) = split_head(rest);
            if let Some(name) = scope.attributes.get(first) {
                return Ok(Some(name.clone()));
            }
            if scope.record_has(first) {
                return Ok(None);
            }
            return Err(unresolved(attribute, reference));
        }
    }

    if rest.is_none() && (scope.record_has(head) || ctx.record_schema(&Path::unqualified(head)).is_some()) {
        return Ok(None);
    }

    Err(unresolved(attribute, reference))
}

fn resolve_variable(ctx: &mut CompilationContext, attribute: &str, variable: &str) -> Result<(), CompileError> {
    let (head, rest) = split_head(variable);
    if !ctx.is_bound(head) {
        ReferenceRejected {
            attribute,
            reference: variable,
            reason: "variable not in context",
        }
        .log();
        return Err(CompileError::UnboundVariable {
            attribute: attribute.to_string(),
            variable: variable.to_string(),
        });
    }
    match (ctx.variable_type(head).cloned(), rest) {
        (Some(ty), Some(rest)) if !typed_member_exists(ctx, &ty, rest) => Err(unresolved(attribute, variable)),
        _ => Ok(()),
    }
}

/// The pattern attributes `value` reads.
pub fn dependencies_of(
    ctx: &mut CompilationContext,
    scope: &PatternScope,
    attribute: &str,
    value: &Expr,
) -> Result<Dependencies, CompileError> {
    match value {
        Expr::Ref(r) => Ok(match resolve_reference(ctx, scope, attribute, r)? {
            Some(dep) => Dependencies::Single(dep),
            None => Dependencies::None,
        }),
        Expr::Var(v) => resolve_variable(ctx, attribute, v).map(|_| Dependencies::None),
        Expr::Call { .. } | Expr::List(_) => {
            let mut all = BTreeSet::new();
            for leaf in value.leaves() {
                all.extend(dependencies_of(ctx, scope, attribute, leaf)?.names().into_iter().map(String::from));
            }
            Ok(if all.is_empty() {
                Dependencies::None
            } else {
                Dependencies::Multiple(all)
            })
        }
        _ => Ok(Dependencies::None),
    }
}

/// Order assignments so that each follows every attribute it reads.
///
/// Edges are added one attribute at a time and each addition is checked for a
/// cycle through that attribute, so the first offending attribute is the one
/// reported.
pub fn sort_attributes_by_dependency(
    ctx: &mut CompilationContext,
    record: Option<&RecordSchema>,
    assignments: &[(String, Expr)],
) -> Result<Vec<CompiledAssignment>, CompileError> {
    let scope = PatternScope::new(record, assignments);
    if scope.attributes.len() != assignments.len() {
        let mut seen = BTreeSet::new();
        let duplicate = assignments
            .iter()
            .map(|(name, _)| bare_name(name))
            .find(|name| !seen.insert(*name))
            .unwrap_or_default();
        return Err(CompileError::InvalidAttributePattern {
            attribute: duplicate.to_string(),
            reason: "assigned more than once".into(),
        });
    }

    let mut graph = DependencyGraph::new();
    let mut compiled: BTreeMap<&str, CompiledAssignment> = BTreeMap::new();

    for (name, expr) in assignments {
        let class = classify(name, expr)?;
        let dependencies = dependencies_of(ctx, &scope, name, expr)?;

        graph.add_dependencies(name, dependencies.names());
        if let Some(cycle) = graph.find_cycle_through(name) {
            CyclicAttributeDependencyDetected {
                attribute: name,
                cycle: &cycle,
            }
            .log();
            return Err(CompileError::CyclicAttributeDependency {
                attribute: name.clone(),
                cycle,
            });
        }

        compiled.insert(
            name.as_str(),
            CompiledAssignment {
                name: name.clone(),
                class,
                expr: expr.clone(),
                dependencies,
            },
        );
    }

    let order = topological_order(&graph)?;
    Ok(order
        .iter()
        .filter_map(|name| compiled.remove(name.as_str()))
        .collect())
}

/// Compile one record pattern and bind its alias for the patterns after it.
pub fn compile_pattern(ctx: &mut CompilationContext, pattern: &RecordPattern) -> Result<CompiledPattern, CompileError> {
    let schema = ctx
        .record_schema(&pattern.record)
        .ok_or_else(|| CompileError::SchemaNotFound {
            path: pattern.record.to_string(),
            referenced_from: format!("pattern in namespace '{}'", ctx.namespace()),
        })?;

    if !schema.inferred {
        if let Some((name, _)) = pattern
            .attributes
            .iter()
            .find(|(name, _)| !schema.has_attribute(bare_name(name)))
        {
            return Err(CompileError::InvalidAttributePattern {
                attribute: name.clone(),
                reason: format!("not an attribute of {}", schema.path),
            });
        }
    }

    let assignments = sort_attributes_by_dependency(ctx, Some(&schema), &pattern.attributes)?;
    let compiled = CompiledPattern {
        record: schema.path.clone(),
        alias: pattern.alias.clone(),
        assignments,
    };

    let record = compiled.record.to_string();
    PatternCompiled {
        record: &record,
        order: &compiled.order(),
    }
    .log();

    if let Some(alias) = &pattern.alias {
        ctx.bind_variable(alias.clone(), Some(schema.path.clone()));
    }
    Ok(compiled)
}
