// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::sync::Arc;

use crate::compiler::context::CompilationContext;
use crate::compiler::expr::Expr;
use crate::compiler::pattern::{classify, compile_pattern, dependencies_of, CompiledPattern, PatternScope};
use crate::config::consts::REFERENCE_SEPARATOR;
use crate::dataflow::{Dataflow, Pattern};
use crate::errors::CompileError;
use crate::model::Path;
use crate::registry::NamespaceTable;

/// One step of a compiled dataflow body.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledStep {
    Bind {
        alias: String,
        source: Expr,
        /// Record type of the bound value, when it can be inferred
        bound_type: Option<Path>,
    },
    Pattern(CompiledPattern),
}

/// The validated, ordered form of a dataflow handed to the executor.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDataflow {
    pub event: Path,
    pub steps: Vec<CompiledStep>,
}

impl CompiledDataflow {
    pub fn empty(event: Path) -> Self {
        Self {
            event,
            steps: Vec::new(),
        }
    }

    pub fn patterns(&self) -> impl Iterator<Item = &CompiledPattern> {
        self.steps.iter().filter_map(|step| match step {
            CompiledStep::Pattern(p) => Some(p),
            CompiledStep::Bind { .. } => None,
        })
    }
}

impl fmt::Display for CompiledDataflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "on {}", self.event)?;
        for step in &self.steps {
            match step {
                CompiledStep::Bind { alias, source, bound_type } => {
                    write!(f, "  let {} = {}", alias, source)?;
                    if let Some(ty) = bound_type {
                        write!(f, " : {}", ty)?;
                    }
                    writeln!(f)?;
                }
                CompiledStep::Pattern(p) => writeln!(f, "  {}", p)?,
            }
        }
        Ok(())
    }
}

/// Follow `Head.Attr.Attr...` through record schemas to the type it lands on.
fn infer_bound_type(ctx: &mut CompilationContext, source: &Expr) -> Option<Path> {
    let (Expr::Ref(reference) | Expr::Var(reference)) = source else {
        return None;
    };
    let mut segments = reference.split(REFERENCE_SEPARATOR);
    let mut ty = ctx.variable_type(segments.next()?)?.clone();
    for attribute in segments {
        let schema = ctx.record_schema(&ty)?;
        let next = schema.attribute_type(attribute)?.clone();
        ty = ctx.record_schema(&next)?.path.clone();
    }
    Some(ty)
}

/// Compile every pattern of `dataflow` in a fresh context.
///
/// The triggering event is bound under its own name, explicit bindings and
/// pattern aliases are bound as they appear, and each record pattern is
/// dependency-sorted.
pub fn compile_dataflow(table: Arc<NamespaceTable>, dataflow: &Dataflow) -> Result<CompiledDataflow, CompileError> {
    let namespace = dataflow.event.namespace().ok_or_else(|| CompileError::InvalidName {
        kind: "unqualified event".into(),
        name: dataflow.event.to_string(),
    })?;

    let mut ctx = CompilationContext::new(table, namespace);
    let event = ctx
        .record_schema(&dataflow.event)
        .ok_or_else(|| CompileError::SchemaNotFound {
            path: dataflow.event.to_string(),
            referenced_from: "dataflow".into(),
        })?;
    ctx.bind_variable(event.path.name(), Some(event.path.clone()));

    let mut compiled = CompiledDataflow::empty(event.path.clone());
    for pattern in &dataflow.patterns {
        let step = match pattern {
            Pattern::Bind { alias, source } => {
                classify(alias, source)?;
                dependencies_of(&mut ctx, &PatternScope::empty(), alias, source)?;
                let bound_type = infer_bound_type(&mut ctx, source);
                ctx.bind_variable(alias.clone(), bound_type.clone());
                CompiledStep::Bind {
                    alias: alias.clone(),
                    source: source.clone(),
                    bound_type,
                }
            }
            Pattern::Record(record) => CompiledStep::Pattern(compile_pattern(&mut ctx, record)?),
        };
        compiled.steps.push(step);
    }
    Ok(compiled)
}
