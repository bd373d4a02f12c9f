// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Attribute dependency compiler.
//!
//! Turns a dataflow's patterns into their validated, ordered form:
//!
//! 1. Each assignment is classified (query, computed, reference, compound).
//! 2. Its value expression is walked for references; each reference must
//!    resolve against the pattern, a bound variable or the enclosing schema.
//! 3. Edges are added to a per-pattern [`DependencyGraph`] and checked for a
//!    cycle through the attribute just added.
//! 4. [`topological_order`] produces a deterministic evaluation order.
//!
//! All state for one compilation lives in a [`CompilationContext`].

mod context;
mod dataflow;
mod dependency_graph;
mod expr;
mod ordering;
mod pattern;


pub use context::CompilationContext;
pub use dataflow::{compile_dataflow, CompiledDataflow, CompiledStep};
pub use dependency_graph::DependencyGraph;
pub use expr::{is_reference, Expr};
pub use ordering::topological_order;
pub use pattern::{
    bare_name, classify, compile_pattern, dependencies_of, sort_attributes_by_dependency, AttributeClass,
    CompiledAssignment, CompiledPattern, Dependencies, PatternScope,
};
