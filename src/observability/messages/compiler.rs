// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the attribute dependency compiler.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Pattern assignments ordered by dependency.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct PatternCompiled<'a> {
    pub record: &'a str,
    pub order: &'a [&'a str],
}

impl Display for PatternCompiled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Compiled pattern for '{}': evaluation order [{}]",
            self.record,
            self.order.join(", ")
        )
    }
}

impl StructuredLog for PatternCompiled<'_> {
    fn log(&self) {
        tracing::debug!(
            record = self.record,
            order = self.order.join(", "),
            attribute_count = self.order.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "compile_pattern",
            span_name = name,
            record = self.record,
            attribute_count = self.order.len(),
        )
    }
}

/// Cyclic attribute dependency detected in a pattern.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use schemaflow::observability::messages::compiler::CyclicAttributeDependencyDetected;
///
/// let cycle = vec!["A".to_string(), "B".to_string(), "A".to_string()];
/// let msg = CyclicAttributeDependencyDetected {
///     attribute: "A",
///     cycle: &cycle,
/// };
///
/// assert_eq!(msg.to_string(), "Cyclic attribute dependency on 'A': A -> B -> A");
/// ```
pub struct CyclicAttributeDependencyDetected<'a> {
    pub attribute: &'a str,
    pub cycle: &'a [String],
}

impl Display for CyclicAttributeDependencyDetected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Cyclic attribute dependency on '{}': {}",
            self.attribute,
            self.cycle.join(" -> ")
        )
    }
}

impl StructuredLog for CyclicAttributeDependencyDetected<'_> {
    fn log(&self) {
        tracing::error!(
            attribute = self.attribute,
            cycle = self.cycle.join(" -> "),
            cycle_length = self.cycle.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            attribute = self.attribute,
            cycle = self.cycle.join(" -> "),
        )
    }
}

/// A reference or variable could not be resolved while compiling a pattern.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ReferenceRejected<'a> {
    pub attribute: &'a str,
    pub reference: &'a str,
    pub reason: &'a str,
}

impl Display for ReferenceRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Attribute '{}' references '{}': {}",
            self.attribute, self.reference, self.reason
        )
    }
}

impl StructuredLog for ReferenceRejected<'_> {
    fn log(&self) {
        tracing::error!(
            attribute = self.attribute,
            reference = self.reference,
            reason = self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            attribute = self.attribute,
            reference = self.reference,
        )
    }
}

/// Compiled form stored in a dataflow's opcode cell.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct OpcodeCached<'a> {
    pub event: &'a str,
    pub step_count: usize,
    /// False when another caller compiled first and this result was discarded
    pub stored: bool,
}

impl Display for OpcodeCached<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.stored {
            write!(f, "Cached compiled dataflow for '{}' ({} steps)", self.event, self.step_count)
        } else {
            write!(f, "Compiled dataflow for '{}' was already cached", self.event)
        }
    }
}

impl StructuredLog for OpcodeCached<'_> {
    fn log(&self) {
        tracing::debug!(
            event = self.event,
            step_count = self.step_count,
            stored = self.stored,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "opcode",
            span_name = name,
            event = self.event,
            step_count = self.step_count,
        )
    }
}
