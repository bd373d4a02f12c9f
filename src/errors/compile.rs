// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

/// Structural failures raised while interning schema or compiling patterns.
///
/// These indicate a malformed program rather than bad runtime data, and abort
/// the current compilation unit.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    /// Interning into a namespace that was never created
    NamespaceNotFound {
        namespace: String,
        /// What was being interned: attribute, record, entity, event, resolver, dataflow
        tag: String,
        name: String,
    },
    /// A type reference names no known attribute or record schema
    SchemaNotFound {
        path: String,
        /// Where the reference appeared
        referenced_from: String,
    },
    /// An attribute's value expression depends, directly or transitively, on itself
    CyclicAttributeDependency {
        attribute: String,
        /// The cycle path, starting and ending at the same attribute
        cycle: Vec<String>,
    },
    /// A reference resolves to nothing in the pattern, context or enclosing schema
    UnresolvedReference { attribute: String, reference: String },
    /// A variable is used before anything binds it
    UnboundVariable { attribute: String, variable: String },
    /// An assignment value that is none of query, literal, reference or expression
    InvalidAttributePattern { attribute: String, reason: String },
    /// A guard condition that can never be evaluated
    InvalidConditionExpression { reason: String },
    /// An import spec that is not `Namespace` or `Namespace as Alias`
    MalformedImport { namespace: String, spec: String },
    /// A namespace or definition name with illegal characters
    InvalidName { kind: String, name: String },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::NamespaceNotFound { namespace, tag, name } => {
                write!(
                    f,
                    "Namespace '{}' not found while interning {} '{}'",
                    namespace, tag, name
                )
            }
            CompileError::SchemaNotFound { path, referenced_from } => {
                write!(f, "Schema '{}' not found (referenced from '{}')", path, referenced_from)
            }
            CompileError::CyclicAttributeDependency { attribute, cycle } => {
                write!(
                    f,
                    "Cyclic attribute dependency on '{}': {}",
                    attribute,
                    cycle.join(" -> ")
                )
            }
            CompileError::UnresolvedReference { attribute, reference } => {
                write!(
                    f,
                    "Reference not in context: '{}' used by attribute '{}'",
                    reference, attribute
                )
            }
            CompileError::UnboundVariable { attribute, variable } => {
                write!(
                    f,
                    "Variable not in context: '{}' used by attribute '{}'",
                    variable, attribute
                )
            }
            CompileError::InvalidAttributePattern { attribute, reason } => {
                write!(f, "Not a valid attribute pattern for '{}': {}", attribute, reason)
            }
            CompileError::InvalidConditionExpression { reason } => {
                write!(f, "Invalid condition expression: {}", reason)
            }
            CompileError::MalformedImport { namespace, spec } => {
                write!(f, "Malformed import '{}' in namespace '{}'", spec, namespace)
            }
            CompileError::InvalidName { kind, name } => {
                write!(f, "Invalid {} name: '{}'", kind, name)
            }
        }
    }
}

impl std::error::Error for CompileError {}
