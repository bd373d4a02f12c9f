// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for namespace registry mutations.
//!
//! This module contains message types for logging events related to:
//! * Namespace creation, replacement and removal
//! * Attribute and record schema interning
//! * Dataflow registration
//! * Resolver spec installation

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Namespace created or replaced.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use schemaflow::observability::messages::registry::NamespaceCreated;
///
/// let msg = NamespaceCreated {
///     namespace: "Acme.Core",
///     replaced: true,
/// };
///
/// assert_eq!(msg.to_string(), "Namespace 'Acme.Core' replaced");
/// ```
pub struct NamespaceCreated<'a> {
    pub namespace: &'a str,
    pub replaced: bool,
}

impl Display for NamespaceCreated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let verb = if self.replaced { "replaced" } else { "created" };
        write!(f, "Namespace '{}' {}", self.namespace, verb)
    }
}

impl StructuredLog for NamespaceCreated<'_> {
    fn log(&self) {
        tracing::info!(namespace = self.namespace, replaced = self.replaced, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "namespace",
            span_name = name,
            namespace = self.namespace,
            replaced = self.replaced,
        )
    }
}

/// Namespace removed.
///
/// # Log Level
/// `info!` - Important operational event
pub struct NamespaceRemoved<'a> {
    pub namespace: &'a str,
}

impl Display for NamespaceRemoved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Namespace '{}' removed", self.namespace)
    }
}

impl StructuredLog for NamespaceRemoved<'_> {
    fn log(&self) {
        tracing::info!(namespace = self.namespace, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("namespace", span_name = name, namespace = self.namespace)
    }
}

/// Attribute or record schema interned.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct SchemaInterned<'a> {
    pub path: &'a str,
    pub tag: &'a str,
}

impl Display for SchemaInterned<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Interned {} '{}'", self.tag, self.path)
    }
}

impl StructuredLog for SchemaInterned<'_> {
    fn log(&self) {
        tracing::debug!(path = self.path, tag = self.tag, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("intern", span_name = name, path = self.path, tag = self.tag)
    }
}

/// Dataflow appended to an event's list.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use schemaflow::observability::messages::registry::DataflowRegistered;
///
/// let msg = DataflowRegistered {
///     event: "Acme/Order_OnDelete_After",
///     position: 1,
///     pattern_count: 2,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct DataflowRegistered<'a> {
    pub event: &'a str,
    /// Number of dataflows on the event after this registration
    pub position: usize,
    pub pattern_count: usize,
}

impl Display for DataflowRegistered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Registered dataflow #{} on '{}' with {} patterns",
            self.position, self.event, self.pattern_count
        )
    }
}

impl StructuredLog for DataflowRegistered<'_> {
    fn log(&self) {
        tracing::info!(
            event = self.event,
            position = self.position,
            pattern_count = self.pattern_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "dataflow",
            span_name = name,
            event = self.event,
            position = self.position,
            pattern_count = self.pattern_count,
        )
    }
}

/// Resolver spec recorded in a namespace.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct ResolverSpecInstalled<'a> {
    pub namespace: &'a str,
    pub target: &'a str,
    pub resolver: &'a str,
}

impl Display for ResolverSpecInstalled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Installed resolver '{}' for '{}' in namespace '{}'",
            self.resolver, self.target, self.namespace
        )
    }
}

impl StructuredLog for ResolverSpecInstalled<'_> {
    fn log(&self) {
        tracing::debug!(
            namespace = self.namespace,
            target = self.target,
            resolver = self.resolver,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "resolver_spec",
            span_name = name,
            namespace = self.namespace,
            target = self.target,
            resolver = self.resolver,
        )
    }
}

/// A registry write was rejected and the table left unchanged.
///
/// # Log Level
/// `warn!` - Potential issue that doesn't prevent operation
pub struct InternRejected<'a> {
    pub name: &'a str,
    pub tag: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for InternRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Rejected {} '{}': {}", self.tag, self.name, self.error)
    }
}

impl StructuredLog for InternRejected<'_> {
    fn log(&self) {
        tracing::warn!(
            name = self.name,
            tag = self.tag,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "intern_rejected",
            span_name = name,
            name = self.name,
            tag = self.tag,
            error = %self.error,
        )
    }
}
