// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for resolver registration and dispatch.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// Resolver constructed and bound to a path.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use schemaflow::observability::messages::resolver::ResolverRegistered;
///
/// let msg = ResolverRegistered {
///     path: "Acme.Core/Account",
///     resolver: "accounts",
///     mode: "compose",
///     resolver_count: 2,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ResolverRegistered<'a> {
    pub path: &'a str,
    pub resolver: &'a str,
    pub mode: &'a str,
    pub resolver_count: usize,
}

impl Display for ResolverRegistered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Registered resolver '{}' for '{}' ({} mode, {} resolvers bound)",
            self.resolver, self.path, self.mode, self.resolver_count
        )
    }
}

impl StructuredLog for ResolverRegistered<'_> {
    fn log(&self) {
        tracing::info!(
            path = self.path,
            resolver = self.resolver,
            mode = self.mode,
            resolver_count = self.resolver_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "resolver",
            span_name = name,
            path = self.path,
            resolver = self.resolver,
            mode = self.mode,
        )
    }
}

/// Resolver spec names a type with no constructor.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ResolverTypeRejected<'a> {
    pub spec: &'a str,
    pub resolver_type: &'a str,
    pub known_types: &'a [&'a str],
}

impl Display for ResolverTypeRejected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Resolver '{}' has unknown type '{}' (known: {})",
            self.spec,
            self.resolver_type,
            self.known_types.join(", ")
        )
    }
}

impl StructuredLog for ResolverTypeRejected<'_> {
    fn log(&self) {
        tracing::error!(
            spec = self.spec,
            resolver_type = self.resolver_type,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "span_name",
            name = name,
            spec = self.spec,
            resolver_type = self.resolver_type,
        )
    }
}

/// Request handed to a resolver.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct ResolverDispatched<'a> {
    pub path: &'a str,
    pub resolver: &'a str,
    pub operation: &'a str,
}

impl Display for ResolverDispatched<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Dispatching {} on '{}' to resolver '{}'",
            self.operation, self.path, self.resolver
        )
    }
}

impl StructuredLog for ResolverDispatched<'_> {
    fn log(&self) {
        tracing::debug!(
            path = self.path,
            resolver = self.resolver,
            operation = self.operation,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "dispatch",
            span_name = name,
            path = self.path,
            resolver = self.resolver,
            operation = self.operation,
        )
    }
}
