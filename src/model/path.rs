// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Type paths of the form `Namespace.Segments/Name`.

use std::fmt;

use crate::config::consts::NAMESPACE_SEPARATOR;

/// A reference to a named definition, optionally qualified by its namespace.
///
/// `Acme.Core/Account` is fully qualified; `Account` is resolved later against
/// the current namespace of a [`CompilationContext`](crate::compiler::CompilationContext).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    namespace: Option<String>,
    name: String,
}

impl Path {
    /// Build a fully qualified path.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    /// Build a path that still needs resolving against a namespace.
    pub fn unqualified(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    /// Parse `Ns/Name` or `Name`. Only the first separator splits.
    pub fn parse(s: &str) -> Self {
        match s.split_once(NAMESPACE_SEPARATOR) {
            Some((ns, name)) if !ns.is_empty() => Self::new(ns, name),
            Some((_, name)) => Self::unqualified(name),
            None => Self::unqualified(s),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_qualified(&self) -> bool {
        self.namespace.is_some()
    }

    /// Return this path qualified with `namespace` unless it already carries one.
    pub fn qualify(&self, namespace: &str) -> Self {
        match &self.namespace {
            Some(_) => self.clone(),
            None => Self::new(namespace, self.name.clone()),
        }
    }

    /// Same path with a different namespace segment.
    pub fn with_namespace(&self, namespace: impl Into<String>) -> Self {
        Self::new(namespace, self.name.clone())
    }

    /// Derive a sibling path by appending a suffix to the name, e.g. lifecycle events.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self {
            namespace: self.namespace.clone(),
            name: format!("{}{}", self.name, suffix),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}{}{}", ns, NAMESPACE_SEPARATOR, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}
