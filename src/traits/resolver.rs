// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use async_trait::async_trait;

use crate::errors::ResolverError;
use crate::model::{Attributes, Instance, Path};

/// One CRUD or query operation sent to a resolver.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolverRequest {
    Create(Instance),
    Update(Instance),
    Delete(Instance),
    /// Instances of `path` whose attributes equal every entry of `filter`
    Query { path: Path, filter: Attributes },
}

impl ResolverRequest {
    pub fn operation(&self) -> &'static str {
        match self {
            ResolverRequest::Create(_) => "create",
            ResolverRequest::Update(_) => "update",
            ResolverRequest::Delete(_) => "delete",
            ResolverRequest::Query { .. } => "query",
        }
    }

    /// The type the request is about.
    pub fn path(&self) -> &Path {
        match self {
            ResolverRequest::Create(inst) | ResolverRequest::Update(inst) | ResolverRequest::Delete(inst) => {
                &inst.path
            }
            ResolverRequest::Query { path, .. } => path,
        }
    }

    /// Whether a composed chain hands each resolver the previous one's output.
    pub fn is_write(&self) -> bool {
        matches!(self, ResolverRequest::Create(_) | ResolverRequest::Update(_))
    }

    /// The same operation applied to `instance`. Queries and deletes are unchanged.
    pub fn with_instance(&self, instance: Instance) -> Self {
        match self {
            ResolverRequest::Create(_) => ResolverRequest::Create(instance),
            ResolverRequest::Update(_) => ResolverRequest::Update(instance),
            other => other.clone(),
        }
    }
}

impl fmt::Display for ResolverRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.operation(), self.path())
    }
}

/// A pluggable handler that performs CRUD and queries for a type path.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Name of the spec this resolver was built from.
    fn name(&self) -> &str;

    /// Serve one request. Writes return the stored instance, deletes the removed
    /// instances and queries the matches.
    async fn resolve(&self, request: ResolverRequest) -> Result<Vec<Instance>, ResolverError>;
}
