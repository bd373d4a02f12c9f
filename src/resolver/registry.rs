// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::backends::ResolverFactory;
use crate::errors::ResolverError;
use crate::model::{Instance, Path};
use crate::observability::messages::resolver::{ResolverDispatched, ResolverRegistered};
use crate::observability::messages::StructuredLog;
use crate::resolver::spec::{ResolutionMode, ResolverKey, ResolverSpec};
use crate::traits::{Resolver, ResolverRequest};
use crate::utils::SnapshotCell;

/// What a lookup finds bound to a path.
#[derive(Clone)]
pub enum ResolverEntry {
    Override(Arc<dyn Resolver>),
    /// Called in order, each seeing the previous one's output for writes
    Composed(Vec<Arc<dyn Resolver>>),
}

impl ResolverEntry {
    pub fn resolvers(&self) -> Vec<&Arc<dyn Resolver>> {
        match self {
            ResolverEntry::Override(r) => vec![r],
            ResolverEntry::Composed(rs) => rs.iter().collect(),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.resolvers().into_iter().map(|r| r.name()).collect()
    }

    fn len(&self) -> usize {
        match self {
            ResolverEntry::Override(_) => 1,
            ResolverEntry::Composed(rs) => rs.len(),
        }
    }

    /// Send `request` to the bound resolver or resolvers.
    ///
    /// Composed writes are chained: each resolver receives the first instance
    /// returned by the one before it, and the last output is returned. Composed
    /// deletes and queries return the concatenated outputs. The first failure
    /// stops the chain.
    pub async fn dispatch(&self, request: ResolverRequest) -> Result<Vec<Instance>, ResolverError> {
        let path = request.path().to_string();
        let log = |resolver: &dyn Resolver, request: &ResolverRequest| {
            ResolverDispatched {
                path: &path,
                resolver: resolver.name(),
                operation: request.operation(),
            }
            .log();
        };

        match self {
            ResolverEntry::Override(resolver) => {
                log(&**resolver, &request);
                resolver.resolve(request).await
            }
            ResolverEntry::Composed(resolvers) => {
                let mut request = request;
                let mut collected = Vec::new();
                for resolver in resolvers {
                    log(&**resolver, &request);
                    let output = resolver.resolve(request.clone()).await?;
                    if request.is_write() {
                        if let Some(next) = output.first() {
                            request = request.with_instance(next.clone());
                        }
                        collected = output;
                    } else {
                        collected.extend(output);
                    }
                }
                Ok(collected)
            }
        }
    }
}

impl fmt::Debug for ResolverEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverEntry::Override(_) => f.debug_tuple("Override").field(&self.names()).finish(),
            ResolverEntry::Composed(_) => f.debug_tuple("Composed").field(&self.names()).finish(),
        }
    }
}

/// Type path → resolver(s), built from specs through a fixed constructor table.
#[derive(Default)]
pub struct ResolverRegistry {
    factory: ResolverFactory,
    entries: SnapshotCell<BTreeMap<ResolverKey, ResolverEntry>>,
}

impl ResolverRegistry {
    pub fn new(factory: ResolverFactory) -> Self {
        Self {
            factory,
            entries: SnapshotCell::default(),
        }
    }

    pub fn factory(&self) -> &ResolverFactory {
        &self.factory
    }

    /// Build a resolver from `spec` and bind it to every path in `paths`.
    ///
    /// Compose appends to each path's list, override replaces it. One resolver
    /// instance is shared across the paths.
    pub fn register(&self, paths: &[Path], spec: &ResolverSpec) -> Result<(), ResolverError> {
        let keys = paths.iter().map(ResolverKey::for_path).collect::<Result<Vec<_>, _>>()?;
        let resolver = self.factory.create(spec)?;
        self.bind_keys(&keys, spec, resolver)
    }

    /// Bind an already built `resolver` to every path in `paths` under the
    /// mode of `spec`. Nothing is bound if any path is unqualified.
    pub fn bind(&self, paths: &[Path], spec: &ResolverSpec, resolver: Arc<dyn Resolver>) -> Result<(), ResolverError> {
        let keys = paths.iter().map(ResolverKey::for_path).collect::<Result<Vec<_>, _>>()?;
        self.bind_keys(&keys, spec, resolver)
    }

    fn bind_keys(&self, keys: &[ResolverKey], spec: &ResolverSpec, resolver: Arc<dyn Resolver>) -> Result<(), ResolverError> {
        let counts = self.entries.transact(|entries| {
            let counts: Vec<usize> = keys
                .iter()
                .map(|key| {
                    let entry = match (spec.mode, entries.remove(key)) {
                        (ResolutionMode::Override, _) => ResolverEntry::Override(resolver.clone()),
                        (ResolutionMode::Compose, None) => ResolverEntry::Composed(vec![resolver.clone()]),
                        (ResolutionMode::Compose, Some(ResolverEntry::Override(existing))) => {
                            ResolverEntry::Composed(vec![existing, resolver.clone()])
                        }
                        (ResolutionMode::Compose, Some(ResolverEntry::Composed(mut existing))) => {
                            existing.push(resolver.clone());
                            ResolverEntry::Composed(existing)
                        }
                    };
                    let count = entry.len();
                    entries.insert(key.clone(), entry);
                    count
                })
                .collect();
            Ok::<_, ResolverError>(counts)
        })?;

        for (key, resolver_count) in keys.iter().zip(counts) {
            ResolverRegistered {
                path: &key.to_string(),
                resolver: &spec.name,
                mode: spec.mode.as_str(),
                resolver_count,
            }
            .log();
        }
        Ok(())
    }

    /// The resolvers bound to `path`, falling back to its namespace-level entry.
    pub fn lookup(&self, path: &Path) -> Option<ResolverEntry> {
        let key = ResolverKey::for_path(path).ok()?;
        let entries = self.entries.snapshot();
        entries
            .get(&key)
            .or_else(|| entries.get(&ResolverKey::namespace_level(&key.namespace)))
            .cloned()
    }

    /// Drop every binding in `namespace`. Returns how many were removed.
    pub fn remove_namespace(&self, namespace: &str) -> usize {
        self.entries
            .transact(|entries| {
                let before = entries.len();
                entries.retain(|key, _| key.namespace != namespace);
                Ok::<_, ResolverError>(before - entries.len())
            })
            .unwrap_or(0)
    }

    /// Every bound key, in order.
    pub fn keys(&self) -> Vec<ResolverKey> {
        self.entries.snapshot().keys().cloned().collect()
    }
}
