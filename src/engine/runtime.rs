// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::sync::Arc;

use crate::backends::ResolverFactory;
use crate::compiler::{self, CompiledDataflow};
use crate::config::consts::NAMESPACE_LEVEL_TARGET;
use crate::dataflow::{self, Dataflow, DataflowHead, LifecycleKind, Pattern, PredicateTable};
use crate::errors::{CompileError, RuntimeError};
use crate::model::{Attributes, Check, ErrorValue, Instance, Path, Tagged, Value};
use crate::observability::messages::compiler::OpcodeCached;
use crate::observability::messages::StructuredLog;
use crate::registry::{CheckTable, NamespaceRegistry, NamespaceSpec};
use crate::resolver::{ResolverEntry, ResolverKey, ResolverRegistry, ResolverSpec};
use crate::traits::{Resolver, ResolverRequest};
use crate::utils::SnapshotCell;
use crate::validation;

/// One modeling runtime: a namespace registry, a resolver registry and the
/// named checks and guard predicates that definitions refer to.
///
/// Runtimes are independent of each other; nothing is process-global. All
/// methods take `&self` and may be called from many threads at once.
///
/// # Example
/// ```
/// use schemaflow::engine::Runtime;
/// use schemaflow::model::{Path, RecordDecl};
/// use schemaflow::registry::NamespaceSpec;
///
/// let runtime = Runtime::new();
/// runtime.create_namespace("Bank", NamespaceSpec::default()).unwrap();
/// runtime
///     .namespaces()
///     .intern_entity(&Path::new("Bank", "Account"), RecordDecl::entity().attribute("Balance", "Number"))
///     .unwrap();
/// assert!(runtime.namespaces().find_entity_schema(&Path::new("Bank", "Account")).is_some());
/// ```
pub struct Runtime {
    namespaces: NamespaceRegistry,
    resolvers: ResolverRegistry,
    checks: SnapshotCell<CheckTable>,
    predicates: SnapshotCell<PredicateTable>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let namespaces = self.namespaces.snapshot();
        let checks = self.checks();
        let resolvers: Vec<String> = self.resolvers.keys().iter().map(ToString::to_string).collect();
        f.debug_struct("Runtime")
            .field("namespaces", &namespaces.namespace_names().collect::<Vec<_>>())
            .field("resolvers", &resolvers)
            .field("checks", &checks.names().collect::<Vec<_>>())
            .field("predicates", &*self.predicates())
            .finish()
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_factory(ResolverFactory::builtin())
    }

    /// A runtime whose resolver registry builds from `factory`.
    pub fn with_factory(factory: ResolverFactory) -> Self {
        Self {
            namespaces: NamespaceRegistry::new(),
            resolvers: ResolverRegistry::new(factory),
            checks: SnapshotCell::default(),
            predicates: SnapshotCell::default(),
        }
    }

    pub fn namespaces(&self) -> &NamespaceRegistry {
        &self.namespaces
    }

    pub fn resolvers(&self) -> &ResolverRegistry {
        &self.resolvers
    }

    pub fn checks(&self) -> Arc<CheckTable> {
        self.checks.snapshot()
    }

    pub fn predicates(&self) -> Arc<PredicateTable> {
        self.predicates.snapshot()
    }

    /// Make a named check available to attribute definitions.
    pub fn register_check(&self, check: Check) {
        let _ = self.checks.transact(|table| {
            table.insert(check);
            Ok::<_, ()>(())
        });
    }

    /// Make a named guard predicate available to dataflow conditions.
    pub fn register_predicate(
        &self,
        name: impl Into<String>,
        predicate: impl Fn(&[Value]) -> bool + Send + Sync + 'static,
    ) {
        let _ = self.predicates.transact(|table| {
            table.insert(name, predicate);
            Ok::<_, ()>(())
        });
    }

    /// Create or replace a namespace. A namespace-level resolver in `spec` is
    /// bound under `*`. Replacing drops the old namespace's resolver bindings.
    ///
    /// The resolver is built before the namespace is touched, so a spec the
    /// factory rejects leaves both registries unchanged.
    pub fn create_namespace(&self, name: &str, spec: NamespaceSpec) -> Result<bool, RuntimeError> {
        let built = match &spec.resolver {
            Some(resolver) => Some(self.build_resolver(name, NAMESPACE_LEVEL_TARGET, resolver)?),
            None => None,
        };
        let resolver_spec = spec.resolver.clone();
        let replaced = self.namespaces.create_namespace(name, spec)?;
        if replaced {
            self.resolvers.remove_namespace(name);
        }
        if let (Some(resolver_spec), Some((path, resolver))) = (resolver_spec, built) {
            self.namespaces
                .install_resolver(name, NAMESPACE_LEVEL_TARGET, resolver_spec.clone())?;
            self.resolvers.bind(&[path], &resolver_spec, resolver)?;
        }
        Ok(replaced)
    }

    pub fn remove_namespace(&self, name: &str) -> bool {
        let removed = self.namespaces.remove_namespace(name);
        if removed {
            self.resolvers.remove_namespace(name);
        }
        removed
    }

    fn build_resolver(
        &self,
        namespace: &str,
        target: &str,
        spec: &ResolverSpec,
    ) -> Result<(Path, Arc<dyn Resolver>), RuntimeError> {
        let path = Path::new(namespace, target);
        ResolverKey::for_path(&path)?;
        let resolver = self.resolvers.factory().create(spec)?;
        Ok((path, resolver))
    }

    /// Record `spec` on `namespace/target` and bind the resolver it builds.
    ///
    /// The resolver is built before anything is recorded, so an unknown type
    /// or a config the backend rejects leaves both registries unchanged.
    pub fn install_resolver(&self, namespace: &str, target: &str, spec: ResolverSpec) -> Result<(), RuntimeError> {
        let (path, resolver) = self.build_resolver(namespace, target, &spec)?;
        self.namespaces.install_resolver(namespace, target, spec.clone())?;
        self.resolvers.bind(&[path], &spec, resolver)?;
        Ok(())
    }

    /// Install `spec` on every path it targets.
    pub fn register_resolver(&self, spec: &ResolverSpec) -> Result<(), RuntimeError> {
        for path in spec.target_paths()? {
            let namespace = path.namespace().unwrap_or_default();
            self.install_resolver(namespace, path.name(), spec.clone())?;
        }
        Ok(())
    }

    pub fn register_dataflow(
        &self,
        event: &Path,
        head: DataflowHead,
        patterns: Vec<Pattern>,
    ) -> Result<Arc<Dataflow>, CompileError> {
        self.namespaces
            .register_dataflow(event, head, patterns, &self.predicates())
    }

    pub fn register_entity_dataflow(
        &self,
        entity: &Path,
        head: DataflowHead,
        patterns: Vec<Pattern>,
    ) -> Result<Vec<Arc<Dataflow>>, CompileError> {
        self.namespaces
            .register_entity_dataflow(entity, head, patterns, &self.predicates())
    }

    /// The compiled form of `dataflow`, compiling and caching it on first use.
    pub fn compile_dataflow(&self, dataflow: &Dataflow) -> Result<Arc<CompiledDataflow>, CompileError> {
        if let Some(cached) = dataflow.opcode.get() {
            return Ok(cached);
        }
        let compiled = compiler::compile_dataflow(self.namespaces.snapshot(), dataflow)?;
        let (cached, stored) = dataflow.opcode.set(compiled);

        let event = dataflow.event.to_string();
        OpcodeCached {
            event: &event,
            step_count: cached.steps.len(),
            stored,
        }
        .log();
        Ok(cached)
    }

    /// Compile every registered dataflow, stopping at the first error.
    /// Returns how many dataflows were compiled.
    pub fn compile_all(&self) -> Result<usize, CompileError> {
        let table = self.namespaces.snapshot();
        let mut count = 0;
        for name in table.namespace_names() {
            let Some(namespace) = table.namespace(name) else {
                continue;
            };
            for dataflow in namespace.events.values().flatten() {
                self.compile_dataflow(dataflow)?;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Build and validate an instance of `record`.
    pub fn make_instance(&self, record: &Path, attributes: Attributes) -> Tagged {
        validation::make_instance(&self.namespaces.snapshot(), record, attributes, true)
    }

    /// The dataflows `event` triggers, in registration order.
    pub fn dataflows_for_event(&self, event: &Instance) -> Vec<Arc<Dataflow>> {
        dataflow::dataflows_for_event(&self.namespaces.snapshot(), event, &self.predicates())
    }

    /// Build the `kind` lifecycle event for `instance` and match it.
    pub fn lifecycle_dataflows(
        &self,
        instance: &Instance,
        kind: LifecycleKind,
    ) -> Result<(Instance, Vec<Arc<Dataflow>>), ErrorValue> {
        let event = dataflow::lifecycle_event(&self.namespaces.snapshot(), instance, kind).into_result()?;
        let matched = self.dataflows_for_event(&event);
        Ok((event, matched))
    }

    fn resolver_for(&self, path: &Path) -> Result<ResolverEntry, RuntimeError> {
        self.resolvers.lookup(path).ok_or_else(|| RuntimeError::NoResolver {
            path: path.to_string(),
        })
    }

    /// Validate an instance of `record` and store it through its resolver.
    pub async fn create(&self, record: &Path, attributes: Attributes) -> Result<Instance, RuntimeError> {
        let instance = self.make_instance(record, attributes).into_result()?;
        let entry = self.resolver_for(&instance.path)?;
        let stored = entry.dispatch(ResolverRequest::Create(instance.clone())).await?;
        Ok(stored.into_iter().next().unwrap_or(instance))
    }

    pub async fn delete(&self, instance: &Instance) -> Result<Vec<Instance>, RuntimeError> {
        let entry = self.resolver_for(&instance.path)?;
        Ok(entry.dispatch(ResolverRequest::Delete(instance.clone())).await?)
    }

    pub async fn query(&self, path: &Path, filter: Attributes) -> Result<Vec<Instance>, RuntimeError> {
        let entry = self.resolver_for(path)?;
        Ok(entry
            .dispatch(ResolverRequest::Query {
                path: path.clone(),
                filter,
            })
            .await?)
    }
}
