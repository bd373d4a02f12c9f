// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::backends::memory::InMemoryResolver;
use crate::backends::stub::StubResolver;
use crate::errors::ResolverError;
use crate::observability::messages::resolver::ResolverTypeRejected;
use crate::observability::messages::StructuredLog;
use crate::resolver::ResolverSpec;
use crate::traits::Resolver;

/// Builds a resolver from its spec.
pub type ResolverConstructor = Arc<dyn Fn(&ResolverSpec) -> Result<Arc<dyn Resolver>, ResolverError> + Send + Sync>;

/// Constructor table keyed by resolver type tag.
///
/// The table is fixed once the owning registry is built:
/// - "stub" -> StubResolver
/// - "memory" -> InMemoryResolver (`config.key` selects the key attribute)
/// - anything added with [`with_constructor`](Self::with_constructor)
#[derive(Clone)]
pub struct ResolverFactory {
    constructors: BTreeMap<String, ResolverConstructor>,
}

impl ResolverFactory {
    pub fn builtin() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
        .with_constructor("stub", |spec| Ok(Arc::new(StubResolver::new(spec.name.clone()))))
        .with_constructor("memory", |spec| {
            let resolver = match spec.config.get("key") {
                None => InMemoryResolver::new(spec.name.clone()),
                Some(key) => {
                    let key = key.as_str().ok_or_else(|| ResolverError::InvalidConfig {
                        spec: spec.name.clone(),
                        reason: "'key' must be an attribute name".into(),
                    })?;
                    InMemoryResolver::with_key(spec.name.clone(), key)
                }
            };
            Ok(Arc::new(resolver))
        })
    }

    pub fn with_constructor(
        mut self,
        resolver_type: impl Into<String>,
        constructor: impl Fn(&ResolverSpec) -> Result<Arc<dyn Resolver>, ResolverError> + Send + Sync + 'static,
    ) -> Self {
        self.constructors.insert(resolver_type.into(), Arc::new(constructor));
        self
    }

    /// Build a resolver for `spec` from its type tag.
    pub fn create(&self, spec: &ResolverSpec) -> Result<Arc<dyn Resolver>, ResolverError> {
        match self.constructors.get(&spec.resolver_type) {
            Some(constructor) => constructor(spec),
            None => {
                ResolverTypeRejected {
                    spec: &spec.name,
                    resolver_type: &spec.resolver_type,
                    known_types: &self.known_types(),
                }
                .log();
                Err(ResolverError::InvalidResolverType {
                    spec: spec.name.clone(),
                    resolver_type: spec.resolver_type.clone(),
                })
            }
        }
    }

    pub fn known_types(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    pub fn is_available(&self, resolver_type: &str) -> bool {
        self.constructors.contains_key(resolver_type)
    }
}

impl Default for ResolverFactory {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for ResolverFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverFactory")
            .field("types", &self.known_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::FailingResolver;

    #[test]
    fn test_create_table_driven() {
        struct TestCase {
            spec: ResolverSpec,
            expected_name: Option<&'static str>,
        }

        let factory = ResolverFactory::builtin()
            .with_constructor("failing", |spec| Ok(Arc::new(FailingResolver::new(spec.name.clone()))));

        let cases = vec![
            TestCase {
                spec: ResolverSpec::new("echo", "stub"),
                expected_name: Some("echo"),
            },
            TestCase {
                spec: ResolverSpec::new("accounts", "memory").with_config("key", "Email"),
                expected_name: Some("accounts"),
            },
            TestCase {
                spec: ResolverSpec::new("broken", "failing"),
                expected_name: Some("broken"),
            },
            TestCase {
                spec: ResolverSpec::new("bad_key", "memory").with_config("key", 7),
                expected_name: None,
            },
            TestCase {
                spec: ResolverSpec::new("sfdc", "salesforce"),
                expected_name: None,
            },
        ];

        for case in cases {
            let built = factory.create(&case.spec);
            assert_eq!(
                built.as_ref().ok().map(|r| r.name()),
                case.expected_name,
                "spec {}",
                case.spec.name
            );
        }
        assert_eq!(factory.known_types(), vec!["failing", "memory", "stub"]);
    }

    #[test]
    fn test_unknown_type_names_the_spec() {
        let err = ResolverFactory::builtin()
            .create(&ResolverSpec::new("sfdc", "salesforce"))
            .err()
            .unwrap();
        assert_eq!(
            err,
            ResolverError::InvalidResolverType {
                spec: "sfdc".into(),
                resolver_type: "salesforce".into(),
            }
        );
    }
}
