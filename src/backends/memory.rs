// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! In-process resolver keeping instances in memory.
//!
//! Instances are stored per type and keyed by one attribute, `Id` unless the
//! spec's `config.key` names another. Reads and writes take a `parking_lot`
//! lock around the store; nothing is persisted.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::config::consts::IDENTITY_ATTRIBUTE;
use crate::errors::ResolverError;
use crate::model::{Instance, Path, Value};
use crate::traits::{Resolver, ResolverRequest};

pub struct InMemoryResolver {
    name: String,
    key: String,
    store: RwLock<BTreeMap<Path, Vec<Instance>>>,
}

impl InMemoryResolver {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_key(name, IDENTITY_ATTRIBUTE)
    }

    pub fn with_key(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            store: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.store.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn key_of<'a>(&self, inst: &'a Instance) -> Result<&'a Value, ResolverError> {
        inst.get(&self.key).ok_or_else(|| ResolverError::Backend {
            resolver: self.name.clone(),
            reason: format!("{} instance has no '{}' attribute", inst.path, self.key),
        })
    }

    fn position(&self, stored: &[Instance], key: &Value) -> Option<usize> {
        stored.iter().position(|i| i.get(&self.key) == Some(key))
    }
}

#[async_trait::async_trait]
impl Resolver for InMemoryResolver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, request: ResolverRequest) -> Result<Vec<Instance>, ResolverError> {
        let backend = |reason: String| ResolverError::Backend {
            resolver: self.name.clone(),
            reason,
        };

        match request {
            ResolverRequest::Create(inst) => {
                let key = self.key_of(&inst)?.clone();
                let mut store = self.store.write();
                let stored = store.entry(inst.path.clone()).or_default();
                if self.position(stored, &key).is_some() {
                    return Err(backend(format!("{} {} already exists", inst.path, key)));
                }
                stored.push(inst.clone());
                Ok(vec![inst])
            }
            ResolverRequest::Update(inst) => {
                let key = self.key_of(&inst)?.clone();
                let mut store = self.store.write();
                let stored = store.entry(inst.path.clone()).or_default();
                match self.position(stored, &key) {
                    Some(i) => {
                        stored[i] = inst.clone();
                        Ok(vec![inst])
                    }
                    None => Err(backend(format!("{} {} not found", inst.path, key))),
                }
            }
            ResolverRequest::Delete(inst) => {
                let key = self.key_of(&inst)?.clone();
                let mut store = self.store.write();
                let removed = store
                    .get_mut(&inst.path)
                    .and_then(|stored| self.position(stored, &key).map(|i| stored.remove(i)));
                Ok(removed.into_iter().collect())
            }
            ResolverRequest::Query { path, filter } => {
                let store = self.store.read();
                Ok(store
                    .get(&path)
                    .into_iter()
                    .flatten()
                    .filter(|inst| filter.iter().all(|(k, v)| inst.get(k) == Some(v)))
                    .cloned()
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attributes, RecordTag};

    fn account(email: &str, balance: i64) -> Instance {
        let mut attrs = Attributes::new();
        attrs.insert("Email".into(), Value::text(email));
        attrs.insert("Balance".into(), Value::Int(balance));
        Instance::new(RecordTag::Entity, Path::new("Bank", "Account"), attrs)
    }

    #[tokio::test]
    async fn test_crud_round() {
        let resolver = InMemoryResolver::with_key("accounts", "Email");
        resolver.resolve(ResolverRequest::Create(account("a@x.io", 1))).await.unwrap();
        resolver.resolve(ResolverRequest::Create(account("b@x.io", 2))).await.unwrap();
        assert_eq!(resolver.len(), 2);

        let dup = resolver.resolve(ResolverRequest::Create(account("a@x.io", 9))).await;
        assert!(matches!(dup, Err(ResolverError::Backend { .. })));

        resolver.resolve(ResolverRequest::Update(account("a@x.io", 5))).await.unwrap();
        let mut filter = Attributes::new();
        filter.insert("Balance".into(), Value::Int(5));
        let found = resolver
            .resolve(ResolverRequest::Query {
                path: Path::new("Bank", "Account"),
                filter,
            })
            .await
            .unwrap();
        assert_eq!(found, vec![account("a@x.io", 5)]);

        let removed = resolver.resolve(ResolverRequest::Delete(account("a@x.io", 0))).await.unwrap();
        assert_eq!(removed, vec![account("a@x.io", 5)]);
        assert_eq!(resolver.len(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_and_keyless_instances_fail() {
        let resolver = InMemoryResolver::new("accounts");
        let missing_key = resolver.resolve(ResolverRequest::Create(account("a@x.io", 1))).await;
        assert!(matches!(missing_key, Err(ResolverError::Backend { ref reason, .. }) if reason.contains("'Id'")));

        let keyed = InMemoryResolver::with_key("accounts", "Email");
        let missing = keyed.resolve(ResolverRequest::Update(account("z@x.io", 1))).await;
        assert!(missing.is_err());
        assert!(keyed.is_empty());
    }
}
