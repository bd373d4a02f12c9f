// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::ResolverError;
use crate::model::Instance;
use crate::traits::{Resolver, ResolverRequest};

/// A resolver that echoes writes back and finds nothing
pub struct StubResolver {
    pub name: String,
}

impl StubResolver {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait::async_trait]
impl Resolver for StubResolver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, request: ResolverRequest) -> Result<Vec<Instance>, ResolverError> {
        match request {
            ResolverRequest::Create(inst) | ResolverRequest::Update(inst) | ResolverRequest::Delete(inst) => {
                Ok(vec![inst])
            }
            ResolverRequest::Query { .. } => Ok(Vec::new()),
        }
    }
}

/// A resolver that always fails, for exercising error paths
pub struct FailingResolver {
    pub name: String,
}

impl FailingResolver {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait::async_trait]
impl Resolver for FailingResolver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, request: ResolverRequest) -> Result<Vec<Instance>, ResolverError> {
        Err(ResolverError::Backend {
            resolver: self.name.clone(),
            reason: format!("simulated failure on {}", request),
        })
    }
}
