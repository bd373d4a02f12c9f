// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use crate::config::consts::NAMESPACE_LEVEL_TARGET;
use crate::errors::ResolverError;
use crate::model::Path;

/// How a new resolver combines with the ones already bound to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMode {
    /// Replace whatever is bound
    #[default]
    Override,
    /// Append to the ordered list of bound resolvers
    Compose,
}

impl ResolutionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolutionMode::Override => "override",
            ResolutionMode::Compose => "compose",
        }
    }
}

impl fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declarative description of a resolver.
///
/// # Example
/// ```yaml
/// name: accounts
/// type: memory
/// mode: compose
/// paths: [Acme.Core/Account]
/// config: { key: Email }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResolverSpec {
    pub name: String,
    /// Selects the constructor in the resolver factory
    #[serde(rename = "type")]
    pub resolver_type: String,
    #[serde(default)]
    pub mode: ResolutionMode,
    /// `Ns/Type` targets, or `Ns/*` for the whole namespace
    #[serde(default)]
    pub paths: Vec<String>,
    /// Backend configuration, passed through to the constructor
    #[serde(default)]
    pub config: BTreeMap<String, serde_yaml::Value>,
}

impl ResolverSpec {
    pub fn new(name: impl Into<String>, resolver_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resolver_type: resolver_type.into(),
            mode: ResolutionMode::Override,
            paths: Vec::new(),
            config: BTreeMap::new(),
        }
    }

    pub fn compose(mut self) -> Self {
        self.mode = ResolutionMode::Compose;
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<serde_yaml::Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// A string configuration entry.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(serde_yaml::Value::as_str)
    }

    /// The spec's targets as parsed paths.
    pub fn target_paths(&self) -> Result<Vec<Path>, ResolverError> {
        self.paths
            .iter()
            .map(|p| {
                let path = Path::parse(p);
                ResolverKey::for_path(&path).map_err(|_| ResolverError::InvalidConfig {
                    spec: self.name.clone(),
                    reason: format!("target '{}' must be qualified as Namespace/Type", p),
                })?;
                Ok(path)
            })
            .collect()
    }
}

/// Where a resolver is bound: a type in a namespace, or the namespace itself.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResolverKey {
    pub namespace: String,
    pub target: String,
}

impl ResolverKey {
    pub fn for_path(path: &Path) -> Result<Self, ResolverError> {
        let namespace = path.namespace().ok_or_else(|| ResolverError::InvalidConfig {
            spec: path.to_string(),
            reason: "resolver targets must be namespace-qualified".into(),
        })?;
        Ok(Self {
            namespace: namespace.to_string(),
            target: path.name().to_string(),
        })
    }

    pub fn namespace_level(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            target: NAMESPACE_LEVEL_TARGET.to_string(),
        }
    }

    pub fn is_namespace_level(&self) -> bool {
        self.target == NAMESPACE_LEVEL_TARGET
    }
}

impl fmt::Display for ResolverKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_from_yaml() {
        let yaml = r#"
name: accounts
type: memory
mode: compose
paths: ["Acme/Account", "Acme/*"]
config: { key: Email }
"#;
        let spec: ResolverSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.resolver_type, "memory");
        assert_eq!(spec.mode, ResolutionMode::Compose);
        assert_eq!(spec.config_str("key"), Some("Email"));

        let keys: Vec<ResolverKey> = spec
            .target_paths()
            .unwrap()
            .iter()
            .map(|p| ResolverKey::for_path(p).unwrap())
            .collect();
        assert!(!keys[0].is_namespace_level());
        assert_eq!(keys[1], ResolverKey::namespace_level("Acme"));
    }

    #[test]
    fn test_mode_defaults_to_override_and_targets_must_be_qualified() {
        let spec: ResolverSpec = serde_yaml::from_str("{ name: a, type: stub, paths: [Account] }").unwrap();
        assert_eq!(spec.mode, ResolutionMode::Override);
        assert!(matches!(
            spec.target_paths(),
            Err(ResolverError::InvalidConfig { ref spec, .. }) if spec == "a"
        ));
    }
}
