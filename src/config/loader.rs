// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::marker::PhantomData;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::backends::ResolverFactory;
use crate::compiler::Expr;
use crate::dataflow::Condition;
use crate::errors::{ConfigError, ResolverError};
use crate::registry::NamespaceSpec;
use crate::resolver::ResolverSpec;

/// Top-level structure of a model file.
///
/// A model file declares namespaces with their attribute types, records,
/// entities, events and dataflows, plus resolvers that span namespaces.
///
/// # Fields
/// * `namespaces` - Namespaces in declaration order
/// * `resolvers` - Resolver specs registered after every namespace exists
///
/// # Example
/// ```yaml
/// namespaces:
///   - name: Bank
///     resolver: { name: core, type: memory }
///     entities:
///       Account:
///         Email: { type: Email, unique: true, immutable: true }
///         Balance: Number
///         Fee: Number
///     events:
///       Deposit:
///         Account: Account
///         Amount: Number
///     dataflows:
///       - event: Deposit
///         patterns:
///           - record: Account
///             attributes:
///               Fee: { call: { op: "*", args: [ { ref: Balance }, { float: 0.01 } ] } }
///               Balance: { call: { op: "+", args: [ { ref: Deposit.Account.Balance }, { ref: Deposit.Amount } ] } }
/// resolvers:
///   - name: audit
///     type: stub
///     mode: compose
///     paths: [Bank/Account]
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    #[serde(default)]
    pub namespaces: Vec<NamespaceConfig>,
    #[serde(default)]
    pub resolvers: Vec<ResolverSpec>,
}

/// One namespace of a model file.
///
/// `imports`, `resolver` and `interop` are the namespace spec itself; the
/// remaining keys hold definitions interned into the namespace. Attribute and
/// record maps keep their file order.
#[derive(Debug, Deserialize)]
pub struct NamespaceConfig {
    pub name: String,
    #[serde(flatten)]
    pub spec: NamespaceSpec,
    #[serde(default)]
    pub attributes: Ordered<AttributeConfig>,
    #[serde(default)]
    pub records: Ordered<RecordConfig>,
    #[serde(default)]
    pub entities: Ordered<RecordConfig>,
    #[serde(default)]
    pub events: Ordered<RecordConfig>,
    #[serde(default)]
    pub dataflows: Vec<DataflowConfig>,
}

impl NamespaceConfig {
    /// Every record-like declaration, tagged with the section it came from.
    pub fn record_sections(&self) -> [(&'static str, &Ordered<RecordConfig>); 3] {
        [
            ("record", &self.records),
            ("entity", &self.entities),
            ("event", &self.events),
        ]
    }
}

/// A YAML mapping read as a list of entries, preserving file order.
#[derive(Debug, Clone, PartialEq)]
pub struct Ordered<T>(pub Vec<(String, T)>);

impl<T> Default for Ordered<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Ordered<T> {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Ordered<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedVisitor<T> {
            type Value = Ordered<T>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, T>()? {
                    entries.push((key, value));
                }
                Ok(Ordered(entries))
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
                Ok(Ordered::default())
            }
        }

        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }
}

/// A named or inline attribute schema.
///
/// Exactly one of `type`, `check`, `listof`, `setof`, `expr` or `query`
/// selects the kind; the remaining keys are modifiers.
///
/// # Example
/// ```yaml
/// Code: { check: string, format: "^[A-Z]{3}$" }
/// Tags: { setof: String, optional: true }
/// Opened: { type: DateTime, default: { generator: now } }
/// Status: { type: String, default: open }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeConfig {
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub check: Option<String>,
    pub listof: Option<String>,
    pub setof: Option<String>,
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub expr: Option<Expr>,
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub query: Option<Expr>,
    pub format: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub immutable: bool,
    #[serde(default)]
    pub indexed: bool,
    pub default: Option<DefaultConfig>,
    pub writer: Option<String>,
}

impl AttributeConfig {
    /// Names of the kind-selecting keys that are set.
    pub fn kinds(&self) -> Vec<&'static str> {
        [
            ("type", self.type_name.is_some()),
            ("check", self.check.is_some()),
            ("listof", self.listof.is_some()),
            ("setof", self.setof.is_some()),
            ("expr", self.expr.is_some()),
            ("query", self.query.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

/// A default value: a literal, or a named generator (`uuid`, `now`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DefaultConfig {
    Generator { generator: String },
    Literal(serde_yaml::Value),
}

/// How a record declares one attribute: a type name or an inline schema.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RecordAttributeConfig {
    Type(String),
    Inline(AttributeConfig),
}

pub type RecordConfig = Ordered<RecordAttributeConfig>;

/// A dataflow declaration. Exactly one of `event` or `entity` is set; an
/// entity dataflow is registered on all four lifecycle events.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataflowConfig {
    pub event: Option<String>,
    pub entity: Option<String>,
    #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
    pub guard: Option<Condition>,
    pub doc: Option<String>,
    #[serde(default)]
    pub patterns: Vec<PatternConfig>,
}

/// One step of a dataflow body.
///
/// ```yaml
/// - bind: Acct
///   from: { ref: Deposit.Account }
/// - record: Account
///   alias: A
///   attributes:
///     Balance: { ref: Acct.Balance }
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PatternConfig {
    Bind {
        bind: String,
        #[serde(with = "serde_yaml::with::singleton_map_recursive")]
        from: Expr,
    },
    Record {
        record: String,
        #[serde(default)]
        alias: Option<String>,
        #[serde(default, with = "serde_yaml::with::singleton_map_recursive")]
        attributes: Ordered<Expr>,
    },
}

/// Loads a model file from disk.
///
/// This function only parses; structural checks are done by
/// [`load_and_validate_config`].
///
/// # Arguments
/// * `path` - Path to the YAML model file
///
/// # Returns
/// * `Ok(ModelConfig)` - Parsed model
/// * `Err(ConfigError)` - Read or parse failure
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ModelConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ModelConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

/// Loads a model file and validates it against the builtin resolver types.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<ModelConfig, ConfigError> {
    let config = load_config(path)?;
    validate_model(&config, &ResolverFactory::builtin())?;
    Ok(config)
}

/// Structural checks that need no registry:
/// - namespace names are unique
/// - type names are unique within a namespace
/// - each attribute declares exactly one kind
/// - each dataflow names exactly one of `event` or `entity`
/// - every resolver type is known to `factory`
/// - every resolver target names a declared namespace
pub fn validate_model(config: &ModelConfig, factory: &ResolverFactory) -> Result<(), ConfigError> {
    let mut namespaces = BTreeSet::new();
    for ns in &config.namespaces {
        if !namespaces.insert(ns.name.as_str()) {
            return Err(ConfigError::Duplicate {
                kind: "namespace".into(),
                name: ns.name.clone(),
            });
        }
        validate_namespace(ns)?;
        if let Some(spec) = &ns.spec.resolver {
            check_resolver_type(spec, factory)?;
        }
    }

    for spec in &config.resolvers {
        check_resolver_type(spec, factory)?;
        for path in spec.target_paths()? {
            let ns = path.namespace().unwrap_or_default();
            if !namespaces.contains(ns) {
                return Err(ConfigError::Validation(format!(
                    "resolver '{}' targets undeclared namespace '{}'",
                    spec.name, ns
                )));
            }
        }
    }
    Ok(())
}

fn validate_namespace(ns: &NamespaceConfig) -> Result<(), ConfigError> {
    let mut types = BTreeSet::new();
    let mut claim = |kind: &str, name: &str| {
        if types.insert(name.to_string()) {
            Ok(())
        } else {
            Err(ConfigError::Duplicate {
                kind: kind.to_string(),
                name: format!("{}/{}", ns.name, name),
            })
        }
    };

    for (name, attribute) in ns.attributes.iter() {
        claim("attribute", name)?;
        check_attribute_kind(&ns.name, name, attribute)?;
    }
    for (kind, section) in ns.record_sections() {
        for (name, record) in section.iter() {
            claim(kind, name)?;
            for (attribute, decl) in record.iter() {
                if let RecordAttributeConfig::Inline(inline) = decl {
                    check_attribute_kind(&ns.name, &format!("{}.{}", name, attribute), inline)?;
                }
            }
        }
    }

    for (index, dataflow) in ns.dataflows.iter().enumerate() {
        if dataflow.event.is_some() == dataflow.entity.is_some() {
            return Err(ConfigError::Validation(format!(
                "dataflow #{} in '{}' must name exactly one of 'event' or 'entity'",
                index, ns.name
            )));
        }
    }
    Ok(())
}

fn check_attribute_kind(namespace: &str, name: &str, attribute: &AttributeConfig) -> Result<(), ConfigError> {
    let kinds = attribute.kinds();
    if kinds.len() == 1 {
        return Ok(());
    }
    Err(ConfigError::Validation(format!(
        "attribute '{}/{}' must declare exactly one of type, check, listof, setof, expr, query (found {:?})",
        namespace, name, kinds
    )))
}

fn check_resolver_type(spec: &ResolverSpec, factory: &ResolverFactory) -> Result<(), ConfigError> {
    if factory.is_available(&spec.resolver_type) {
        return Ok(());
    }
    Err(ResolverError::InvalidResolverType {
        spec: spec.name.clone(),
        resolver_type: spec.resolver_type.clone(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
namespaces:
  - name: Bank
    imports: ["Shared as S"]
    attributes:
      Code: { check: string, format: "^[A-Z]{3}$" }
    entities:
      Account:
        Zeta: Number
        Alpha: { type: String, optional: true }
        Middle: Code
    dataflows:
      - entity: Account
        doc: audit
        patterns:
          - bind: Acct
            from: { ref: Account }
          - record: Account
            attributes:
              Zeta: { int: 1 }
              Alpha: { text: a }
"#;

    #[test]
    fn test_parse_keeps_declaration_order() {
        let config: ModelConfig = serde_yaml::from_str(MINIMAL).unwrap();
        let bank = &config.namespaces[0];
        assert_eq!(bank.spec.imports, vec!["Shared as S"]);

        let (name, account) = &bank.entities.0[0];
        assert_eq!(name, "Account");
        let names: Vec<&str> = account.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Zeta", "Alpha", "Middle"]);
        assert!(matches!(account.0[1].1, RecordAttributeConfig::Inline(ref a) if a.optional));
        assert!(matches!(account.0[2].1, RecordAttributeConfig::Type(ref t) if t == "Code"));

        let dataflow = &bank.dataflows[0];
        assert_eq!(dataflow.entity.as_deref(), Some("Account"));
        assert!(matches!(dataflow.patterns[0], PatternConfig::Bind { ref bind, .. } if bind == "Acct"));
        match &dataflow.patterns[1] {
            PatternConfig::Record { record, attributes, .. } => {
                assert_eq!(record, "Account");
                let order: Vec<&str> = attributes.iter().map(|(n, _)| n).collect();
                assert_eq!(order, vec!["Zeta", "Alpha"]);
            }
            other => panic!("expected record pattern, got {:?}", other),
        }
    }

    #[test]
    fn test_expressions_and_guards_parse_from_plain_maps() {
        let yaml = r#"
namespaces:
  - name: Bank
    attributes:
      Total: { expr: { call: { op: "+", args: [ { ref: Balance }, { int: 1 } ] } } }
    dataflows:
      - event: Deposit
        guard:
          and:
            - compare: { op: ">", left: { ref: Amount }, right: { int: 0 } }
            - predicate: { name: open, args: [ { ref: Account } ] }
        patterns:
          - bind: Acct
            from: { ref: Deposit.Account }
          - record: Account
            attributes:
              Fee: { call: { op: "*", args: [ { ref: Acct.Balance }, { float: 0.01 } ] } }
              Note: nil
"#;
        let config: ModelConfig = serde_yaml::from_str(yaml).unwrap();
        let bank = &config.namespaces[0];

        let (_, total) = &bank.attributes.0[0];
        assert!(matches!(total.expr, Some(Expr::Call { ref op, ref args }) if op == "+" && args.len() == 2));

        let dataflow = &bank.dataflows[0];
        assert!(matches!(dataflow.guard, Some(Condition::And(ref parts)) if parts.len() == 2));
        assert!(matches!(
            dataflow.patterns[0],
            PatternConfig::Bind { ref from, .. } if *from == Expr::Ref("Deposit.Account".into())
        ));
        match &dataflow.patterns[1] {
            PatternConfig::Record { attributes, .. } => {
                assert!(matches!(attributes.0[0].1, Expr::Call { ref op, .. } if op == "*"));
                assert_eq!(attributes.0[1].1, Expr::Nil);
            }
            other => panic!("expected record pattern, got {:?}", other),
        }
    }

    #[test]
    fn test_default_config_variants() {
        let generator: DefaultConfig = serde_yaml::from_str("{ generator: uuid }").unwrap();
        assert!(matches!(generator, DefaultConfig::Generator { ref generator } if generator == "uuid"));
        let literal: DefaultConfig = serde_yaml::from_str("open").unwrap();
        assert!(matches!(literal, DefaultConfig::Literal(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = load_and_validate_config(file.path()).unwrap();
        assert_eq!(config.namespaces.len(), 1);
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config("/nonexistent/model.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result: Result<ModelConfig, _> = serde_yaml::from_str("namespaces: []\nstrategy: level\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_model_table_driven() {
        struct TestCase {
            name: &'static str,
            yaml: &'static str,
            valid: bool,
        }

        let cases = vec![
            TestCase {
                name: "minimal model",
                yaml: MINIMAL,
                valid: true,
            },
            TestCase {
                name: "duplicate namespace",
                yaml: "namespaces:\n  - name: A\n  - name: A\n",
                valid: false,
            },
            TestCase {
                name: "duplicate type across sections",
                yaml: "namespaces:\n  - name: A\n    records: { X: { N: Int } }\n    events: { X: { N: Int } }\n",
                valid: false,
            },
            TestCase {
                name: "attribute with two kinds",
                yaml: "namespaces:\n  - name: A\n    attributes: { N: { type: Int, check: int } }\n",
                valid: false,
            },
            TestCase {
                name: "attribute with no kind",
                yaml: "namespaces:\n  - name: A\n    attributes: { N: { optional: true } }\n",
                valid: false,
            },
            TestCase {
                name: "dataflow with event and entity",
                yaml: "namespaces:\n  - name: A\n    dataflows: [ { event: E, entity: X } ]\n",
                valid: false,
            },
            TestCase {
                name: "unknown namespace resolver type",
                yaml: "namespaces:\n  - name: A\n    resolver: { name: r, type: postgres }\n",
                valid: false,
            },
            TestCase {
                name: "resolver targets undeclared namespace",
                yaml: "namespaces:\n  - name: A\nresolvers:\n  - { name: r, type: memory, paths: [B/X] }\n",
                valid: false,
            },
            TestCase {
                name: "resolver targets declared namespace",
                yaml: "namespaces:\n  - name: A\nresolvers:\n  - { name: r, type: memory, paths: [\"A/*\"] }\n",
                valid: true,
            },
        ];

        let factory = ResolverFactory::builtin();
        for case in cases {
            let config: ModelConfig = serde_yaml::from_str(case.yaml).unwrap();
            let result = validate_model(&config, &factory);
            assert_eq!(result.is_ok(), case.valid, "{}: {:?}", case.name, result);
        }
    }
}
