// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use tracing::{debug, info};

use crate::config::loader::{
    validate_model, AttributeConfig, DataflowConfig, DefaultConfig, ModelConfig, NamespaceConfig, PatternConfig,
    RecordAttributeConfig, RecordConfig,
};
use crate::dataflow::{DataflowHead, Pattern, RecordPattern};
use crate::engine::Runtime;
use crate::errors::{CompileError, ConfigError};
use crate::model::{AttributeDecl, AttributeKind, AttributeSchema, DefaultValue, Path, RecordDecl, RecordTag, Value};
use crate::registry::{now_generator, uuid_generator, CheckTable};

/// Builds a ready [`Runtime`] from a parsed model file.
///
/// Namespaces are created first, then every attribute and record definition
/// is interned, then dataflows and cross-namespace resolvers are registered.
/// Finally every dataflow is compiled so the model is known to be consistent
/// before the runtime is handed out.
///
/// # Examples
///
/// ```
/// use schemaflow::config::{ModelConfig, RuntimeBuilder};
/// use schemaflow::model::Path;
///
/// let yaml = r#"
/// namespaces:
///   - name: Bank
///     entities:
///       Account:
///         Balance: Number
/// "#;
/// let config: ModelConfig = serde_yaml::from_str(yaml).unwrap();
/// let runtime = RuntimeBuilder::from_config(&config).unwrap();
/// assert!(runtime.namespaces().find_entity_schema(&Path::new("Bank", "Account")).is_some());
/// ```
pub struct RuntimeBuilder;

/// A definition waiting to be interned.
enum Definition {
    Attribute(Path, AttributeSchema),
    Record(Path, RecordDecl),
}

impl Definition {
    fn path(&self) -> &Path {
        match self {
            Definition::Attribute(path, _) | Definition::Record(path, _) => path,
        }
    }

    fn intern(&self, runtime: &Runtime) -> Result<(), CompileError> {
        match self {
            Definition::Attribute(path, schema) => runtime.namespaces().intern_attribute(path, schema.clone()),
            Definition::Record(path, decl) => runtime.namespaces().intern_record(path, decl.clone()).map(|_| ()),
        }
    }
}

impl RuntimeBuilder {
    /// Build a runtime with the builtin resolver types.
    ///
    /// # Arguments
    /// * `cfg` - Parsed model file
    ///
    /// # Returns
    /// A runtime holding every namespace, schema, dataflow and resolver the
    /// model declares, with all dataflows compiled.
    pub fn from_config(cfg: &ModelConfig) -> Result<Runtime, ConfigError> {
        Self::populate(cfg, Runtime::new())
    }

    /// Load `cfg` into an existing runtime, e.g. one built with a custom
    /// resolver factory or extra checks and predicates.
    pub fn populate(cfg: &ModelConfig, runtime: Runtime) -> Result<Runtime, ConfigError> {
        validate_model(cfg, runtime.resolvers().factory())?;

        for ns in &cfg.namespaces {
            runtime.create_namespace(&ns.name, ns.spec.clone())?;
        }

        let checks = runtime.checks();
        let mut definitions = Vec::new();
        for ns in &cfg.namespaces {
            definitions.extend(namespace_definitions(ns, &checks)?);
        }
        intern_all(&runtime, definitions)?;

        let mut dataflows = 0;
        for ns in &cfg.namespaces {
            for dataflow in &ns.dataflows {
                dataflows += register_dataflow(&runtime, &ns.name, dataflow)?;
            }
        }

        for spec in &cfg.resolvers {
            runtime.register_resolver(spec)?;
        }

        let compiled = runtime.compile_all()?;
        info!(
            namespaces = cfg.namespaces.len(),
            dataflows,
            compiled,
            resolvers = runtime.resolvers().keys().len(),
            "Model loaded"
        );
        Ok(runtime)
    }
}

/// Intern `definitions`, retrying those whose referenced types are not yet
/// known until a pass makes no progress. File order therefore does not matter.
fn intern_all(runtime: &Runtime, mut pending: Vec<Definition>) -> Result<(), ConfigError> {
    while !pending.is_empty() {
        let before = pending.len();
        let mut deferred = Vec::new();
        let mut first_missing = None;

        for definition in pending {
            match definition.intern(runtime) {
                Ok(()) => {}
                Err(err @ CompileError::SchemaNotFound { .. }) => {
                    debug!(path = %definition.path(), error = %err, "Deferring definition");
                    first_missing.get_or_insert(err);
                    deferred.push(definition);
                }
                Err(err) => return Err(err.into()),
            }
        }

        if deferred.len() == before {
            if let Some(err) = first_missing {
                return Err(err.into());
            }
        }
        pending = deferred;
    }
    Ok(())
}

fn namespace_definitions(ns: &NamespaceConfig, checks: &CheckTable) -> Result<Vec<Definition>, ConfigError> {
    let mut definitions = Vec::new();
    for (name, attribute) in ns.attributes.iter() {
        let path = Path::new(&ns.name, name);
        let schema = attribute_schema(&path, attribute, checks)?;
        definitions.push(Definition::Attribute(path, schema));
    }

    let tags = [RecordTag::Record, RecordTag::Entity, RecordTag::Event];
    for ((_, section), tag) in ns.record_sections().into_iter().zip(tags) {
        for (name, record) in section.iter() {
            let path = Path::new(&ns.name, name);
            let decl = record_decl(&path, tag, record, checks)?;
            definitions.push(Definition::Record(path, decl));
        }
    }
    Ok(definitions)
}

fn record_decl(path: &Path, tag: RecordTag, record: &RecordConfig, checks: &CheckTable) -> Result<RecordDecl, ConfigError> {
    let mut decl = RecordDecl::new(tag);
    for (name, attribute) in record.iter() {
        let attribute = match attribute {
            RecordAttributeConfig::Type(type_name) => AttributeDecl::Type(Path::parse(type_name)),
            RecordAttributeConfig::Inline(inline) => {
                AttributeDecl::Inline(attribute_schema(&path.with_suffix(&format!(".{}", name)), inline, checks)?)
            }
        };
        decl = decl.attribute(name, attribute);
    }
    Ok(decl)
}

fn attribute_schema(path: &Path, cfg: &AttributeConfig, checks: &CheckTable) -> Result<AttributeSchema, ConfigError> {
    let kind = if let Some(type_name) = &cfg.type_name {
        AttributeKind::Type(Path::parse(type_name))
    } else if let Some(check) = &cfg.check {
        let check = checks
            .get(check)
            .cloned()
            .ok_or_else(|| ConfigError::Validation(format!("attribute '{}' uses unknown check '{}'", path, check)))?;
        AttributeKind::Check(check)
    } else if let Some(element) = &cfg.listof {
        AttributeKind::ListOf(Path::parse(element))
    } else if let Some(element) = &cfg.setof {
        AttributeKind::SetOf(Path::parse(element))
    } else if let Some(expr) = &cfg.expr {
        AttributeKind::Expr(expr.clone())
    } else if let Some(query) = &cfg.query {
        AttributeKind::Query(query.clone())
    } else {
        return Err(ConfigError::Validation(format!("attribute '{}' declares no type", path)));
    };

    let mut schema = AttributeSchema::new(kind);
    schema.format = cfg.format.clone();
    schema.optional = cfg.optional;
    schema.unique = cfg.unique;
    schema.immutable = cfg.immutable;
    schema.indexed = cfg.indexed;
    schema.writer = cfg.writer.clone();
    schema.default = cfg.default.as_ref().map(|d| default_value(path, d)).transpose()?;
    Ok(schema)
}

fn default_value(path: &Path, cfg: &DefaultConfig) -> Result<DefaultValue, ConfigError> {
    match cfg {
        DefaultConfig::Literal(value) => Ok(DefaultValue::Literal(Value::from(value.clone()))),
        DefaultConfig::Generator { generator } => match generator.as_str() {
            "uuid" => Ok(uuid_generator()),
            "now" => Ok(now_generator()),
            other => Err(ConfigError::Validation(format!(
                "attribute '{}' uses unknown default generator '{}'",
                path, other
            ))),
        },
    }
}

fn patterns(cfg: &DataflowConfig) -> Vec<Pattern> {
    cfg.patterns
        .iter()
        .map(|pattern| match pattern {
            PatternConfig::Bind { bind, from } => Pattern::Bind {
                alias: bind.clone(),
                source: from.clone(),
            },
            PatternConfig::Record {
                record,
                alias,
                attributes,
            } => Pattern::Record(RecordPattern {
                record: Path::parse(record),
                alias: alias.clone(),
                attributes: attributes.0.clone(),
            }),
        })
        .collect()
}

/// Register one dataflow declaration; returns how many dataflows it produced.
fn register_dataflow(runtime: &Runtime, namespace: &str, cfg: &DataflowConfig) -> Result<usize, ConfigError> {
    let head = DataflowHead {
        guard: cfg.guard.clone(),
        on_entity_event: None,
        doc: cfg.doc.clone(),
    };

    match (&cfg.event, &cfg.entity) {
        (Some(event), None) => {
            let event = Path::parse(event).qualify(namespace);
            runtime.register_dataflow(&event, head, patterns(cfg))?;
            Ok(1)
        }
        (None, Some(entity)) => {
            let entity = Path::parse(entity).qualify(namespace);
            Ok(runtime.register_entity_dataflow(&entity, head, patterns(cfg))?.len())
        }
        _ => Err(ConfigError::Validation(format!(
            "dataflow in '{}' must name exactly one of 'event' or 'entity'",
            namespace
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(yaml: &str) -> Result<Runtime, ConfigError> {
        let config: ModelConfig = serde_yaml::from_str(yaml).unwrap();
        RuntimeBuilder::from_config(&config)
    }

    #[test]
    fn test_forward_references_resolve_across_passes() {
        let runtime = build(
            r#"
namespaces:
  - name: Shop
    imports: [Catalog]
    records:
      Line:
        Product: Catalog/Product
        Qty: Quantity
    attributes:
      Quantity: { check: int }
  - name: Catalog
    entities:
      Product:
        Sku: { type: String, unique: true, immutable: true }
"#,
        )
        .unwrap();

        let line = runtime.namespaces().find_record_schema(&Path::new("Shop", "Line")).unwrap();
        assert_eq!(line.attribute_type("Product"), Some(&Path::new("Catalog", "Product")));
        assert_eq!(line.attribute_type("Qty"), Some(&Path::new("Shop", "Quantity")));
    }

    #[test]
    fn test_unresolvable_type_is_reported() {
        let err = build("namespaces:\n  - name: Shop\n    records: { Line: { Qty: Missing } }\n").unwrap_err();
        assert!(matches!(err, ConfigError::Compile(CompileError::SchemaNotFound { .. })), "{:?}", err);
    }

    #[test]
    fn test_attribute_modifiers_and_defaults() {
        let runtime = build(
            r#"
namespaces:
  - name: Crm
    attributes:
      Code: { check: string, format: "^[A-Z]{3}$", indexed: true, writer: upper }
      Opened: { type: DateTime, default: { generator: now } }
      Status: { type: String, default: open, optional: true }
"#,
        )
        .unwrap();

        let code = runtime.namespaces().find_attribute_schema(&Path::new("Crm", "Code")).unwrap();
        assert_eq!(code.format.as_deref(), Some("^[A-Z]{3}$"));
        assert!(code.indexed);
        assert_eq!(code.writer.as_deref(), Some("upper"));

        let status = runtime.namespaces().find_attribute_schema(&Path::new("Crm", "Status")).unwrap();
        assert!(status.optional);
        assert_eq!(status.default.as_ref().map(DefaultValue::produce), Some(Value::Text("open".into())));

        let opened = runtime.namespaces().find_attribute_schema(&Path::new("Crm", "Opened")).unwrap();
        assert!(matches!(opened.default, Some(DefaultValue::Generator { ref name, .. }) if name == "now"));
    }

    #[test]
    fn test_build_errors_table_driven() {
        struct TestCase {
            name: &'static str,
            yaml: &'static str,
        }

        let cases = vec![
            TestCase {
                name: "unknown check",
                yaml: "namespaces:\n  - name: A\n    attributes: { N: { check: roman } }\n",
            },
            TestCase {
                name: "unknown generator",
                yaml: "namespaces:\n  - name: A\n    attributes: { N: { type: UUID, default: { generator: snowflake } } }\n",
            },
            TestCase {
                name: "reserved namespace",
                yaml: "namespaces:\n  - name: Kernel\n",
            },
            TestCase {
                name: "entity dataflow on missing entity",
                yaml: "namespaces:\n  - name: A\n    dataflows: [ { entity: Ghost } ]\n",
            },
            TestCase {
                name: "dataflow on non-event",
                yaml: "namespaces:\n  - name: A\n    records: { R: { N: Int } }\n    dataflows: [ { event: R } ]\n",
            },
            TestCase {
                name: "pattern with unknown attribute",
                yaml: "namespaces:\n  - name: A\n    entities: { E: { N: Int } }\n    dataflows:\n      - event: Ping\n        patterns: [ { record: E, attributes: { M: { int: 1 } } } ]\n",
            },
        ];

        for case in cases {
            assert!(build(case.yaml).is_err(), "{}", case.name);
        }
    }
}
