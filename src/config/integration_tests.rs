// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

#[cfg(test)]
mod integration_tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use crate::compiler::CompiledPattern;
    use crate::config::{load_and_validate_config, load_config, RuntimeBuilder};
    use crate::dataflow::LifecycleKind;
    use crate::engine::Runtime;
    use crate::errors::{CompileError, ConfigError};
    use crate::model::{Attributes, Instance, Path, RecordTag, Value};

    fn bank() -> Runtime {
        let config = load_and_validate_config("configs/bank.yaml").unwrap();
        RuntimeBuilder::from_config(&config).unwrap()
    }

    fn account_attributes(balance: i64) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert("Email".into(), Value::text("ada@example.com"));
        attrs.insert("Balance".into(), Value::Int(balance));
        attrs
    }

    /// The bundled bank model parses and validates
    #[test]
    fn test_bank_yaml_loading() {
        let config = load_and_validate_config("configs/bank.yaml").unwrap();

        assert_eq!(config.namespaces.len(), 1);
        let bank = &config.namespaces[0];
        assert_eq!(bank.name, "Bank");
        assert_eq!(bank.entities.len(), 1);
        assert_eq!(bank.events.len(), 1);
        assert_eq!(bank.dataflows.len(), 2);
        assert_eq!(config.resolvers.len(), 1);
        assert!(bank.spec.resolver.is_some());
    }

    /// Every dataflow is compiled at build time with dependency-ordered patterns
    #[test]
    fn test_bank_dataflows_compiled_in_dependency_order() {
        let runtime = bank();
        let table = runtime.namespaces().snapshot();

        let deposit = table.dataflows_for_event(&Path::new("Bank", "Deposit"));
        assert_eq!(deposit.len(), 1);
        let compiled = deposit[0].opcode.get().expect("compiled at build time");
        let orders: Vec<Vec<&str>> = compiled.patterns().map(CompiledPattern::order).collect();
        assert_eq!(orders, vec![vec!["Balance", "Fee"]]);

        for kind in LifecycleKind::ALL {
            let event = kind.event_for(&Path::new("Bank", "Account"));
            let flows = table.dataflows_for_event(&event);
            assert_eq!(flows.len(), 1, "{}", event);
            assert!(flows[0].opcode.get().is_some(), "{}", event);
        }
    }

    /// Resolvers from the namespace spec and the top-level list are both bound
    #[test]
    fn test_bank_resolvers_bound() {
        let runtime = bank();
        let account = runtime.resolvers().lookup(&Path::new("Bank", "Account")).unwrap();
        assert_eq!(account.names(), vec!["core"]);
        let audit = runtime.resolvers().lookup(&Path::new("Bank", "AuditEntry")).unwrap();
        assert_eq!(audit.names(), vec!["audit-log"]);
    }

    /// Instances created through the runtime land in the memory resolver and
    /// trigger the guarded lifecycle dataflow
    #[tokio::test]
    async fn test_bank_create_query_and_lifecycle() {
        let runtime = bank();
        let account = Path::new("Bank", "Account");

        let created = runtime.create(&account, account_attributes(120)).await.unwrap();
        assert!(created.get("Id").and_then(Value::as_text).is_some());

        let stored = runtime.query(&account, Attributes::new()).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].get("Balance"), Some(&Value::Int(120)));

        let (event, matched) = runtime
            .lifecycle_dataflows(&created, LifecycleKind::OnUpsertAfter)
            .unwrap();
        assert_eq!(event.path, Path::new("Bank", "Account_OnUpsert_After"));
        assert_eq!(matched.len(), 1);

        let empty = runtime.create(&account, {
            let mut attrs = account_attributes(0);
            attrs.insert("Email".into(), Value::text("bob@example.com"));
            attrs
        })
        .await
        .unwrap();
        let (_, matched) = runtime.lifecycle_dataflows(&empty, LifecycleKind::OnUpsertAfter).unwrap();
        assert!(matched.is_empty());
    }

    /// The deposit guard filters on the event's own attributes
    #[test]
    fn test_bank_deposit_guard() {
        let runtime = bank();
        let deposit = |amount: i64| {
            let mut attrs = Attributes::new();
            attrs.insert("Amount".into(), Value::Int(amount));
            Instance::new(RecordTag::Event, Path::new("Bank", "Deposit"), attrs)
        };
        assert_eq!(runtime.dataflows_for_event(&deposit(50)).len(), 1);
        assert!(runtime.dataflows_for_event(&deposit(0)).is_empty());
    }

    /// Invalid instances are rejected before reaching a resolver
    #[tokio::test]
    async fn test_bank_create_rejects_bad_email() {
        let runtime = bank();
        let mut attrs = account_attributes(10);
        attrs.insert("Email".into(), Value::text("not-an-email"));
        let result = runtime.create(&Path::new("Bank", "Account"), attrs).await;
        assert!(result.is_err());
        let stored = runtime
            .query(&Path::new("Bank", "Account"), Attributes::new())
            .await
            .unwrap();
        assert!(stored.is_empty());
    }

    /// A model file written at test time, with composed resolvers
    #[test]
    fn test_model_from_temp_file_with_composed_resolvers() {
        let yaml = r#"
namespaces:
  - name: Acme.Shared
    attributes:
      Code: { check: string, format: "^[A-Z]{3}$" }
  - name: Acme.Core
    imports: ["Acme.Shared as S"]
    resolver: { name: primary, type: memory }
    entities:
      Product:
        Code: S/Code
resolvers:
  - { name: mirror, type: memory, mode: compose, paths: ["Acme.Core/*"] }
  - { name: echo, type: stub, mode: compose, paths: ["Acme.Core/*"] }
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = load_and_validate_config(file.path()).unwrap();
        let runtime = RuntimeBuilder::from_config(&config).unwrap();

        let product = runtime
            .namespaces()
            .find_entity_schema(&Path::new("Acme.Core", "Product"))
            .unwrap();
        assert_eq!(product.attribute_type("Code"), Some(&Path::new("Acme.Shared", "Code")));

        let entry = runtime.resolvers().lookup(&Path::new("Acme.Core", "Product")).unwrap();
        assert_eq!(entry.names(), vec!["primary", "mirror", "echo"]);
    }

    /// A cyclic pattern fails the whole build
    #[test]
    fn test_model_with_cyclic_pattern_fails() {
        let yaml = r#"
namespaces:
  - name: Bank
    entities:
      Account:
        Balance: Number
        Fee: Number
    dataflows:
      - event: Recalculate
        patterns:
          - record: Account
            attributes:
              Fee: { ref: Balance }
              Balance: { ref: Fee }
"#;
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        let err = RuntimeBuilder::from_config(&config).unwrap_err();
        assert!(
            matches!(err, ConfigError::Compile(CompileError::CyclicAttributeDependency { .. })),
            "{:?}",
            err
        );
    }

    /// Malformed YAML surfaces as a parse error
    #[test]
    fn test_malformed_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"namespaces: [ { name: Bank, entities: ").unwrap();
        assert!(matches!(load_config(file.path()), Err(ConfigError::Yaml(_))));
    }
}
