// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::config::consts::LIFECYCLE_INSTANCE_ATTRIBUTE;
use crate::dataflow::{Dataflow, PredicateTable};
use crate::model::{Instance, Value};
use crate::registry::NamespaceTable;

/// Whether `dataflow`'s guard accepts `event`.
///
/// Lifecycle dataflows evaluate their guard against the entity carried in the
/// event's `Instance` attribute. No guard always matches.
pub fn matches_event(dataflow: &Dataflow, event: &Instance, predicates: &PredicateTable) -> bool {
    let Some(guard) = &dataflow.head.guard else {
        return true;
    };
    let subject = if dataflow.is_lifecycle() {
        event
            .get(LIFECYCLE_INSTANCE_ATTRIBUTE)
            .and_then(Value::as_instance)
            .unwrap_or(event)
    } else {
        event
    };
    guard.evaluate(subject, predicates)
}

/// The dataflows registered on `event`'s type whose guards accept it, in
/// registration order.
pub fn dataflows_for_event(table: &NamespaceTable, event: &Instance, predicates: &PredicateTable) -> Vec<Arc<Dataflow>> {
    table
        .dataflows_for_event(&event.path)
        .iter()
        .filter(|dataflow| matches_event(dataflow, event, predicates))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Expr;
    use crate::dataflow::{lifecycle_event, CompareOp, Condition, DataflowHead, LifecycleKind, Operand, RecordPattern};
    use crate::model::{Attributes, Path, RecordDecl, RecordTag};
    use crate::registry::{NamespaceRegistry, NamespaceSpec};

    fn total_over(limit: i64) -> Condition {
        Condition::Compare {
            op: CompareOp::Gt,
            left: Operand::Ref("Total".into()),
            right: Operand::Int(limit),
        }
    }

    fn registry() -> NamespaceRegistry {
        let registry = NamespaceRegistry::new();
        registry.create_namespace("Shop", NamespaceSpec::default()).unwrap();
        registry
            .intern_entity(&Path::new("Shop", "Order"), RecordDecl::entity().attribute("Total", "Number"))
            .unwrap();
        registry
            .intern_event(&Path::new("Shop", "Refund"), RecordDecl::event().attribute("Total", "Number"))
            .unwrap();
        registry
    }

    fn refund(total: i64) -> Instance {
        let mut attrs = Attributes::new();
        attrs.insert("Total".into(), Value::Int(total));
        Instance::new(RecordTag::Event, Path::new("Shop", "Refund"), attrs)
    }

    #[test]
    fn test_guards_filter_in_registration_order() {
        let registry = registry();
        let predicates = PredicateTable::builtin();
        let event = Path::new("Shop", "Refund");
        let heads = vec![
            DataflowHead::default().with_doc("always"),
            DataflowHead::default().with_guard(total_over(100)).with_doc("large"),
            DataflowHead::default().with_guard(total_over(0)).with_doc("positive"),
        ];
        for head in heads {
            registry.register_dataflow(&event, head, vec![], &predicates).unwrap();
        }

        let table = registry.snapshot();
        let docs = |total: i64| -> Vec<String> {
            dataflows_for_event(&table, &refund(total), &predicates)
                .iter()
                .filter_map(|d| d.head.doc.clone())
                .collect()
        };
        assert_eq!(docs(500), vec!["always", "large", "positive"]);
        assert_eq!(docs(50), vec!["always", "positive"]);
        assert_eq!(docs(0), vec!["always"]);
    }

    #[test]
    fn test_unregistered_event_matches_nothing() {
        let registry = registry();
        let mut ping = refund(1);
        ping.path = Path::new("Shop", "Ping");
        assert!(dataflows_for_event(&registry.snapshot(), &ping, &PredicateTable::builtin()).is_empty());
    }

    #[test]
    fn test_delete_triggers_on_delete_after_with_instance() {
        let registry = registry();
        let predicates = PredicateTable::builtin();
        let order = Path::new("Shop", "Order");
        registry
            .register_entity_dataflow(
                &order,
                DataflowHead::default().with_guard(total_over(10)),
                vec![RecordPattern::new("Order").assign("Total", Expr::reference("Order.Total")).into()],
                &predicates,
            )
            .unwrap();

        let table = registry.snapshot();
        let mut attrs = Attributes::new();
        attrs.insert("Total".into(), Value::Int(25));
        let deleted = Instance::new(RecordTag::Entity, order.clone(), attrs);

        let event = lifecycle_event(&table, &deleted, LifecycleKind::OnDeleteAfter)
            .into_result()
            .unwrap();
        let matched = dataflows_for_event(&table, &event, &predicates);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].event, Path::new("Shop", "Order_OnDelete_After"));
        assert_eq!(
            event.get("Instance").and_then(Value::as_instance).and_then(|i| i.get("Total")),
            Some(&Value::Int(25))
        );

        let mut small = deleted.clone();
        small.attributes.insert("Total".into(), Value::Int(3));
        let event = lifecycle_event(&table, &small, LifecycleKind::OnDeleteAfter)
            .into_result()
            .unwrap();
        assert!(dataflows_for_event(&table, &event, &predicates).is_empty());
    }
}
