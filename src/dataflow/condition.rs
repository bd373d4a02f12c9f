// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Guard conditions on dataflow heads.
//!
//! A condition is evaluated against one instance: the triggering event, or the
//! `Instance` payload of a lifecycle event. Attribute references inside a
//! condition are resolved against that instance before comparison.
//!
//! ```yaml
//! guard:
//!   and:
//!     - compare: { op: ">", left: { ref: Amount }, right: { int: 0 } }
//!     - predicate: { name: exists, args: [ { ref: Account.Email } ] }
//! ```

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use crate::compiler::is_reference;
use crate::config::consts::REFERENCE_SEPARATOR;
use crate::errors::CompileError;
use crate::model::{Instance, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">=")]
    Ge,
}

impl CompareOp {
    fn holds(self, ordering: Option<Ordering>) -> bool {
        match (self, ordering) {
            (CompareOp::Eq, Some(Ordering::Equal)) => true,
            (CompareOp::Lt, Some(Ordering::Less)) => true,
            (CompareOp::Gt, Some(Ordering::Greater)) => true,
            (CompareOp::Le, Some(Ordering::Less | Ordering::Equal)) => true,
            (CompareOp::Ge, Some(Ordering::Greater | Ordering::Equal)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Eq => "=",
            CompareOp::Lt => "<",
            CompareOp::Gt => ">",
            CompareOp::Le => "<=",
            CompareOp::Ge => ">=",
        };
        f.write_str(s)
    }
}

/// One side of a comparison or a predicate argument.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    /// Plain attribute name or dotted path into nested instances
    Ref(String),
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Nil,
    /// A nested condition, evaluated to a boolean
    Condition(Box<Condition>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    Compare {
        op: CompareOp,
        left: Operand,
        right: Operand,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Predicate {
        name: String,
        #[serde(default)]
        args: Vec<Operand>,
    },
}

/// A named guard predicate over resolved argument values.
pub type PredicateFn = Arc<dyn Fn(&[Value]) -> bool + Send + Sync>;

/// Guard predicates available to conditions, by name.
#[derive(Clone)]
pub struct PredicateTable(BTreeMap<String, PredicateFn>);

impl PredicateTable {
    /// Built-in predicates: `exists`, `not`, `contains`.
    pub fn builtin() -> Self {
        let mut table = Self(BTreeMap::new());
        table.insert("exists", |args: &[Value]| args.iter().all(|v| !v.is_null()));
        table.insert("not", |args: &[Value]| matches!(args, [Value::Bool(false)]));
        table.insert("contains", |args: &[Value]| match args {
            [Value::Text(haystack), Value::Text(needle)] => haystack.contains(needle.as_str()),
            [Value::List(items) | Value::Set(items), needle] => items.contains(needle),
            _ => false,
        });
        table
    }

    pub fn insert(&mut self, name: impl Into<String>, predicate: impl Fn(&[Value]) -> bool + Send + Sync + 'static) {
        self.0.insert(name.into(), Arc::new(predicate));
    }

    pub fn get(&self, name: &str) -> Option<&PredicateFn> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }
}

impl Default for PredicateTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for PredicateTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.0.keys()).finish()
    }
}

fn invalid(reason: impl Into<String>) -> CompileError {
    CompileError::InvalidConditionExpression { reason: reason.into() }
}

impl Operand {
    fn validate(&self, predicates: &PredicateTable) -> Result<(), CompileError> {
        match self {
            Operand::Ref(r) if !is_reference(r) => Err(invalid(format!("'{}' is not an attribute reference", r))),
            Operand::Condition(c) => c.validate(predicates),
            _ => Ok(()),
        }
    }

    fn resolve(&self, instance: &Instance, predicates: &PredicateTable) -> Value {
        match self {
            Operand::Ref(r) => resolve_reference(instance, r).cloned().unwrap_or(Value::Null),
            Operand::Int(i) => Value::Int(*i),
            Operand::Float(x) => Value::Float(*x),
            Operand::Text(s) => Value::text(s.clone()),
            Operand::Bool(b) => Value::Bool(*b),
            Operand::Nil => Value::Null,
            Operand::Condition(c) => Value::Bool(c.evaluate(instance, predicates)),
        }
    }
}

/// Resolve `Name`, `Nested.Name` or `Type.Name` against an instance. A leading
/// segment naming the instance's own type is skipped.
fn resolve_reference<'a>(instance: &'a Instance, reference: &str) -> Option<&'a Value> {
    let mut segments: Vec<&str> = reference.split(REFERENCE_SEPARATOR).collect();
    if segments.len() > 1 && segments[0] == instance.path.name() {
        segments.remove(0);
    }
    let (head, rest) = segments.split_first()?;
    instance.get(head)?.lookup(rest)
}

impl Condition {
    /// Reject conditions that can never be evaluated meaningfully.
    pub fn validate(&self, predicates: &PredicateTable) -> Result<(), CompileError> {
        match self {
            Condition::Compare { left, right, .. } => {
                left.validate(predicates)?;
                right.validate(predicates)
            }
            Condition::And(items) | Condition::Or(items) if items.is_empty() => {
                Err(invalid("'and'/'or' needs at least one operand"))
            }
            Condition::And(items) | Condition::Or(items) => items.iter().try_for_each(|c| c.validate(predicates)),
            Condition::Predicate { name, .. } if !predicates.contains(name) => {
                Err(invalid(format!("unknown predicate '{}'", name)))
            }
            Condition::Predicate { args, .. } => args.iter().try_for_each(|a| a.validate(predicates)),
        }
    }

    pub fn evaluate(&self, instance: &Instance, predicates: &PredicateTable) -> bool {
        match self {
            Condition::Compare { op, left, right } => {
                let left = left.resolve(instance, predicates);
                let right = right.resolve(instance, predicates);
                op.holds(left.compare(&right))
            }
            Condition::And(items) => items.iter().all(|c| c.evaluate(instance, predicates)),
            Condition::Or(items) => items.iter().any(|c| c.evaluate(instance, predicates)),
            Condition::Predicate { name, args } => {
                let Some(predicate) = predicates.get(name) else {
                    return false;
                };
                let values: Vec<Value> = args.iter().map(|a| a.resolve(instance, predicates)).collect();
                predicate(&values)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Attributes, Path, RecordTag};

    fn deposit(amount: i64, note: &str) -> Instance {
        let mut account = Attributes::new();
        account.insert("Email".into(), Value::text("a@b.c"));
        let mut attrs = Attributes::new();
        attrs.insert("Amount".into(), Value::Int(amount));
        attrs.insert("Note".into(), Value::text(note));
        attrs.insert(
            "Account".into(),
            Value::Instance(Box::new(Instance::new(
                RecordTag::Entity,
                Path::new("Acme", "Account"),
                account,
            ))),
        );
        Instance::new(RecordTag::Event, Path::new("Acme", "Deposit"), attrs)
    }

    fn compare(op: CompareOp, left: Operand, right: Operand) -> Condition {
        Condition::Compare { op, left, right }
    }

    #[test]
    fn test_evaluate_table_driven() {
        struct TestCase {
            name: &'static str,
            condition: Condition,
            expected: bool,
        }

        let amount = || Operand::Ref("Amount".into());
        let cases = vec![
            TestCase {
                name: "greater than",
                condition: compare(CompareOp::Gt, amount(), Operand::Int(0)),
                expected: true,
            },
            TestCase {
                name: "int against float",
                condition: compare(CompareOp::Le, amount(), Operand::Float(50.0)),
                expected: true,
            },
            TestCase {
                name: "type-prefixed reference",
                condition: compare(CompareOp::Eq, Operand::Ref("Deposit.Amount".into()), Operand::Int(50)),
                expected: true,
            },
            TestCase {
                name: "dotted path into nested instance",
                condition: compare(CompareOp::Eq, Operand::Ref("Account.Email".into()), Operand::Text("a@b.c".into())),
                expected: true,
            },
            TestCase {
                name: "missing attribute is nil",
                condition: compare(CompareOp::Eq, Operand::Ref("Missing".into()), Operand::Nil),
                expected: true,
            },
            TestCase {
                name: "unrelated kinds never compare",
                condition: compare(CompareOp::Lt, amount(), Operand::Text("x".into())),
                expected: false,
            },
            TestCase {
                name: "and short of one",
                condition: Condition::And(vec![
                    compare(CompareOp::Gt, amount(), Operand::Int(0)),
                    compare(CompareOp::Gt, amount(), Operand::Int(100)),
                ]),
                expected: false,
            },
            TestCase {
                name: "or",
                condition: Condition::Or(vec![
                    compare(CompareOp::Gt, amount(), Operand::Int(100)),
                    Condition::Predicate {
                        name: "contains".into(),
                        args: vec![Operand::Ref("Note".into()), Operand::Text("rent".into())],
                    },
                ]),
                expected: true,
            },
            TestCase {
                name: "nested sub-expression",
                condition: compare(
                    CompareOp::Eq,
                    Operand::Condition(Box::new(compare(CompareOp::Lt, amount(), Operand::Int(10)))),
                    Operand::Bool(false),
                ),
                expected: true,
            },
        ];

        let predicates = PredicateTable::builtin();
        let event = deposit(50, "march rent");
        for case in cases {
            assert!(case.condition.validate(&predicates).is_ok(), "{} should validate", case.name);
            assert_eq!(case.condition.evaluate(&event, &predicates), case.expected, "{}", case.name);
        }
    }

    #[test]
    fn test_structurally_invalid_conditions() {
        let predicates = PredicateTable::builtin();
        let cases = vec![
            Condition::And(vec![]),
            Condition::Or(vec![]),
            Condition::Predicate {
                name: "is_vip".into(),
                args: vec![],
            },
            compare(CompareOp::Eq, Operand::Ref("not a ref".into()), Operand::Nil),
        ];
        for condition in cases {
            assert!(
                matches!(condition.validate(&predicates), Err(CompileError::InvalidConditionExpression { .. })),
                "{:?} should be rejected",
                condition
            );
        }
    }

    #[test]
    fn test_host_predicate_and_yaml_form() {
        let mut predicates = PredicateTable::builtin();
        predicates.insert("large", |args: &[Value]| args.first().and_then(Value::as_f64).is_some_and(|v| v > 1000.0));

        let yaml = r#"
and:
  - compare: { op: ">=", left: { ref: Amount }, right: { int: 1 } }
  - predicate: { name: large, args: [ { ref: Amount } ] }
"#;
        let condition: Condition =
            serde_yaml::with::singleton_map_recursive::deserialize(serde_yaml::Deserializer::from_str(yaml)).unwrap();
        condition.validate(&predicates).unwrap();
        assert!(condition.evaluate(&deposit(5000, ""), &predicates));
        assert!(!condition.evaluate(&deposit(5, ""), &predicates));
    }
}
