// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::model::Value;

/// A value expression on the right-hand side of a pattern assignment.
///
/// In model files each variant is a single-key map, read through
/// `serde_yaml::with::singleton_map_recursive`:
///
/// ```yaml
/// Fee: { call: { op: "*", args: [ { ref: Balance }, { float: 0.01 } ] } }
/// Owner: { var: C }
/// Status: { text: open }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
    Nil,
    /// `Attribute`, `Head.Attribute` or `Ns/Record.Attribute`
    Ref(String),
    /// A locally bound variable, optionally dotted into its attributes
    Var(String),
    Call { op: String, args: Vec<Expr> },
    List(Vec<Expr>),
}

fn reference_regex() -> &'static Regex {
    static REFERENCE: OnceLock<Regex> = OnceLock::new();
    REFERENCE.get_or_init(|| {
        Regex::new(r"^([A-Za-z_]\w*(\.[A-Za-z_]\w*)*/)?[A-Za-z_]\w*(\.[A-Za-z_]\w*)*$").expect("static pattern")
    })
}

/// Whether `s` has the shape of an attribute or type reference.
pub fn is_reference(s: &str) -> bool {
    reference_regex().is_match(s)
}

impl Expr {
    pub fn reference(s: impl Into<String>) -> Self {
        Expr::Ref(s.into())
    }

    pub fn var(s: impl Into<String>) -> Self {
        Expr::Var(s.into())
    }

    pub fn call(op: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call { op: op.into(), args }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Int(_) | Expr::Float(_) | Expr::Text(_) | Expr::Bool(_))
    }

    /// Every `Ref` and `Var` leaf in evaluation order.
    pub fn leaves(&self) -> Vec<&Expr> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Expr>) {
        match self {
            Expr::Ref(_) | Expr::Var(_) => out.push(self),
            Expr::Call { args, .. } | Expr::List(args) => {
                for arg in args {
                    arg.collect_leaves(out);
                }
            }
            _ => {}
        }
    }

    /// The literal value, for literal expressions.
    pub fn literal(&self) -> Option<Value> {
        match self {
            Expr::Int(i) => Some(Value::Int(*i)),
            Expr::Float(f) => Some(Value::Float(*f)),
            Expr::Text(s) => Some(Value::text(s.clone())),
            Expr::Bool(b) => Some(Value::Bool(*b)),
            _ => None,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Int(i) => write!(f, "{}", i),
            Expr::Float(x) => write!(f, "{:?}", x),
            Expr::Text(s) => write!(f, "{:?}", s),
            Expr::Bool(b) => write!(f, "{}", b),
            Expr::Nil => f.write_str("nil"),
            Expr::Ref(r) => f.write_str(r),
            Expr::Var(v) => write!(f, "${}", v),
            Expr::Call { op, args } => {
                write!(f, "({}", op)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                f.write_str(")")
            }
            Expr::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_from_yaml() {
        let yaml = r#"
call:
  op: "*"
  args:
    - ref: Balance
    - float: 0.01
"#;
        let expr: Expr =
            serde_yaml::with::singleton_map_recursive::deserialize(serde_yaml::Deserializer::from_str(yaml)).unwrap();
        assert_eq!(
            expr,
            Expr::call("*", vec![Expr::reference("Balance"), Expr::Float(0.01)])
        );
        assert_eq!(expr.to_string(), "(* Balance 0.01)");
        assert_eq!(expr.leaves(), vec![&Expr::reference("Balance")]);
    }

    #[test]
    fn test_reference_shapes() {
        for ok in ["Balance", "Order.Total", "Acme.Core/Account", "Acme/Account.Balance", "_x1"] {
            assert!(is_reference(ok), "{} should be a reference", ok);
        }
        for bad in ["", "1abc", "a..b", "a/", "/a", "a b", "a/b/c"] {
            assert!(!is_reference(bad), "{} should not be a reference", bad);
        }
    }
}
