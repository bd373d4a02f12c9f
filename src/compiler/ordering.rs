// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Topological ordering of pattern attributes.
//!
//! ## Algorithm
//! Kahn's algorithm over the dependency graph:
//! 1. Every attribute starts with an in-degree equal to the number of attributes
//!    it reads.
//! 2. Attributes with in-degree 0 are ready.
//! 3. The next attribute emitted is the ready one with the most edges
//!    (incoming + outgoing), then the earliest declared.
//! 4. Emitting an attribute decrements every dependent's in-degree.
//!
//! The tie-break depends only on graph shape and declaration order, so the same
//! pattern always compiles to the same order.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use crate::compiler::dependency_graph::DependencyGraph;
use crate::errors::CompileError;

/// Order the graph's attributes so each follows everything it reads.
pub fn topological_order(graph: &DependencyGraph) -> Result<Vec<String>, CompileError> {
    let position: BTreeMap<&str, usize> = graph
        .nodes()
        .iter()
        .enumerate()
        .map(|(i, n)| (n.as_str(), i))
        .collect();

    let mut in_degree: BTreeMap<&str, usize> = graph
        .nodes()
        .iter()
        .map(|n| (n.as_str(), graph.dependencies(n).count()))
        .collect();

    let priority = |name: &str| (Reverse(graph.edge_count(name)), position[name]);

    let mut ready: BTreeSet<((Reverse<usize>, usize), &str)> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| (priority(*name), *name))
        .collect();

    let mut order = Vec::with_capacity(graph.nodes().len());
    while let Some(next) = ready.pop_first() {
        let (_, name) = next;
        order.push(name.to_string());

        for dependent in graph.dependents(name) {
            if let Some(degree) = in_degree.get_mut(dependent.as_str()) {
                *degree -= 1;
                if *degree == 0 {
                    ready.insert((priority(dependent.as_str()), dependent.as_str()));
                }
            }
        }
    }

    if order.len() < graph.nodes().len() {
        // Unreachable when edges were checked on insertion; report the first
        // remaining cycle rather than dropping attributes.
        let cycle = graph
            .nodes()
            .iter()
            .filter(|n| !order.contains(n))
            .find_map(|n| graph.find_cycle_through(n))
            .unwrap_or_default();
        return Err(CompileError::CyclicAttributeDependency {
            attribute: cycle.first().cloned().unwrap_or_default(),
            cycle,
        });
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, Vec<&str>)]) -> DependencyGraph {
        let mut g = DependencyGraph::new();
        for (attr, deps) in edges {
            g.add_dependencies(attr, deps.iter().copied());
        }
        g
    }

    #[test]
    fn test_dependencies_come_first() {
        let g = graph(&[("Fee", vec!["Balance"]), ("Balance", vec![])]);
        assert_eq!(topological_order(&g).unwrap(), vec!["Balance", "Fee"]);
    }

    #[test]
    fn test_tie_break_by_edge_count_then_declaration() {
        // Name and Tag are independent; Total reads Qty and Price.
        let g = graph(&[
            ("Name", vec![]),
            ("Total", vec!["Qty", "Price"]),
            ("Tag", vec![]),
            ("Qty", vec![]),
            ("Price", vec![]),
        ]);
        assert_eq!(
            topological_order(&g).unwrap(),
            vec!["Qty", "Price", "Total", "Name", "Tag"]
        );
    }

    #[test]
    fn test_repeated_ordering_is_identical() {
        let edges = [
            ("E", vec!["D"]),
            ("D", vec!["B", "C"]),
            ("C", vec!["A"]),
            ("B", vec!["A"]),
            ("A", vec![]),
            ("F", vec![]),
        ];
        let first = topological_order(&graph(&edges)).unwrap();
        for _ in 0..10 {
            assert_eq!(topological_order(&graph(&edges)).unwrap(), first);
        }
        assert_eq!(first, vec!["A", "B", "C", "D", "E", "F"]);
    }

    #[test]
    fn test_cycle_is_reported_not_dropped() {
        let g = graph(&[("A", vec!["B"]), ("B", vec!["A"]), ("C", vec![])]);
        let err = topological_order(&g).unwrap_err();
        assert!(matches!(err, CompileError::CyclicAttributeDependency { ref cycle, .. } if cycle.len() == 3));
    }
}
