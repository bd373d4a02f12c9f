// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Attribute dependency graph for a single pattern.
//!
//! Nodes are the pattern's attribute names in declaration order. An edge
//! `attribute -> dependency` means the attribute's value expression reads the
//! dependency. The graph is built and thrown away per compiled pattern.
//!
//! # Cycle Detection Algorithm
//! Depth-first search with an explicit path, run from the attribute whose edges
//! were just added:
//! - **Time Complexity**: O(V + E) per check
//! - **Space Complexity**: O(V) for the visited set and path
//! - Any new cycle must pass through the attribute whose edges closed it, so
//!   checking only that attribute after each insertion finds every cycle.

use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Newtype wrapper around the pattern's adjacency list.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Attribute names in declaration order
    nodes: Vec<String>,
    /// Attribute → attributes it reads
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an attribute without edges. Re-adding keeps its original position.
    pub fn add_node(&mut self, attribute: &str) {
        if !self.edges.contains_key(attribute) {
            self.nodes.push(attribute.to_string());
            self.edges.insert(attribute.to_string(), BTreeSet::new());
        }
    }

    /// Add edges from `attribute` to each of `dependencies`.
    pub fn add_dependencies<'a>(&mut self, attribute: &str, dependencies: impl IntoIterator<Item = &'a str>) {
        self.add_node(attribute);
        let deps: Vec<&str> = dependencies.into_iter().collect();
        for dep in &deps {
            self.add_node(dep);
        }
        if let Some(out) = self.edges.get_mut(attribute) {
            out.extend(deps.into_iter().map(str::to_string));
        }
    }

    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn dependencies(&self, attribute: &str) -> impl Iterator<Item = &String> {
        self.edges.get(attribute).into_iter().flatten()
    }

    /// Attributes whose expressions read `attribute`, in declaration order.
    pub fn dependents(&self, attribute: &str) -> Vec<&String> {
        self.nodes
            .iter()
            .filter(|n| self.edges.get(*n).is_some_and(|deps| deps.contains(attribute)))
            .collect()
    }

    /// Incoming plus outgoing edges.
    pub fn edge_count(&self, attribute: &str) -> usize {
        let outgoing = self.edges.get(attribute).map_or(0, BTreeSet::len);
        let incoming = self
            .edges
            .values()
            .filter(|deps| deps.contains(attribute))
            .count();
        outgoing + incoming
    }

    /// Find a cycle that starts and ends at `attribute`.
    ///
    /// Returns the cycle path, e.g. `[A, B, C, A]`, or `None` if `attribute`
    /// cannot reach itself.
    pub fn find_cycle_through(&self, attribute: &str) -> Option<Vec<String>> {
        let mut visited = HashSet::new();
        let mut path = vec![attribute.to_string()];
        self.dfs_cycle_detection(attribute, attribute, &mut visited, &mut path)
    }

    fn dfs_cycle_detection(
        &self,
        node: &str,
        target: &str,
        visited: &mut HashSet<String>,
        path: &mut Vec<String>,
    ) -> Option<Vec<String>> {
        visited.insert(node.to_string());

        for neighbor in self.dependencies(node) {
            if neighbor == target {
                let mut cycle = path.clone();
                cycle.push(neighbor.clone()); // Close the cycle
                return Some(cycle);
            }
            if !visited.contains(neighbor) {
                path.push(neighbor.clone());
                if let Some(cycle) = self.dfs_cycle_detection(neighbor, target, visited, path) {
                    return Some(cycle);
                }
                path.pop();
            }
        }
        None
    }
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
    fn test_no_cycle_in_diamond() {
        let g = graph(&[
            ("D", vec!["B", "C"]),
            ("B", vec!["A"]),
            ("C", vec!["A"]),
            ("A", vec![]),
        ]);
        for node in ["A", "B", "C", "D"] {
            assert_eq!(g.find_cycle_through(node), None);
        }
        assert_eq!(g.edge_count("A"), 2);
        assert_eq!(g.edge_count("D"), 2);
        assert_eq!(g.dependents("A"), vec!["B", "C"]);
    }

    #[test]
    fn test_cycles_table_driven() {
        struct TestCase {
            edges: Vec<(&'static str, Vec<&'static str>)>,
            from: &'static str,
            expected: Option<Vec<&'static str>>,
        }

        let cases = vec![
            TestCase {
                edges: vec![("A", vec!["A"])],
                from: "A",
                expected: Some(vec!["A", "A"]),
            },
            TestCase {
                edges: vec![("A", vec!["B"]), ("B", vec!["A"])],
                from: "B",
                expected: Some(vec!["B", "A", "B"]),
            },
            TestCase {
                edges: vec![("A", vec!["B"]), ("B", vec!["C"]), ("C", vec!["D"]), ("D", vec!["B"])],
                from: "D",
                expected: Some(vec!["D", "B", "C", "D"]),
            },
            TestCase {
                edges: vec![("A", vec!["B"]), ("B", vec!["C"]), ("C", vec!["D"]), ("D", vec!["B"])],
                from: "A",
                expected: None,
            },
        ];

        for case in cases {
            let g = graph(&case.edges);
            let found = g.find_cycle_through(case.from);
            let expected = case
                .expected
                .map(|c| c.into_iter().map(String::from).collect::<Vec<_>>());
            assert_eq!(found, expected, "cycle through {}", case.from);
        }
    }

    #[test]
    fn test_node_order_is_declaration_order() {
        let g = graph(&[("Fee", vec!["Balance"]), ("Balance", vec![])]);
        assert_eq!(g.nodes(), &["Fee".to_string(), "Balance".to_string()]);
    }
}
