//! Wait-for graph of variables that could not be resolved.
//!
//! Built only when resolution stalls, to tell a genuine cycle apart from variables
//! waiting on identifiers nobody declared, and to name the cycle in the error.

use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

/// Color states for cycle detection using DFS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    /// Node has not been visited.
    White,
    /// Node is currently being visited (in the DFS stack).
    Gray,
    /// Node has been fully visited.
    Black,
}

/// Directed graph of identifiers: an edge `a → b` means `a` waits for the value of `b`.
pub struct WaitGraph {
    graph: DiGraph<String, ()>,
    node_map: HashMap<String, NodeIndex>,
}

impl WaitGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            node_map: HashMap::new(),
        }
    }

    fn ensure_node(&mut self, identifier: &str) -> NodeIndex {
        if let Some(&index) = self.node_map.get(identifier) {
            index
        } else {
            let index = self.graph.add_node(identifier.to_string());
            self.node_map.insert(identifier.to_string(), index);
            index
        }
    }

    /// Record that `from` waits for `to`.
    pub fn add_wait(&mut self, from: &str, to: &str) {
        let from_idx = self.ensure_node(from);
        let to_idx = self.ensure_node(to);
        if !self.graph.contains_edge(from_idx, to_idx) {
            self.graph.add_edge(from_idx, to_idx, ());
        }
    }

    /// Number of identifiers in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Find a cycle, returned as the identifiers along it with the first repeated at
    /// the end.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let mut colors: HashMap<NodeIndex, Color> =
            self.graph.node_indices().map(|n| (n, Color::White)).collect();
        let mut path = Vec::new();

        for node in self.graph.node_indices() {
            if colors.get(&node) == Some(&Color::White) {
                if let Some(cycle) = self.dfs_visit(node, &mut colors, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn dfs_visit(
        &self,
        node: NodeIndex,
        colors: &mut HashMap<NodeIndex, Color>,
        path: &mut Vec<NodeIndex>,
    ) -> Option<Vec<String>> {
        colors.insert(node, Color::Gray);
        path.push(node);

        for neighbor in self.graph.neighbors(node) {
            match colors.get(&neighbor) {
                Some(Color::Gray) => {
                    let start = path.iter().position(|&n| n == neighbor).unwrap_or(0);
                    let mut cycle =
                        path[start..].iter().map(|&n| self.graph[n].clone()).collect::<Vec<_>>();
                    cycle.push(self.graph[neighbor].clone());
                    return Some(cycle);
                }
                Some(Color::White) => {
                    if let Some(cycle) = self.dfs_visit(neighbor, colors, path) {
                        return Some(cycle);
                    }
                }
                _ => {}
            }
        }

        path.pop();
        colors.insert(node, Color::Black);
        None
    }
}

impl Default for WaitGraph {
    fn default() -> Self {
        Self::new()
    }
}
