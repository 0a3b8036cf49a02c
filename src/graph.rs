//! Reference graph
//!
//! Directed graph of symbolic references between registered schemas, built
//! with petgraph. Used to report reference cycles and transitive dependencies;
//! compilation itself walks the registry directly.

use std::collections::{BTreeSet, HashMap};

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;

use crate::schema::SchemaDocument;

/// Schema names as nodes, one edge per symbolic reference
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    node_indices: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Build from registered documents; references to unregistered names are dropped
    pub fn build<'a>(documents: impl IntoIterator<Item = &'a SchemaDocument>) -> Self {
        let documents: Vec<&SchemaDocument> = documents.into_iter().collect();
        let mut graph = DiGraph::with_capacity(documents.len(), documents.len() * 2);
        let mut node_indices = HashMap::with_capacity(documents.len());

        for doc in &documents {
            let idx = graph.add_node(doc.name().to_string());
            node_indices.insert(doc.name().to_string(), idx);
        }

        for doc in &documents {
            let from = node_indices[doc.name()];
            for reference in doc.required_references() {
                if let Some(&to) = node_indices.get(reference) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        Self {
            graph,
            node_indices,
        }
    }

    /// Groups of mutually referencing schemas, including self-references
    ///
    /// Members of each group are sorted, and groups are ordered by first member.
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut groups: Vec<Vec<String>> = kosaraju_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .map(|scc| {
                let mut members: Vec<String> = scc
                    .into_iter()
                    .filter_map(|idx| self.graph.node_weight(idx).cloned())
                    .collect();
                members.sort();
                members
            })
            .collect();
        groups.sort();
        groups
    }

    /// Every schema reachable from `name`, excluding `name` unless it is on a cycle
    pub fn dependencies_of(&self, name: &str) -> BTreeSet<String> {
        let mut reachable = BTreeSet::new();
        let Some(&start) = self.node_indices.get(name) else {
            return reachable;
        };

        // Seed with the direct references so `name` only shows up via a cycle
        let mut dfs = Dfs::empty(&self.graph);
        dfs.stack.extend(self.graph.neighbors(start));
        while let Some(idx) = dfs.next(&self.graph) {
            reachable.insert(self.graph[idx].clone());
        }
        reachable
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
