//! Graph type definitions.

use crate::types::{DependencyMap, EntryKind, EntryRef};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::BTreeMap;

/// Directed graph of textual references between configuration entries.
///
/// An edge `a -> b` means the text of `a` refers to `b`.
///
/// # Structure
///
/// ```text
/// DependencyGraph
/// ├── inner: DiGraph<EntryRef, ()>               // The actual graph
/// └── node_index: BTreeMap<EntryRef, NodeIndex>  // Lookup by entry
/// ```
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    inner: DiGraph<EntryRef, ()>,
    node_index: BTreeMap<EntryRef, NodeIndex>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a dependency listing.
    ///
    /// Referenced entries that are not themselves keys of the map (variables,
    /// typically) become leaf nodes. Nodes are inserted in map order so the
    /// exports are deterministic.
    #[must_use]
    pub fn from_map(map: &DependencyMap) -> Self {
        let mut graph = Self::new();
        for (from, targets) in map {
            let from_idx = graph.add_node(from);
            for to in targets {
                let to_idx = graph.add_node(to);
                graph.inner.add_edge(from_idx, to_idx, ());
            }
        }

        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Built dependency graph"
        );
        graph
    }

    /// Add a node, returning the existing index if already present.
    pub fn add_node(&mut self, entry: &EntryRef) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(entry) {
            return idx;
        }
        let idx = self.inner.add_node(entry.clone());
        self.node_index.insert(entry.clone(), idx);
        idx
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Whether the entry is a node of the graph.
    #[must_use]
    pub fn contains(&self, entry: &EntryRef) -> bool {
        self.node_index.contains_key(entry)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &EntryRef> {
        self.inner.node_weights()
    }

    /// Edges as `(from, to)` pairs in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&EntryRef, &EntryRef)> {
        self.inner
            .edge_references()
            .map(|e| (&self.inner[e.source()], &self.inner[e.target()]))
    }

    /// Entries that `entry` refers to, sorted.
    #[must_use]
    pub fn dependencies_of(&self, entry: &EntryRef) -> Vec<&EntryRef> {
        self.neighbors(entry, Direction::Outgoing)
    }

    /// Entries that refer to `entry`, sorted.
    #[must_use]
    pub fn dependents_of(&self, entry: &EntryRef) -> Vec<&EntryRef> {
        self.neighbors(entry, Direction::Incoming)
    }

    /// Number of nodes of a given kind.
    #[must_use]
    pub fn count_kind(&self, kind: EntryKind) -> usize {
        self.nodes().filter(|n| n.kind == kind).count()
    }

    fn neighbors(&self, entry: &EntryRef, direction: Direction) -> Vec<&EntryRef> {
        let Some(&idx) = self.node_index.get(entry) else {
            return Vec::new();
        };
        let mut result: Vec<&EntryRef> = self
            .inner
            .neighbors_directed(idx, direction)
            .map(|n| &self.inner[n])
            .collect();
        result.sort();
        result.dedup();
        result
    }
}
