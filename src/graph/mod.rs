//! Dependency Graph Module
//!
//! Turns the textual [`DependencyMap`](crate::types::DependencyMap) into a
//! `petgraph` directed graph for querying and export.
//!
//! ```text
//! ┌──────────────────────┐      ┌─────────────────┐      ┌────────────────┐
//! │ list_dependencies()  │─────▶│ DependencyGraph │─────▶│ export_graph() │
//! │ (DependencyMap)      │      │ (DiGraph)       │      │ DOT/Mermaid/JSON│
//! └──────────────────────┘      └─────────────────┘      └────────────────┘
//! ```
//!
//! Edges point from the referring entry to the referenced one, so
//! `google_compute_firewall.allow_ssh -> google_compute_network.vpc` reads
//! "the firewall refers to the network".
//!
//! # Example
//!
//! ```rust,ignore
//! use tfagent::graph::{export_graph, DependencyGraph};
//! use tfagent::types::GraphFormat;
//!
//! let graph = DependencyGraph::from_map(&analysis.dependencies);
//! std::fs::write("deps.dot", export_graph(&graph, GraphFormat::Dot)?)?;
//! // dot -Tpng deps.dot -o deps.png
//! ```

mod export;
mod types;

pub use export::export_graph;
pub use types::DependencyGraph;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DependencyMap, EntryKind, EntryRef, GraphFormat, ResourceKey};
    use std::collections::BTreeSet;

    fn sample() -> (DependencyGraph, EntryRef, EntryRef, EntryRef) {
        let network = EntryRef::resource(&ResourceKey::new("google_compute_network", "vpc"));
        let firewall = EntryRef::resource(&ResourceKey::new("google_compute_firewall", "allow_ssh"));
        let subnet = EntryRef::resource(&ResourceKey::new("google_compute_subnetwork", "app"));

        let mut map = DependencyMap::new();
        map.insert(network.clone(), BTreeSet::new());
        map.insert(firewall.clone(), BTreeSet::from([network.clone()]));
        map.insert(subnet.clone(), BTreeSet::from([network.clone()]));
        (DependencyGraph::from_map(&map), network, firewall, subnet)
    }

    #[test]
    fn test_build_from_map() {
        let (graph, network, ..) = sample();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.contains(&network));
        assert_eq!(graph.count_kind(EntryKind::Resource), 3);
    }

    #[test]
    fn test_dependents_and_dependencies() {
        let (graph, network, firewall, subnet) = sample();
        assert_eq!(graph.dependents_of(&network), vec![&firewall, &subnet]);
        assert_eq!(graph.dependencies_of(&firewall), vec![&network]);
        assert!(graph.dependencies_of(&network).is_empty());

        let unknown = EntryRef::new(EntryKind::Local, "nope");
        assert!(graph.dependents_of(&unknown).is_empty());
    }

    #[test]
    fn test_export_formats() {
        let (graph, ..) = sample();
        assert!(export_graph(&graph, GraphFormat::Dot).unwrap().contains("digraph"));
        assert!(export_graph(&graph, GraphFormat::Json).unwrap().contains("\"edges\""));
        assert!(export_graph(&graph, GraphFormat::Mermaid).unwrap().contains("graph LR"));
    }
}
