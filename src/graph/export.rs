//! Graph export functionality.
//!
//! This module provides functions to export the dependency graph
//! in various formats for visualization and analysis.

use crate::error::Result;
use crate::graph::types::DependencyGraph;
use crate::types::{EntryKind, EntryRef, GraphFormat};
use serde::Serialize;

/// Export the dependency graph to the specified format.
///
/// # Supported Formats
///
/// - **DOT**: Graphviz DOT format for visualization
/// - **JSON**: Structured JSON for programmatic access
/// - **Mermaid**: Mermaid diagram syntax for documentation
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn export_graph(graph: &DependencyGraph, format: GraphFormat) -> Result<String> {
    match format {
        GraphFormat::Dot => Ok(export_dot(graph)),
        GraphFormat::Json => export_json(graph),
        GraphFormat::Mermaid => Ok(export_mermaid(graph)),
    }
}

/// Fill colour per entry kind, shared by DOT and Mermaid.
const fn kind_color(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Resource => "#e1f5fe",
        EntryKind::DataSource => "#ede7f6",
        EntryKind::Variable => "#fff8e1",
        EntryKind::Output => "#e8f5e9",
        EntryKind::Local => "#f3e5f5",
        EntryKind::Module => "#fbe9e7",
        EntryKind::Provider => "#eceff1",
    }
}

const fn kind_class(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Resource => "resource",
        EntryKind::DataSource => "data",
        EntryKind::Variable => "variable",
        EntryKind::Output => "output",
        EntryKind::Local => "local",
        EntryKind::Module => "module",
        EntryKind::Provider => "provider",
    }
}

const ALL_KINDS: [EntryKind; 7] = [
    EntryKind::Resource,
    EntryKind::DataSource,
    EntryKind::Variable,
    EntryKind::Output,
    EntryKind::Local,
    EntryKind::Module,
    EntryKind::Provider,
];

/// Export to Graphviz DOT format.
fn export_dot(graph: &DependencyGraph) -> String {
    let mut dot = String::new();
    dot.push_str("digraph tfagent {\n");
    dot.push_str("    rankdir=LR;\n");
    dot.push_str("    node [shape=box, style=\"rounded,filled\"];\n\n");

    for node in graph.nodes() {
        let id = escape_dot_string(&node.to_string());
        let shape = match node.kind {
            EntryKind::Variable | EntryKind::Output => ", shape=ellipse",
            EntryKind::Module => ", shape=component",
            _ => "",
        };
        dot.push_str(&format!(
            "    \"{id}\" [fillcolor=\"{}\"{shape}];\n",
            kind_color(node.kind)
        ));
    }

    if graph.edge_count() > 0 {
        dot.push('\n');
    }
    for (from, to) in graph.edges() {
        dot.push_str(&format!(
            "    \"{}\" -> \"{}\";\n",
            escape_dot_string(&from.to_string()),
            escape_dot_string(&to.to_string())
        ));
    }

    dot.push_str("}\n");
    dot
}

/// Export to JSON format.
fn export_json(graph: &DependencyGraph) -> Result<String> {
    #[derive(Serialize)]
    struct JsonGraph<'a> {
        nodes: Vec<JsonNode<'a>>,
        edges: Vec<JsonEdge>,
        metadata: JsonMetadata,
    }

    #[derive(Serialize)]
    struct JsonNode<'a> {
        id: String,
        kind: EntryKind,
        key: &'a str,
    }

    #[derive(Serialize)]
    struct JsonEdge {
        from: String,
        to: String,
    }

    #[derive(Serialize)]
    struct JsonMetadata {
        total_nodes: usize,
        total_edges: usize,
    }

    let nodes: Vec<JsonNode<'_>> = graph
        .nodes()
        .map(|n: &EntryRef| JsonNode {
            id: n.to_string(),
            kind: n.kind,
            key: &n.key,
        })
        .collect();

    let edges: Vec<JsonEdge> = graph
        .edges()
        .map(|(from, to)| JsonEdge {
            from: from.to_string(),
            to: to.to_string(),
        })
        .collect();

    let json_graph = JsonGraph {
        metadata: JsonMetadata {
            total_nodes: nodes.len(),
            total_edges: edges.len(),
        },
        nodes,
        edges,
    };

    serde_json::to_string_pretty(&json_graph).map_err(|e| {
        crate::err!(ReportGeneration {
            message: format!("Failed to serialize graph to JSON: {e}"),
        })
    })
}

/// Export to Mermaid diagram format.
fn export_mermaid(graph: &DependencyGraph) -> String {
    let mut mermaid = String::new();
    mermaid.push_str("graph LR\n");

    for node in graph.nodes() {
        let id = sanitize_mermaid_id(&node.to_string());
        let label = escape_mermaid_string(&node.to_string());
        let shape = match node.kind {
            EntryKind::Variable | EntryKind::Output => format!("([\"{label}\"])"),
            EntryKind::Module => format!("[[\"{label}\"]]"),
            _ => format!("[\"{label}\"]"),
        };
        mermaid.push_str(&format!("    {id}{shape}\n"));
    }

    for (from, to) in graph.edges() {
        mermaid.push_str(&format!(
            "    {} --> {}\n",
            sanitize_mermaid_id(&from.to_string()),
            sanitize_mermaid_id(&to.to_string())
        ));
    }

    let mut classes = String::new();
    for kind in ALL_KINDS {
        let ids: Vec<String> = graph
            .nodes()
            .filter(|n| n.kind == kind)
            .map(|n| sanitize_mermaid_id(&n.to_string()))
            .collect();
        if ids.is_empty() {
            continue;
        }
        let class = kind_class(kind);
        classes.push_str(&format!("    classDef {class} fill:{}\n", kind_color(kind)));
        classes.push_str(&format!("    class {} {class}\n", ids.join(",")));
    }
    if !classes.is_empty() {
        mermaid.push('\n');
        mermaid.push_str(&classes);
    }

    mermaid
}

/// Escape a string for use in DOT labels.
fn escape_dot_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Sanitize a string for use as a Mermaid node ID.
fn sanitize_mermaid_id(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Escape a string for use in Mermaid labels.
fn escape_mermaid_string(s: &str) -> String {
    s.replace('"', "'").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DependencyMap, ResourceKey};
    use std::collections::BTreeSet;

    fn create_test_graph() -> DependencyGraph {
        let network = EntryRef::resource(&ResourceKey::new("google_compute_network", "vpc"));
        let firewall = EntryRef::resource(&ResourceKey::new("google_compute_firewall", "allow_ssh"));
        let project = EntryRef::new(EntryKind::Variable, "project_id");

        let mut map = DependencyMap::new();
        map.insert(network.clone(), BTreeSet::from([project]));
        map.insert(firewall, BTreeSet::from([network]));
        DependencyGraph::from_map(&map)
    }

    #[test]
    fn test_export_dot() {
        let dot = export_dot(&create_test_graph());

        assert!(dot.starts_with("digraph tfagent {"));
        assert!(dot.contains("\"google_compute_firewall.allow_ssh\" -> \"google_compute_network.vpc\";"));
        assert!(dot.contains("\"var.project_id\" [fillcolor=\"#fff8e1\", shape=ellipse];"));
    }

    #[test]
    fn test_export_json() {
        let json = export_json(&create_test_graph()).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["metadata"]["total_nodes"], 3);
        assert_eq!(parsed["metadata"]["total_edges"], 2);
        assert!(parsed["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .any(|n| n["id"] == "var.project_id" && n["kind"] == "variable"));
    }

    #[test]
    fn test_export_mermaid() {
        let mermaid = export_mermaid(&create_test_graph());

        assert!(mermaid.starts_with("graph LR"));
        assert!(mermaid.contains("google_compute_firewall_allow_ssh --> google_compute_network_vpc"));
        assert!(mermaid.contains("var_project_id([\"var.project_id\"])"));
        assert!(mermaid.contains("class var_project_id variable"));
    }

    #[test]
    fn test_export_empty_graph() {
        let graph = DependencyGraph::new();
        assert_eq!(export_dot(&graph), "digraph tfagent {\n    rankdir=LR;\n    node [shape=box, style=\"rounded,filled\"];\n\n}\n");
        assert_eq!(export_mermaid(&graph), "graph LR\n");
    }

    #[test]
    fn test_escape_dot_string() {
        assert_eq!(escape_dot_string("hello\nworld"), "hello\\nworld");
        assert_eq!(escape_dot_string("say \"hi\""), "say \\\"hi\\\"");
    }

    #[test]
    fn test_sanitize_mermaid_id() {
        assert_eq!(sanitize_mermaid_id("data.google_compute_zones.available"), "data_google_compute_zones_available");
    }
}
