//! Serialization of a [`CodeGraph`] for external stores and for people.

use std::fmt::Write;

use codemap_core::CodemapError;
use serde::Serialize;

use crate::graph::{CodeGraph, GraphStats};
use crate::model::{CodeEdge, CodeNode, EdgeKind, NodeKind};

#[derive(Debug, Serialize)]
struct NodeRecord<'a> {
    id: String,
    #[serde(flatten)]
    node: &'a CodeNode,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EdgeRecord<'a> {
    source_id: String,
    target_id: String,
    source: &'a str,
    target: &'a str,
    #[serde(flatten)]
    edge: &'a CodeEdge,
}

#[derive(Debug, Serialize)]
struct GraphRecord<'a> {
    stats: GraphStats,
    nodes: Vec<NodeRecord<'a>>,
    edges: Vec<EdgeRecord<'a>>,
}

/// JSON document with `stats`, `nodes` and `edges`.
///
/// Every node carries its `id` (SHA-256 of the name); edges name both ends
/// by id and by name.
///
/// # Errors
///
/// Returns [`CodemapError::Serialization`] if serialization fails.
///
/// # Examples
///
/// ```
/// use codemap_graph::export::to_json;
/// use codemap_graph::graph::CodeGraph;
/// use codemap_graph::model::CodeNode;
///
/// let mut graph = CodeGraph::new();
/// graph.add_node(CodeNode::file("a.py", "x = 1\n"));
/// let json = to_json(&graph).unwrap();
/// assert!(json.contains("\"kind\": \"FILE\""));
/// ```
pub fn to_json(graph: &CodeGraph) -> Result<String, CodemapError> {
    let record = GraphRecord {
        stats: graph.stats(),
        nodes: graph
            .nodes()
            .map(|node| NodeRecord {
                id: node.id(),
                node,
            })
            .collect(),
        edges: graph
            .edges()
            .map(|(from, to, edge)| EdgeRecord {
                source_id: from.id(),
                target_id: to.id(),
                source: &from.name,
                target: &to.name,
                edge,
            })
            .collect(),
    };
    serde_json::to_string_pretty(&record).map_err(CodemapError::from)
}

/// One line of counts followed by one line per edge.
///
/// # Examples
///
/// ```
/// use codemap_graph::export::to_text;
/// use codemap_graph::graph::CodeGraph;
///
/// assert_eq!(to_text(&CodeGraph::new()), "0 nodes, 0 edges\n");
/// ```
pub fn to_text(graph: &CodeGraph) -> String {
    let stats = graph.stats();
    let mut out = String::new();
    let _ = write!(out, "{} nodes", stats.node_total());
    for (kind, count) in &stats.nodes {
        let _ = write!(out, " {kind}={count}");
    }
    let _ = write!(out, ", {} edges", stats.edge_total());
    for (kind, count) in &stats.edges {
        let _ = write!(out, " {kind}={count}");
    }
    out.push('\n');

    for (from, to, edge) in graph.edges() {
        let _ = writeln!(out, "{} -[{}]-> {}", from.name, edge.kind, to.name);
    }
    out
}

/// Markdown report: a counts table and the members of each file.
pub fn to_markdown(graph: &CodeGraph) -> String {
    let stats = graph.stats();
    let mut out = String::new();
    out.push_str("# Code Graph\n\n");
    out.push_str("| Kind | Count |\n|------|-------|\n");
    for (kind, count) in &stats.nodes {
        let _ = writeln!(out, "| {kind} | {count} |");
    }
    for (kind, count) in &stats.edges {
        let _ = writeln!(out, "| {kind} | {count} |");
    }

    let files: Vec<&CodeNode> = graph
        .nodes()
        .filter(|n| n.kind == NodeKind::File)
        .collect();
    for file in files {
        let members = graph.neighbors(&file.name, EdgeKind::Contains);
        if members.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n## {}\n", file.name);
        for member in members {
            let _ = write!(
                out,
                "- `{}` {} (lines {}-{})",
                member.qualified_symbol(),
                member.kind,
                member.start_line,
                member.end_line
            );
            let refs = graph.neighbors(&member.name, EdgeKind::References);
            if !refs.is_empty() {
                let names: Vec<&str> = refs.iter().map(|r| r.name.as_str()).collect();
                let _ = write!(out, " → {}", names.join(", "));
            }
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::ConventionPolicy;

    fn sample() -> CodeGraph {
        let mut graph = CodeGraph::new();
        graph.add_node(CodeNode::file("a.py", "def foo():\n    bar()\n"));
        graph.add_node(CodeNode::file("b.py", "def bar():\n    pass\n"));
        for (file, name) in [("a.py", "foo"), ("b.py", "bar")] {
            let mut node = CodeNode::file(file, "");
            node.name = format!("{file}:{name}");
            node.kind = NodeKind::Function;
            node.display_name = name.into();
            graph.add_node(node);
            graph.add_contains(file, &format!("{file}:{name}"), name);
        }
        graph.add_reference(
            "a.py:foo",
            "b.py:bar",
            "bar",
            None,
            &ConventionPolicy::default(),
        );
        graph
    }

    #[test]
    fn json_links_edges_by_id() {
        let graph = sample();
        let value: serde_json::Value = serde_json::from_str(&to_json(&graph).unwrap()).unwrap();
        let nodes = value["nodes"].as_array().unwrap();
        let edges = value["edges"].as_array().unwrap();
        assert_eq!(nodes.len(), 4);
        assert_eq!(edges.len(), 3);

        let reference = edges.iter().find(|e| e["kind"] == "REFERENCES").unwrap();
        let target = nodes.iter().find(|n| n["name"] == "b.py:bar").unwrap();
        assert_eq!(reference["targetId"], target["id"]);
        assert_eq!(reference["ident"], "bar");
        assert_eq!(value["stats"]["edges"]["CONTAINS"], 2);
    }

    #[test]
    fn text_lists_counts_and_edges() {
        let text = to_text(&sample());
        assert!(text.starts_with("4 nodes FILE=2 FUNCTION=2, 3 edges CONTAINS=2 REFERENCES=1\n"));
        assert!(text.contains("a.py:foo -[REFERENCES]-> b.py:bar"));
    }

    #[test]
    fn markdown_groups_members_by_file() {
        let md = to_markdown(&sample());
        assert!(md.contains("## a.py"));
        assert!(md.contains("- `foo` FUNCTION"));
        assert!(md.contains("→ b.py:bar"));
    }
}
