//! The FILE/CLASS/INTERFACE/FUNCTION graph.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;

use crate::model::{CodeEdge, CodeNode, EdgeKind, LineRange, NodeKind};
use crate::policy::DirectionPolicy;

/// Node and edge counts by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub nodes: BTreeMap<NodeKind, usize>,
    pub edges: BTreeMap<EdgeKind, usize>,
}

impl GraphStats {
    pub fn node_total(&self) -> usize {
        self.nodes.values().sum()
    }

    pub fn edge_total(&self) -> usize {
        self.edges.values().sum()
    }
}

/// Directed code graph keyed by composite node name.
///
/// Each name maps to at most one node. An edge of a given kind is added at
/// most once per unordered node pair: once `a -> b` exists, neither
/// `a -> b` nor `b -> a` of the same kind is added again.
///
/// # Examples
///
/// ```
/// use codemap_graph::graph::CodeGraph;
/// use codemap_graph::model::{CodeNode, NodeKind};
///
/// let mut graph = CodeGraph::new();
/// assert!(graph.add_node(CodeNode::file("a.py", "x = 1\n")));
/// assert!(!graph.add_node(CodeNode::file("a.py", "x = 2\n")));
/// assert_eq!(graph.node("a.py").unwrap().text, "x = 1\n");
/// ```
#[derive(Debug, Default)]
pub struct CodeGraph {
    graph: DiGraph<CodeNode, CodeEdge>,
    index: HashMap<String, NodeIndex>,
    seen: HashSet<(NodeIndex, NodeIndex, EdgeKind)>,
}

impl CodeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node unless one with the same name exists. Returns whether
    /// it was inserted.
    pub fn add_node(&mut self, node: CodeNode) -> bool {
        if self.index.contains_key(&node.name) {
            return false;
        }
        let name = node.name.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(name, idx);
        true
    }

    /// Link a file to a definition inside it.
    pub fn add_contains(&mut self, file: &str, member: &str, ident: &str) -> bool {
        let (Some(&from), Some(&to)) = (self.index.get(file), self.index.get(member)) else {
            return false;
        };
        self.insert_edge(
            from,
            to,
            CodeEdge {
                kind: EdgeKind::Contains,
                ident: ident.to_string(),
                ref_line: None,
            },
        )
    }

    /// Link a referencing scope to a definition, if `policy` accepts the
    /// direction. Self-references and unknown names are ignored.
    pub fn add_reference(
        &mut self,
        source: &str,
        target: &str,
        ident: &str,
        ref_line: Option<LineRange>,
        policy: &dyn DirectionPolicy,
    ) -> bool {
        if source == target {
            return false;
        }
        let (Some(&from), Some(&to)) = (self.index.get(source), self.index.get(target)) else {
            return false;
        };
        if self.is_linked(from, to, EdgeKind::References) {
            return false;
        }
        if !policy.allows(&self.graph[from], &self.graph[to]) {
            return false;
        }
        self.insert_edge(
            from,
            to,
            CodeEdge {
                kind: EdgeKind::References,
                ident: ident.to_string(),
                ref_line,
            },
        )
    }

    fn is_linked(&self, a: NodeIndex, b: NodeIndex, kind: EdgeKind) -> bool {
        self.seen.contains(&(a, b, kind)) || self.seen.contains(&(b, a, kind))
    }

    fn insert_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: CodeEdge) -> bool {
        if self.is_linked(from, to, edge.kind) {
            return false;
        }
        self.seen.insert((from, to, edge.kind));
        self.graph.add_edge(from, to, edge);
        true
    }

    pub fn node(&self, name: &str) -> Option<&CodeNode> {
        self.index.get(name).map(|&idx| &self.graph[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &CodeNode> {
        self.graph.node_weights()
    }

    /// Edges as `(source, target, attributes)` in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&CodeNode, &CodeNode, &CodeEdge)> {
        self.graph
            .edge_references()
            .map(|e| (&self.graph[e.source()], &self.graph[e.target()], e.weight()))
    }

    /// Edge keys `(source, target, kind)`, ordered.
    ///
    /// Two builds of the same tree compare equal on this set.
    pub fn edge_keys(&self) -> BTreeSet<(String, String, EdgeKind)> {
        self.edges()
            .map(|(from, to, edge)| (from.name.clone(), to.name.clone(), edge.kind))
            .collect()
    }

    /// Composite names of all nodes, ordered.
    pub fn node_names(&self) -> BTreeSet<String> {
        self.index.keys().cloned().collect()
    }

    /// Targets of `name`'s outgoing edges of `kind`.
    pub fn neighbors(&self, name: &str, kind: EdgeKind) -> Vec<&CodeNode> {
        let Some(&idx) = self.index.get(name) else {
            return Vec::new();
        };
        let mut out: Vec<&CodeNode> = self
            .graph
            .edges(idx)
            .filter(|e| e.weight().kind == kind)
            .map(|e| &self.graph[e.target()])
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats::default();
        for node in self.nodes() {
            *stats.nodes.entry(node.kind).or_default() += 1;
        }
        for edge in self.graph.edge_weights() {
            *stats.edges.entry(edge.kind).or_default() += 1;
        }
        stats
    }
}
