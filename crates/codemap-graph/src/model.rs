//! Node and edge types of the whole-codebase graph.

use std::fmt;

use codemap_repomap::tags::SymbolType;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Kind of a code graph node.
///
/// # Examples
///
/// ```
/// use codemap_graph::model::NodeKind;
/// use codemap_repomap::tags::SymbolType;
///
/// assert_eq!(NodeKind::from_symbol(SymbolType::Method), Some(NodeKind::Function));
/// assert_eq!(NodeKind::from_symbol(SymbolType::Call), None);
/// assert_eq!(NodeKind::Interface.to_string(), "INTERFACE");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NodeKind {
    File,
    Class,
    Interface,
    Function,
}

impl NodeKind {
    /// Node kind for a definition tag, or `None` for symbols the graph skips.
    pub fn from_symbol(symbol: SymbolType) -> Option<Self> {
        match symbol {
            SymbolType::Interface => Some(NodeKind::Interface),
            SymbolType::Class | SymbolType::Module | SymbolType::Type => Some(NodeKind::Class),
            SymbolType::Function | SymbolType::Method => Some(NodeKind::Function),
            _ => None,
        }
    }

    /// Class-like kinds, which can own methods.
    pub fn is_type(&self) -> bool {
        matches!(self, NodeKind::Class | NodeKind::Interface)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeKind::File => "FILE",
            NodeKind::Class => "CLASS",
            NodeKind::Interface => "INTERFACE",
            NodeKind::Function => "FUNCTION",
        };
        f.write_str(s)
    }
}

/// Kind of a code graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EdgeKind {
    /// File to a definition inside it.
    Contains,
    /// Caller or user to the definition it names.
    References,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Contains => f.write_str("CONTAINS"),
            EdgeKind::References => f.write_str("REFERENCES"),
        }
    }
}

/// A file, class, interface or function in the code graph.
///
/// `name` is the composite key: the file's relative path for FILE nodes,
/// `path:Class.member` for members and `path:symbol` otherwise. Lines are
/// 1-based and inclusive.
///
/// # Examples
///
/// ```
/// use codemap_graph::model::{CodeNode, NodeKind};
///
/// let node = CodeNode::file("src/Bank.java", "class Bank {}\n");
/// assert_eq!(node.kind, NodeKind::File);
/// assert_eq!(node.display_name, "Bank.java");
/// assert_eq!(node.end_line, 1);
/// assert_eq!(node.id().len(), 64);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeNode {
    pub name: String,
    pub kind: NodeKind,
    /// Path relative to the source root, `/`-separated.
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub text: String,
    pub display_name: String,
    /// Composite name of the enclosing class-like node, if any.
    pub owning_class: Option<String>,
}

impl CodeNode {
    /// A FILE node holding the whole source text.
    pub fn file(rel_path: &str, text: &str) -> Self {
        let display_name = rel_path.rsplit('/').next().unwrap_or(rel_path).to_string();
        Self {
            name: rel_path.to_string(),
            kind: NodeKind::File,
            file_path: rel_path.to_string(),
            start_line: 1,
            end_line: text.lines().count().max(1),
            text: text.to_string(),
            display_name,
            owning_class: None,
        }
    }

    /// Stable external identifier: hex SHA-256 of the composite name.
    pub fn id(&self) -> String {
        node_id(&self.name)
    }

    /// Symbol part of a member name: `Bank.transfer` for `Bank.java:Bank.transfer`.
    pub fn qualified_symbol(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, symbol)) if self.kind != NodeKind::File => symbol,
            _ => &self.name,
        }
    }
}

/// Lowercase hex SHA-256 of a composite node name.
///
/// # Examples
///
/// ```
/// use codemap_graph::model::node_id;
///
/// assert_eq!(node_id("a.py"), node_id("a.py"));
/// assert_ne!(node_id("a.py"), node_id("b.py"));
/// ```
pub fn node_id(name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A 1-based inclusive line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

/// Attributes of a code graph edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeEdge {
    pub kind: EdgeKind,
    /// Identifier that produced the edge.
    pub ident: String,
    /// Where the reference occurs; `None` for CONTAINS and unlocated references.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_line: Option<LineRange>,
}
