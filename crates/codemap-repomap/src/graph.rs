use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::tags::{Tag, TagKind};

/// Multiplier for identifiers the user mentioned explicitly.
pub const MENTIONED_MULTIPLIER: f64 = 10.0;

/// Multiplier for identifiers starting with `_`.
pub const PRIVATE_MULTIPLIER: f64 = 0.1;

/// Personalization mass spread across all files when some are boosted.
pub const PERSONALIZATION_MASS: f64 = 100.0;

/// Edge payload: which identifier links the two files, and how strongly.
#[derive(Debug, Clone, PartialEq)]
pub struct RefEdge {
    pub weight: f64,
    pub symbol: String,
}

/// Lookups derived from a set of tags while building the graph.
#[derive(Debug, Default)]
pub struct SymbolIndex {
    /// Identifier to the files defining it.
    pub defines: BTreeMap<String, BTreeSet<String>>,
    /// Identifier to the files referencing it, one entry per reference.
    pub references: BTreeMap<String, Vec<String>>,
    /// `(file, identifier)` to every definition tag of that identifier in that file.
    pub definitions: HashMap<(String, String), Vec<Tag>>,
}

impl SymbolIndex {
    fn from_tags<'a>(tags: impl IntoIterator<Item = &'a Tag>) -> Self {
        let mut index = SymbolIndex::default();
        for tag in tags {
            match tag.kind {
                TagKind::Definition => {
                    index
                        .defines
                        .entry(tag.name.clone())
                        .or_default()
                        .insert(tag.rel_path.clone());
                    index
                        .definitions
                        .entry((tag.rel_path.clone(), tag.name.clone()))
                        .or_default()
                        .push(tag.clone());
                }
                TagKind::Reference => index
                    .references
                    .entry(tag.name.clone())
                    .or_default()
                    .push(tag.rel_path.clone()),
            }
        }

        // With no references anywhere, each definition stands in for one.
        if index.references.is_empty() {
            index.references = index
                .defines
                .iter()
                .map(|(ident, files)| (ident.clone(), files.iter().cloned().collect()))
                .collect();
        }

        for defs in index.definitions.values_mut() {
            defs.sort_by_key(|t| t.start_line());
        }
        index
    }
}

/// Weight multiplier for edges labelled with `ident`.
///
/// # Examples
///
/// ```
/// use std::collections::HashSet;
/// use codemap_repomap::graph::edge_multiplier;
///
/// let mentioned: HashSet<String> = ["Bank".to_string()].into();
/// assert_eq!(edge_multiplier("Bank", &mentioned), 10.0);
/// assert_eq!(edge_multiplier("_helper", &mentioned), 0.1);
/// assert_eq!(edge_multiplier("run", &mentioned), 1.0);
/// ```
pub fn edge_multiplier(ident: &str, mentioned_idents: &HashSet<String>) -> f64 {
    if mentioned_idents.contains(ident) {
        MENTIONED_MULTIPLIER
    } else if ident.starts_with('_') {
        PRIVATE_MULTIPLIER
    } else {
        1.0
    }
}

/// Personalization weights for PageRank.
///
/// Files in `boosted` receive `100 / files.len()`; every other file is left
/// out and takes the uniform default when the vector is normalised.
///
/// # Examples
///
/// ```
/// use std::collections::HashSet;
/// use codemap_repomap::graph::personalization;
///
/// let files = vec!["a.py".to_string(), "b.py".to_string()];
/// let boosted: HashSet<String> = ["a.py".to_string()].into();
/// let p = personalization(&files, &boosted);
/// assert_eq!(p.get("a.py"), Some(&50.0));
/// assert!(p.get("b.py").is_none());
/// ```
pub fn personalization(files: &[String], boosted: &HashSet<String>) -> HashMap<String, f64> {
    if files.is_empty() {
        return HashMap::new();
    }
    let value = PERSONALIZATION_MASS / files.len() as f64;
    files
        .iter()
        .filter(|f| boosted.contains(*f))
        .map(|f| (f.clone(), value))
        .collect()
}

/// Weighted multigraph over files: an edge `a -> b` labelled `ident` means
/// file `a` references `ident`, which file `b` defines.
///
/// Parallel edges are kept, one per identifier. Edge weight is the identifier
/// multiplier times the square root of the number of references.
///
/// # Examples
///
/// ```
/// use std::collections::HashSet;
/// use std::path::PathBuf;
/// use codemap_repomap::graph::ReferenceGraph;
/// use codemap_repomap::tags::{LineSpan, SymbolType, Tag, TagKind};
///
/// let tag = |file: &str, kind| Tag {
///     rel_path: file.into(),
///     path: PathBuf::from(file),
///     name: "foo".into(),
///     kind,
///     symbol_type: SymbolType::Function,
///     line: Some(LineSpan::new(0, 0)),
///     scope: None,
/// };
/// let tags = vec![tag("a.py", TagKind::Definition), tag("b.py", TagKind::Reference)];
/// let (graph, index) = ReferenceGraph::build(&tags, &HashSet::new());
/// assert_eq!(graph.edge_count(), 1);
/// assert_eq!(graph.edges().next().unwrap().0, "b.py");
/// assert!(index.defines["foo"].contains("a.py"));
/// ```
#[derive(Debug, Default)]
pub struct ReferenceGraph {
    graph: DiGraph<String, RefEdge>,
    index: HashMap<String, NodeIndex>,
}

impl ReferenceGraph {
    /// Build the graph from every tag of every file.
    pub fn build(tags: &[Tag], mentioned_idents: &HashSet<String>) -> (Self, SymbolIndex) {
        let symbols = SymbolIndex::from_tags(tags);
        let mut graph = ReferenceGraph::default();

        for (ident, definers) in &symbols.defines {
            let Some(referencers) = symbols.references.get(ident) else {
                continue;
            };
            let multiplier = edge_multiplier(ident, mentioned_idents);

            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            for referencer in referencers {
                *counts.entry(referencer.as_str()).or_default() += 1;
            }

            for (referencer, num_refs) in counts {
                for definer in definers {
                    let from = graph.node(referencer);
                    let to = graph.node(definer);
                    graph.graph.add_edge(
                        from,
                        to,
                        RefEdge {
                            weight: multiplier * (num_refs as f64).sqrt(),
                            symbol: ident.clone(),
                        },
                    );
                }
            }
        }

        log::debug!(
            "reference graph: {} files, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        (graph, symbols)
    }

    fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(name) {
            return idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.index.insert(name.to_string(), idx);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, file: &str) -> bool {
        self.index.contains_key(file)
    }

    /// File names in insertion order.
    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().map(String::as_str)
    }

    /// All edges as `(from, to, edge)`.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &RefEdge)> {
        self.graph.edge_references().map(|e| {
            (
                self.graph[e.source()].as_str(),
                self.graph[e.target()].as_str(),
                e.weight(),
            )
        })
    }

    /// Outgoing edges of `file` as `(to, edge)`.
    pub fn out_edges<'a>(&'a self, file: &str) -> Vec<(&'a str, &'a RefEdge)> {
        let Some(&idx) = self.index.get(file) else {
            return Vec::new();
        };
        let mut edges: Vec<(&str, &RefEdge)> = self
            .graph
            .edges(idx)
            .map(|e| (self.graph[e.target()].as_str(), e.weight()))
            .collect();
        // petgraph yields outgoing edges newest first.
        edges.reverse();
        edges
    }

    pub(crate) fn inner(&self) -> &DiGraph<String, RefEdge> {
        &self.graph
    }
}
