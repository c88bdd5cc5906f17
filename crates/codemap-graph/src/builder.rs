//! Builds a [`CodeGraph`] from a source tree.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use codemap_core::{CodemapError, GraphConfig};
use codemap_repomap::tags::{extract_tags, Tag};
use codemap_repomap::walker::{rel_name, walk_text_files, SourceFile};
use rayon::prelude::*;

use crate::changes::ChangeSet;
use crate::graph::CodeGraph;
use crate::model::{CodeNode, LineRange, NodeKind};
use crate::policy::{ConventionPolicy, DirectionPolicy};
use crate::span::{block_end, slice_lines};

/// A file read and tagged, ready to be added to the graph.
struct ParsedFile {
    rel_path: String,
    content: String,
    tags: Vec<Tag>,
    brace_scoped: bool,
}

/// A definition placed in the graph, kept to attribute references.
struct Placed {
    name: String,
    kind: NodeKind,
    start: usize,
    end: usize,
}

/// A reference waiting for every definition to be known.
struct PendingRef {
    source: String,
    ident: String,
    line: Option<LineRange>,
}

/// Walks a source tree and assembles its code graph.
///
/// Node names are relative to the source root. Changed-file lists are
/// relative to the repository root.
///
/// # Examples
///
/// ```no_run
/// use codemap_graph::builder::CodeGraphBuilder;
///
/// let graph = CodeGraphBuilder::new(".").source_root("src").build().unwrap();
/// println!("{} nodes", graph.node_count());
/// ```
pub struct CodeGraphBuilder {
    root: PathBuf,
    source_root: PathBuf,
    policy: Box<dyn DirectionPolicy>,
    exclude_extensions: Vec<String>,
}

impl CodeGraphBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            source_root: root.clone(),
            root,
            policy: Box::new(ConventionPolicy::default()),
            exclude_extensions: Vec::new(),
        }
    }

    /// Builder configured from the `[graph]` section.
    pub fn from_config(root: impl Into<PathBuf>, config: &GraphConfig) -> Self {
        let mut builder = Self::new(root)
            .policy(ConventionPolicy::new(config.impl_suffix.clone()))
            .exclude_extensions(config.exclude_extensions.clone());
        if let Some(source_root) = &config.source_root {
            builder = builder.source_root(source_root);
        }
        builder
    }

    /// Walk only this sub-directory of the repository.
    pub fn source_root(mut self, dir: impl AsRef<Path>) -> Self {
        self.source_root = self.root.join(dir);
        self
    }

    pub fn policy(mut self, policy: impl DirectionPolicy + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Extra extensions to treat as binary.
    pub fn exclude_extensions(mut self, extensions: Vec<String>) -> Self {
        self.exclude_extensions = extensions;
        self
    }

    /// Build the graph of every text file under the source root.
    ///
    /// # Errors
    ///
    /// Returns [`CodemapError::FileNotFound`] if the source root is not a
    /// directory.
    pub fn build(&self) -> Result<CodeGraph, CodemapError> {
        self.build_incremental(&ChangeSet::Full)
    }

    /// Build the graph for `changes` only.
    ///
    /// [`ChangeSet::Full`] is identical to [`build`](Self::build). For a file
    /// set, only the changed files' nodes and CONTAINS edges are produced;
    /// REFERENCES edges need the whole tree and are left to the full build.
    ///
    /// # Errors
    ///
    /// Returns [`CodemapError::FileNotFound`] if the source root is not a
    /// directory.
    pub fn build_incremental(&self, changes: &ChangeSet) -> Result<CodeGraph, CodemapError> {
        let paths: Vec<PathBuf> = walk_text_files(&self.source_root, &self.exclude_extensions)?
            .into_iter()
            .filter(|path| changes.includes(&self.repo_relative(path)))
            .collect();
        log::debug!(
            "graph build over {} files under {}",
            paths.len(),
            self.source_root.display()
        );

        let files: Vec<ParsedFile> = paths
            .par_iter()
            .filter_map(|path| self.parse(path))
            .collect();

        let mut graph = CodeGraph::new();
        let mut defines: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut pending = Vec::new();

        for file in &files {
            let placed = add_definitions(&mut graph, file, &mut defines);
            if changes.is_full() {
                pending.extend(collect_references(file, &placed));
            }
        }

        for reference in &pending {
            for target in resolve(&defines, &reference.ident) {
                graph.add_reference(
                    &reference.source,
                    target,
                    &reference.ident,
                    reference.line,
                    self.policy.as_ref(),
                );
            }
        }

        let stats = graph.stats();
        log::info!(
            "code graph: {} nodes, {} edges",
            stats.node_total(),
            stats.edge_total()
        );
        Ok(graph)
    }

    fn repo_relative(&self, path: &Path) -> String {
        rel_name(path.strip_prefix(&self.root).unwrap_or(path))
    }

    fn parse(&self, path: &Path) -> Option<ParsedFile> {
        let rel = path.strip_prefix(&self.source_root).unwrap_or(path);
        let source = SourceFile::load(path, rel)?;
        let tags = extract_tags(&source);
        let brace_scoped = source
            .language
            .spec()
            .is_some_and(|spec| spec.brace_scoped);
        Some(ParsedFile {
            rel_path: source.rel_name(),
            content: source.content,
            tags,
            brace_scoped,
        })
    }
}

/// Add a file's FILE node and its definition nodes with CONTAINS edges.
fn add_definitions(
    graph: &mut CodeGraph,
    file: &ParsedFile,
    defines: &mut BTreeMap<String, BTreeSet<String>>,
) -> Vec<Placed> {
    graph.add_node(CodeNode::file(&file.rel_path, &file.content));
    let last_line = file.content.lines().count().saturating_sub(1);

    let definitions: Vec<(&Tag, NodeKind)> = file
        .tags
        .iter()
        .filter(|t| t.is_definition())
        .filter_map(|t| NodeKind::from_symbol(t.symbol_type).map(|kind| (t, kind)))
        .collect();

    let spans: Vec<(usize, usize)> = definitions
        .iter()
        .map(|(tag, _)| definition_span(file, tag, last_line))
        .collect();

    let mut placed = Vec::new();
    for (i, (tag, kind)) in definitions.iter().enumerate() {
        let (start, end) = spans[i];
        let owner = enclosing_type(&definitions, &spans, i);
        let symbol = match owner {
            Some(o) => format!("{}.{}", definitions[o].0.name, tag.name),
            None => tag.name.clone(),
        };
        let name = format!("{}:{symbol}", file.rel_path);

        let node = CodeNode {
            name: name.clone(),
            kind: *kind,
            file_path: file.rel_path.clone(),
            start_line: start + 1,
            end_line: end + 1,
            text: slice_lines(&file.content, start, end),
            display_name: tag.name.clone(),
            owning_class: owner.map(|o| format!("{}:{}", file.rel_path, definitions[o].0.name)),
        };
        if graph.add_node(node) {
            graph.add_contains(&file.rel_path, &name, &tag.name);
        } else {
            log::debug!("duplicate definition {name} at line {} dropped", start + 1);
        }
        defines.entry(tag.name.clone()).or_default().insert(name.clone());
        placed.push(Placed {
            name,
            kind: *kind,
            start,
            end,
        });
    }
    placed
}

/// 0-based inclusive span of a definition.
fn definition_span(file: &ParsedFile, tag: &Tag, last_line: usize) -> (usize, usize) {
    let line = tag.start_line().unwrap_or(0);
    if file.brace_scoped {
        return (line, block_end(&file.content, line));
    }
    match tag.scope {
        Some(scope) => (scope.start, scope.end.min(last_line).max(scope.start)),
        None => (line, last_line),
    }
}

/// Index of the innermost class-like definition strictly enclosing `i`.
fn enclosing_type(
    definitions: &[(&Tag, NodeKind)],
    spans: &[(usize, usize)],
    i: usize,
) -> Option<usize> {
    let (start, end) = spans[i];
    let line = definitions[i].0.start_line().unwrap_or(start);

    let mut best: Option<usize> = None;
    for (j, (tag, kind)) in definitions.iter().enumerate() {
        let (s, e) = spans[j];
        let encloses = j != i
            && kind.is_type()
            && s <= start
            && end <= e
            && tag.start_line().unwrap_or(s) < line;
        if encloses && best.map_or(true, |b| e - s < spans[b].1 - spans[b].0) {
            best = Some(j);
        }
    }
    best
}

/// References of one file, attributed to the innermost enclosing function
/// or to the file itself. Repeats of the same source, name and line collapse.
fn collect_references(file: &ParsedFile, placed: &[Placed]) -> Vec<PendingRef> {
    let mut seen = HashSet::new();
    let mut refs = Vec::new();

    for tag in file.tags.iter().filter(|t| !t.is_definition()) {
        let source = tag
            .start_line()
            .and_then(|line| {
                placed
                    .iter()
                    .filter(|p| p.kind == NodeKind::Function && p.start <= line && line <= p.end)
                    .min_by_key(|p| p.end - p.start)
            })
            .map_or_else(|| file.rel_path.clone(), |p| p.name.clone());
        let line = tag.line.map(|l| LineRange {
            start: l.start + 1,
            end: l.end + 1,
        });

        if seen.insert((source.clone(), tag.name.clone(), line)) {
            refs.push(PendingRef {
                source,
                ident: tag.name.clone(),
                line,
            });
        }
    }
    refs
}

/// Definition nodes for a referenced name. A receiver-qualified name such
/// as `account.deposit` falls back to its last segment.
fn resolve<'a>(defines: &'a BTreeMap<String, BTreeSet<String>>, ident: &str) -> Vec<&'a String> {
    if let Some(targets) = defines.get(ident) {
        return targets.iter().collect();
    }
    ident
        .rsplit_once('.')
        .and_then(|(_, member)| defines.get(member))
        .map(|targets| targets.iter().collect())
        .unwrap_or_default()
}
