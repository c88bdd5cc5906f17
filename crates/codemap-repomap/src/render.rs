use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Write;
use std::path::Path;

use codemap_core::CodemapError;
use tree_sitter::{Node, Point};

use crate::ranking::{render_order, RankedEntry};
use crate::tags::LineSpan;
use crate::walker::{read_source, Language};

/// Nesting depth beyond which rendering gives up on a file.
pub const MAX_SCOPE_DEPTH: usize = 256;

const SHOWN_PREFIX: char = '\u{2502}';
const GAP_MARKER: &str = "\u{22ee}...";

/// Cache key: relative path plus the sorted, de-duplicated lines of interest.
type CacheKey = (String, Vec<(usize, usize)>);

/// Rendered file fragments, keyed by file and lines of interest.
///
/// Owned by one renderer and never shared across threads.
#[derive(Debug, Default)]
pub struct RenderCache {
    entries: HashMap<CacheKey, String>,
    hits: usize,
}

impl RenderCache {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of lookups answered from the cache.
    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
    }

    fn key(rel_path: &str, lines: &[LineSpan]) -> CacheKey {
        let mut spans: Vec<(usize, usize)> = lines.iter().map(|l| (l.start, l.end)).collect();
        spans.sort_unstable();
        spans.dedup();
        (rel_path.to_string(), spans)
    }
}

/// Renders ranked entries as a tree of files with their key lines.
///
/// # Examples
///
/// ```
/// use std::collections::HashSet;
/// use codemap_repomap::ranking::RankedEntry;
/// use codemap_repomap::render::TreeRenderer;
///
/// let mut renderer = TreeRenderer::new(100);
/// let entries = vec![RankedEntry::File { rel_path: "README.md".into() }];
/// let tree = renderer.to_tree(&entries, &HashSet::new()).unwrap();
/// assert_eq!(tree, "\nREADME.md\n");
/// ```
#[derive(Debug)]
pub struct TreeRenderer {
    max_line_width: usize,
    cache: RenderCache,
}

impl TreeRenderer {
    pub fn new(max_line_width: usize) -> Self {
        Self {
            max_line_width,
            cache: RenderCache::default(),
        }
    }

    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }

    /// Render `entries`, skipping chat files.
    ///
    /// Entries are grouped by file. A file with located definitions renders
    /// as `"\n{file}:\n"` followed by its fragment; any other file renders as
    /// `"\n{file}\n"`. Every output line is cut to the configured width.
    ///
    /// # Errors
    ///
    /// Returns [`CodemapError::ResourceExhausted`] if a file nests scopes
    /// deeper than [`MAX_SCOPE_DEPTH`].
    pub fn to_tree(
        &mut self,
        entries: &[RankedEntry],
        chat_files: &HashSet<String>,
    ) -> Result<String, CodemapError> {
        let mut sorted: Vec<&RankedEntry> = entries
            .iter()
            .filter(|e| !chat_files.contains(e.rel_path()))
            .collect();
        sorted.sort_by(|a, b| render_order(a, b));

        let mut output = String::new();
        let mut start = 0;
        while start < sorted.len() {
            let rel_path = sorted[start].rel_path();
            let end = sorted[start..]
                .iter()
                .position(|e| e.rel_path() != rel_path)
                .map_or(sorted.len(), |n| start + n);
            let group = &sorted[start..end];
            start = end;

            let mut abs_path = None;
            let mut lines = Vec::new();
            for entry in group {
                if let RankedEntry::Definition(tag) = entry {
                    if let Some(line) = tag.line {
                        abs_path.get_or_insert(tag.path.as_path());
                        lines.push(line);
                    }
                }
            }

            match abs_path {
                Some(path) => {
                    let fragment = self.render_file(path, rel_path, &lines)?;
                    let _ = write!(output, "\n{rel_path}:\n{fragment}");
                }
                None => {
                    let _ = write!(output, "\n{rel_path}\n");
                }
            }
        }

        Ok(truncate_lines(&output, self.max_line_width))
    }

    fn render_file(
        &mut self,
        path: &Path,
        rel_path: &str,
        lines: &[LineSpan],
    ) -> Result<String, CodemapError> {
        let key = RenderCache::key(rel_path, lines);
        if let Some(hit) = self.cache.entries.get(&key) {
            self.cache.hits += 1;
            return Ok(hit.clone());
        }

        let rendered = match read_source(path) {
            Some(source) => render_context(&source, Language::from_path(path), lines)?,
            None => {
                log::debug!("cannot read {} for rendering", path.display());
                String::new()
            }
        };
        self.cache.entries.insert(key, rendered.clone());
        Ok(rendered)
    }
}

/// Render `source` showing only `lines_of_interest` and the header lines of
/// the scopes enclosing them. Each run of hidden lines becomes one `⋮...`.
///
/// # Errors
///
/// Returns [`CodemapError::ResourceExhausted`] if scopes nest deeper than
/// [`MAX_SCOPE_DEPTH`].
///
/// # Examples
///
/// ```
/// use codemap_repomap::render::render_context;
/// use codemap_repomap::tags::LineSpan;
/// use codemap_repomap::walker::Language;
///
/// let source = "class A:\n    x = 1\n    y = 2\n    z = 3\n    def f(self):\n        return 1\n";
/// let out = render_context(source, Language::Python, &[LineSpan::new(4, 4)]).unwrap();
/// assert!(out.starts_with("│class A:\n⋮...\n│    def f(self):\n"));
/// ```
pub fn render_context(
    source: &str,
    language: Language,
    lines_of_interest: &[LineSpan],
) -> Result<String, CodemapError> {
    let lines: Vec<&str> = source.lines().collect();
    if lines.is_empty() {
        return Ok(String::new());
    }
    let last = lines.len() - 1;

    let mut shown: BTreeSet<usize> = BTreeSet::new();
    for loi in lines_of_interest {
        for row in loi.start.min(last)..=loi.end.min(last) {
            shown.insert(row);
        }
    }

    if let Some(tree) = language.parse(source) {
        let root = tree.root_node();
        for loi in lines_of_interest {
            let row = loi.start.min(last);
            let column = lines[row].len() - lines[row].trim_start().len();
            let point = Point::new(row, column);
            if let Some(node) = root.descendant_for_point_range(point, point) {
                add_scope_headers(node, root, &mut shown)?;
            }
        }
    }

    // Close single-line gaps.
    let snapshot: Vec<usize> = shown.iter().copied().collect();
    for pair in snapshot.windows(2) {
        if pair[1] - pair[0] == 2 {
            shown.insert(pair[0] + 1);
        }
    }

    let mut out = String::new();
    let mut in_gap = false;
    for (row, line) in lines.iter().enumerate() {
        if shown.contains(&row) {
            let _ = writeln!(out, "{SHOWN_PREFIX}{line}");
            in_gap = false;
        } else if !in_gap {
            let _ = writeln!(out, "{GAP_MARKER}");
            in_gap = true;
        }
    }
    Ok(out)
}

/// Mark the first row of every multi-line ancestor of `node` except the root.
fn add_scope_headers(
    node: Node<'_>,
    root: Node<'_>,
    shown: &mut BTreeSet<usize>,
) -> Result<(), CodemapError> {
    let mut current = Some(node);
    let mut depth = 0;
    while let Some(n) = current {
        if n.id() == root.id() {
            break;
        }
        depth += 1;
        if depth > MAX_SCOPE_DEPTH {
            return Err(CodemapError::ResourceExhausted(format!(
                "scopes nested deeper than {MAX_SCOPE_DEPTH}"
            )));
        }
        let (start, end) = (n.start_position().row, n.end_position().row);
        if start < end && !is_body_kind(n.kind()) {
            shown.insert(start);
        }
        current = n.parent();
    }
    Ok(())
}

/// Bodies start at their first statement, which is not a useful header.
fn is_body_kind(kind: &str) -> bool {
    kind == "block"
        || kind.ends_with("_block")
        || kind.ends_with("body")
        || kind.ends_with("declaration_list")
}

/// Cut every line of `text` to at most `width` characters.
///
/// # Examples
///
/// ```
/// use codemap_repomap::render::truncate_lines;
///
/// assert_eq!(truncate_lines("abcdef\nxy\n", 3), "abc\nxy\n");
/// ```
pub fn truncate_lines(text: &str, width: usize) -> String {
    let mut out = String::with_capacity(text.len());
    for piece in text.split_inclusive('\n') {
        let (line, newline) = match piece.strip_suffix('\n') {
            Some(line) => (line, "\n"),
            None => (piece, ""),
        };
        match line.char_indices().nth(width) {
            Some((cut, _)) => out.push_str(&line[..cut]),
            None => out.push_str(line),
        }
        out.push_str(newline);
    }
    out
}
