use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, QueryCursor, Tree};

use crate::walker::SourceFile;

/// Whether a tag defines or uses an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    Definition,
    Reference,
}

/// The construct a tag was captured from, taken from the capture name suffix.
///
/// # Examples
///
/// ```
/// use codemap_repomap::tags::SymbolType;
///
/// assert_eq!(SymbolType::from_capture("name.definition.class"), SymbolType::Class);
/// assert_eq!(SymbolType::from_capture("name.reference.call"), SymbolType::Call);
/// assert_eq!(SymbolType::from_capture("name.reference.whatever"), SymbolType::Unknown);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolType {
    Class,
    Interface,
    Function,
    Method,
    Module,
    Type,
    Call,
    Implementation,
    Unknown,
}

impl SymbolType {
    /// Map a capture name such as `name.definition.method` to its type.
    pub fn from_capture(capture: &str) -> Self {
        match capture.rsplit('.').next().unwrap_or_default() {
            "class" => SymbolType::Class,
            "interface" => SymbolType::Interface,
            "function" => SymbolType::Function,
            "method" => SymbolType::Method,
            "module" => SymbolType::Module,
            "type" => SymbolType::Type,
            "call" => SymbolType::Call,
            "implementation" => SymbolType::Implementation,
            _ => SymbolType::Unknown,
        }
    }

    /// Class-like definitions that can own methods.
    pub fn is_class_like(&self) -> bool {
        matches!(
            self,
            SymbolType::Class | SymbolType::Interface | SymbolType::Module
        )
    }

    /// Callable definitions.
    pub fn is_callable(&self) -> bool {
        matches!(self, SymbolType::Function | SymbolType::Method)
    }
}

/// An inclusive range of 0-based rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LineSpan {
    pub start: usize,
    pub end: usize,
}

impl LineSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Whether `other` lies entirely inside this span.
    ///
    /// # Examples
    ///
    /// ```
    /// use codemap_repomap::tags::LineSpan;
    ///
    /// let class = LineSpan::new(0, 10);
    /// assert!(class.contains(&LineSpan::new(2, 4)));
    /// assert!(!class.contains(&LineSpan::new(8, 12)));
    /// ```
    pub fn contains(&self, other: &LineSpan) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    fn of(node: &Node<'_>) -> Self {
        Self::new(node.start_position().row, node.end_position().row)
    }
}

/// A definition or reference of a named identifier in one file.
///
/// `line` is `None` for references synthesised by the identifier fallback,
/// which carry no location. `scope` is the span of the whole defining
/// construct and is only set for definitions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    /// Path relative to the repository root, `/`-separated.
    pub rel_path: String,
    /// Path the file was read from.
    pub path: PathBuf,
    /// Identifier text, possibly qualified as `receiver.name`.
    pub name: String,
    pub kind: TagKind,
    pub symbol_type: SymbolType,
    pub line: Option<LineSpan>,
    pub scope: Option<LineSpan>,
}

impl Tag {
    pub fn is_definition(&self) -> bool {
        self.kind == TagKind::Definition
    }

    /// First row of the tag, if located.
    pub fn start_line(&self) -> Option<usize> {
        self.line.map(|l| l.start)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}:{}", self.rel_path, line.start + 1, self.name),
            None => write!(f, "{}:?:{}", self.rel_path, self.name),
        }
    }
}

/// Extract definition and reference tags from a source file.
///
/// Runs the language's tag query over the parse tree. When the query finds
/// definitions but no references, every identifier leaf in the file is
/// emitted as an unlocated reference instead. Unsupported languages and
/// unparseable sources yield no tags.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use codemap_repomap::walker::{Language, SourceFile};
/// use codemap_repomap::tags::{extract_tags, TagKind};
///
/// let file = SourceFile {
///     path: PathBuf::from("a.py"),
///     abs_path: PathBuf::from("a.py"),
///     language: Language::Python,
///     content: "def foo():\n    bar()\n".into(),
/// };
/// let tags = extract_tags(&file);
/// assert!(tags.iter().any(|t| t.name == "foo" && t.kind == TagKind::Definition));
/// assert!(tags.iter().any(|t| t.name == "bar" && t.kind == TagKind::Reference));
/// ```
pub fn extract_tags(file: &SourceFile) -> Vec<Tag> {
    let (Some(spec), Some(query)) = (file.language.spec(), file.language.tags_query()) else {
        return Vec::new();
    };
    let Some(tree) = file.language.parse(&file.content) else {
        log::debug!("failed to parse {}", file.path.display());
        return Vec::new();
    };

    let source = file.content.as_bytes();
    let rel_path = file.rel_name();
    let capture_names = query.capture_names();
    let mut tags = Vec::new();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, tree.root_node(), source);

    while let Some(m) = matches.next() {
        let mut name_capture = None;
        let mut outer = None;

        for capture in m.captures {
            let capture_name = capture_names
                .get(capture.index as usize)
                .copied()
                .unwrap_or_default();
            if let Some(rest) = capture_name.strip_prefix("name.") {
                name_capture = Some((capture.node, capture_name, rest.starts_with("definition.")));
            } else if capture_name.starts_with("definition.") {
                outer = Some(capture.node);
            }
        }

        let Some((node, capture_name, is_definition)) = name_capture else {
            continue;
        };
        let Ok(text) = node.utf8_text(source) else {
            continue;
        };
        if text.is_empty() {
            continue;
        }

        let mut name = text.to_string();
        if !is_definition {
            if let Some(receiver) = spec.receiver {
                if let Some(object) = node
                    .parent()
                    .filter(|p| p.kind() == receiver.call_kind)
                    .and_then(|p| p.child_by_field_name(receiver.field))
                    .and_then(|o| o.utf8_text(source).ok())
                {
                    name = format!("{object}.{name}");
                }
            }
        }

        tags.push(Tag {
            rel_path: rel_path.clone(),
            path: file.abs_path.clone(),
            name,
            kind: if is_definition {
                TagKind::Definition
            } else {
                TagKind::Reference
            },
            symbol_type: SymbolType::from_capture(capture_name),
            line: Some(LineSpan::of(&node)),
            scope: if is_definition {
                outer.map(|o| LineSpan::of(&o))
            } else {
                None
            },
        });
    }

    let has_definitions = tags.iter().any(Tag::is_definition);
    let has_references = tags.iter().any(|t| !t.is_definition());
    if has_definitions && !has_references {
        tags.extend(identifier_references(&tree, file, &rel_path));
    }

    tags
}

fn is_identifier_kind(kind: &str) -> bool {
    kind == "identifier" || kind.ends_with("_identifier") || kind == "constant"
}

/// Every identifier leaf in `tree`, as an unlocated reference.
fn identifier_references(tree: &Tree, file: &SourceFile, rel_path: &str) -> Vec<Tag> {
    let source = file.content.as_bytes();
    let mut refs = Vec::new();
    let mut cursor = tree.walk();

    'walk: loop {
        let node = cursor.node();
        if node.child_count() == 0 {
            if is_identifier_kind(node.kind()) {
                if let Ok(text) = node.utf8_text(source) {
                    refs.push(Tag {
                        rel_path: rel_path.to_string(),
                        path: file.abs_path.clone(),
                        name: text.to_string(),
                        kind: TagKind::Reference,
                        symbol_type: SymbolType::Unknown,
                        line: None,
                        scope: None,
                    });
                }
            }
        } else if cursor.goto_first_child() {
            continue;
        }

        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                break 'walk;
            }
        }
    }

    refs
}
