use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::graph::SymbolIndex;
use crate::tags::Tag;

/// One item of the ranked list: a definition tag, or a whole file with no
/// definition shown.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RankedEntry {
    Definition(Tag),
    File { rel_path: String },
}

impl RankedEntry {
    pub fn rel_path(&self) -> &str {
        match self {
            RankedEntry::Definition(tag) => &tag.rel_path,
            RankedEntry::File { rel_path } => rel_path,
        }
    }

    fn sort_key(&self) -> (&str, u8, usize) {
        match self {
            RankedEntry::File { rel_path } => (rel_path, 0, 0),
            RankedEntry::Definition(tag) => (&tag.rel_path, 1, tag.start_line().unwrap_or(0)),
        }
    }
}

/// Total order used when rendering: by file, bare files first, then by line.
pub(crate) fn render_order(a: &RankedEntry, b: &RankedEntry) -> Ordering {
    a.sort_key().cmp(&b.sort_key())
}

fn by_score_desc<K: Ord>(a: &(K, f64), b: &(K, f64)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.cmp(&b.0))
}

/// Assemble the ranked list.
///
/// Definitions come first, ordered by descending score (ties broken by file
/// then identifier), skipping files in `chat_files`. Each `(file,
/// identifier)` pair contributes all its definition tags. Then every ranked
/// file not yet listed follows by descending file rank, and finally
/// `other_files` that never appeared in the graph, in the order given.
///
/// # Examples
///
/// ```
/// use std::collections::{HashMap, HashSet};
/// use codemap_repomap::graph::SymbolIndex;
/// use codemap_repomap::ranking::{order_entries, RankedEntry};
///
/// let ranks: HashMap<String, f64> = [("b.py".to_string(), 0.7)].into();
/// let entries = order_entries(
///     &HashMap::new(),
///     &ranks,
///     &SymbolIndex::default(),
///     &HashSet::new(),
///     &["a.py".to_string(), "b.py".to_string()],
/// );
/// let files: Vec<&str> = entries.iter().map(|e| e.rel_path()).collect();
/// assert_eq!(files, vec!["b.py", "a.py"]);
/// ```
pub fn order_entries(
    scores: &HashMap<(String, String), f64>,
    file_ranks: &HashMap<String, f64>,
    symbols: &SymbolIndex,
    chat_files: &HashSet<String>,
    other_files: &[String],
) -> Vec<RankedEntry> {
    let mut ranked_defs: Vec<(&(String, String), f64)> =
        scores.iter().map(|(k, v)| (k, *v)).collect();
    ranked_defs.sort_by(by_score_desc);

    let mut entries = Vec::new();
    let mut listed: HashSet<&str> = HashSet::new();

    for ((file, ident), _) in ranked_defs {
        if chat_files.contains(file) {
            continue;
        }
        if let Some(defs) = symbols.definitions.get(&(file.clone(), ident.clone())) {
            entries.extend(defs.iter().cloned().map(RankedEntry::Definition));
            listed.insert(file.as_str());
        }
    }

    let mut ranked_files: Vec<(&String, f64)> =
        file_ranks.iter().map(|(k, v)| (k, *v)).collect();
    ranked_files.sort_by(by_score_desc);

    for (file, _) in ranked_files {
        if listed.insert(file.as_str()) {
            entries.push(RankedEntry::File {
                rel_path: file.clone(),
            });
        }
    }

    for file in other_files {
        if listed.insert(file.as_str()) {
            entries.push(RankedEntry::File {
                rel_path: file.clone(),
            });
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::{LineSpan, SymbolType, TagKind};
    use std::path::PathBuf;

    fn def(file: &str, name: &str, line: usize) -> Tag {
        Tag {
            rel_path: file.into(),
            path: PathBuf::from(file),
            name: name.into(),
            kind: TagKind::Definition,
            symbol_type: SymbolType::Function,
            line: Some(LineSpan::new(line, line)),
            scope: None,
        }
    }

    fn index(tags: &[Tag]) -> SymbolIndex {
        let mut index = SymbolIndex::default();
        for t in tags {
            index
                .definitions
                .entry((t.rel_path.clone(), t.name.clone()))
                .or_default()
                .push(t.clone());
        }
        index
    }

    fn key(file: &str, ident: &str) -> (String, String) {
        (file.to_string(), ident.to_string())
    }

    #[test]
    fn definitions_by_score_then_files() {
        let symbols = index(&[def("a.py", "foo", 3), def("c.py", "bar", 0)]);
        let scores: HashMap<_, _> = [(key("a.py", "foo"), 0.2), (key("c.py", "bar"), 0.5)].into();
        let ranks: HashMap<String, f64> =
            [("a.py".into(), 0.3), ("b.py".into(), 0.4), ("c.py".into(), 0.3)].into();

        let entries = order_entries(&scores, &ranks, &symbols, &HashSet::new(), &[]);
        let rendered: Vec<String> = entries
            .iter()
            .map(|e| match e {
                RankedEntry::Definition(t) => format!("{}#{}", t.rel_path, t.name),
                RankedEntry::File { rel_path } => rel_path.clone(),
            })
            .collect();
        assert_eq!(rendered, vec!["c.py#bar", "a.py#foo", "b.py"]);
    }

    #[test]
    fn chat_files_contribute_no_definitions() {
        let symbols = index(&[def("chat.py", "foo", 0), def("a.py", "bar", 0)]);
        let scores: HashMap<_, _> = [(key("chat.py", "foo"), 0.9), (key("a.py", "bar"), 0.1)].into();
        let chat: HashSet<String> = ["chat.py".to_string()].into();

        let entries = order_entries(&scores, &HashMap::new(), &symbols, &chat, &[]);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].rel_path(), "a.py");
    }

    #[test]
    fn every_definition_of_a_pair_is_listed_in_line_order() {
        let symbols = index(&[def("a.py", "foo", 1), def("a.py", "foo", 8)]);
        let scores: HashMap<_, _> = [(key("a.py", "foo"), 0.5)].into();
        let entries = order_entries(&scores, &HashMap::new(), &symbols, &HashSet::new(), &[]);
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn equal_scores_break_ties_by_path() {
        let symbols = index(&[def("b.py", "x", 0), def("a.py", "x", 0)]);
        let scores: HashMap<_, _> = [(key("b.py", "x"), 0.5), (key("a.py", "x"), 0.5)].into();
        let entries = order_entries(&scores, &HashMap::new(), &symbols, &HashSet::new(), &[]);
        assert_eq!(entries[0].rel_path(), "a.py");
        assert_eq!(entries[1].rel_path(), "b.py");
    }

    #[test]
    fn untagged_other_files_come_last() {
        let ranks: HashMap<String, f64> = [("a.py".into(), 0.5)].into();
        let others = vec!["z.txt".to_string(), "a.py".to_string(), "m.md".to_string()];
        let entries = order_entries(
            &HashMap::new(),
            &ranks,
            &SymbolIndex::default(),
            &HashSet::new(),
            &others,
        );
        let files: Vec<&str> = entries.iter().map(|e| e.rel_path()).collect();
        assert_eq!(files, vec!["a.py", "z.txt", "m.md"]);
    }

    #[test]
    fn render_order_puts_bare_file_before_its_definitions() {
        let mut entries = vec![
            RankedEntry::Definition(def("a.py", "foo", 5)),
            RankedEntry::File {
                rel_path: "b.py".into(),
            },
            RankedEntry::Definition(def("a.py", "bar", 1)),
            RankedEntry::File {
                rel_path: "a.py".into(),
            },
        ];
        entries.sort_by(render_order);
        assert!(matches!(entries[0], RankedEntry::File { .. }));
        assert!(matches!(&entries[1], RankedEntry::Definition(t) if t.name == "bar"));
        assert!(matches!(&entries[2], RankedEntry::Definition(t) if t.name == "foo"));
        assert_eq!(entries[3].rel_path(), "b.py");
    }
}
