use std::fmt::Write;

use codemap_core::CodemapError;
use serde::Serialize;

use crate::budget::RenderedMap;
use crate::ranking::RankedEntry;

/// JSON-serializable representation of a rendered map.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MapOutput<'a> {
    map: &'a str,
    tokens: usize,
    entries_included: usize,
    files: Vec<&'a str>,
}

/// Distinct files of a ranked-list prefix, in first-seen order.
fn included_files(entries: &[RankedEntry]) -> Vec<&str> {
    let mut files: Vec<&str> = Vec::new();
    for entry in entries {
        let file = entry.rel_path();
        if !files.contains(&file) {
            files.push(file);
        }
    }
    files
}

/// Plain text: the map itself, prefixed when a prefix is configured.
///
/// # Examples
///
/// ```
/// use codemap_repomap::budget::RenderedMap;
/// use codemap_repomap::output::format_text;
///
/// let map = RenderedMap { text: "\na.py\n".into(), entries_included: 1, tokens: 1 };
/// assert_eq!(format_text(&map, None), "\na.py\n");
/// assert_eq!(format_text(&map, Some("Files:")), "Files:\na.py\n");
/// ```
pub fn format_text(map: &RenderedMap, prefix: Option<&str>) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}{}", map.text),
        None => map.text.clone(),
    }
}

/// Generate JSON output for a rendered map.
///
/// `entries` is the full ranked list; only its included prefix is reported.
///
/// # Errors
///
/// Returns [`CodemapError::Serialization`] if serialization fails.
///
/// # Examples
///
/// ```
/// use codemap_repomap::budget::RenderedMap;
/// use codemap_repomap::output::format_json;
/// use codemap_repomap::ranking::RankedEntry;
///
/// let map = RenderedMap { text: "\na.py\n".into(), entries_included: 1, tokens: 1 };
/// let entries = vec![RankedEntry::File { rel_path: "a.py".into() }];
/// let json = format_json(&map, &entries).unwrap();
/// assert!(json.contains("\"entriesIncluded\": 1"));
/// ```
pub fn format_json(map: &RenderedMap, entries: &[RankedEntry]) -> Result<String, CodemapError> {
    let included = &entries[..map.entries_included.min(entries.len())];
    let output = MapOutput {
        map: &map.text,
        tokens: map.tokens,
        entries_included: map.entries_included,
        files: included_files(included),
    };
    serde_json::to_string_pretty(&output).map_err(CodemapError::from)
}

/// Generate Markdown output for a rendered map.
///
/// # Examples
///
/// ```
/// use codemap_repomap::budget::RenderedMap;
/// use codemap_repomap::output::format_markdown;
///
/// let map = RenderedMap { text: "\na.py\n".into(), entries_included: 1, tokens: 1 };
/// let md = format_markdown(&map);
/// assert!(md.starts_with("# Repository Map"));
/// assert!(md.contains("```\n\na.py\n```"));
/// ```
pub fn format_markdown(map: &RenderedMap) -> String {
    let mut out = String::new();
    out.push_str("# Repository Map\n\n");
    let _ = writeln!(
        out,
        "_{} entries, {} tokens_\n",
        map.entries_included, map.tokens
    );
    let _ = writeln!(out, "```\n{}```", map.text);
    out
}
