//! Integration tests: walk → tag → rank → render.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use codemap_core::{MapConfig, OutputFormat};
use codemap_repomap::graph::ReferenceGraph;
use codemap_repomap::ranking::RankedEntry;
use codemap_repomap::tags::{extract_tags, TagKind};
use codemap_repomap::tokens::WordCounter;
use codemap_repomap::walker::{walk_repo, Language};
use codemap_repomap::RepoMap;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn words_map(root: &Path, max_tokens: usize) -> RepoMap {
    let config = MapConfig {
        max_tokens,
        ..MapConfig::default()
    };
    RepoMap::with_counter(root.to_path_buf(), config, Box::new(WordCounter))
}

fn paths(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(PathBuf::from).collect()
}

#[test]
fn end_to_end_on_workspace_crates() {
    let repo_root = Path::new(env!("CARGO_MANIFEST_DIR")).parent().unwrap();

    let files = walk_repo(repo_root).unwrap();
    let rust_count = files
        .iter()
        .filter(|f| f.language == Language::Rust)
        .count();
    assert!(rust_count > 5, "should find multiple Rust files: {rust_count}");

    let tags: Vec<_> = files.iter().flat_map(extract_tags).collect();
    assert!(
        tags.iter()
            .any(|t| t.name == "CodemapError" && t.kind == TagKind::Definition),
        "should find the CodemapError definition"
    );

    let map = codemap_repomap::generate_map(
        repo_root,
        &MapConfig::default(),
        &[],
        OutputFormat::Text,
    )
    .unwrap();
    assert!(map.contains(".rs"), "map should mention Rust files");

    let json = codemap_repomap::generate_map(
        repo_root,
        &MapConfig::default(),
        &[],
        OutputFormat::Json,
    )
    .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(parsed["tokens"].as_u64().unwrap() < 1024 * 8);
}

#[test]
fn caller_links_to_definer() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.py", "def foo():\n    return 1\n");
    write(dir.path(), "b.py", "from a import foo\n\ndef main():\n    foo()\n");

    let files = walk_repo(dir.path()).unwrap();
    let tags: Vec<_> = files.iter().flat_map(extract_tags).collect();
    let (graph, _) = ReferenceGraph::build(&tags, &HashSet::new());

    assert!(graph
        .edges()
        .any(|(from, to, edge)| from == "b.py" && to == "a.py" && edge.symbol == "foo"));
}

#[test]
fn referenced_file_ranks_above_unreferenced_one() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.py", "def foo():\n    return 1\n");
    write(dir.path(), "b.py", "def main():\n    foo()\n");
    write(dir.path(), "c.py", "def lonely():\n    return 2\n");

    let mut repo_map = words_map(dir.path(), 1024);
    let entries = repo_map
        .ranked_entries(
            &[],
            &paths(&["a.py", "b.py", "c.py"]),
            &HashSet::new(),
            &HashSet::new(),
        )
        .unwrap();

    let position = |file: &str| entries.iter().position(|e| e.rel_path() == file).unwrap();
    assert!(position("a.py") < position("c.py"));
    assert!(matches!(&entries[0], RankedEntry::Definition(t) if t.name == "foo"));
}

#[test]
fn unseen_definer_leaves_caller_as_bare_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.py", "def foo():\n    return 1\n");
    write(dir.path(), "b.py", "def main():\n    foo()\n");

    let mut repo_map = words_map(dir.path(), 1024);
    let entries = repo_map
        .ranked_entries(&[], &paths(&["b.py"]), &HashSet::new(), &HashSet::new())
        .unwrap();

    assert_eq!(
        entries,
        vec![RankedEntry::File {
            rel_path: "b.py".into()
        }]
    );
}

#[test]
fn every_requested_file_is_listed() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.py", "def foo():\n    return 1\n");
    write(dir.path(), "b.py", "def main():\n    foo()\n");
    write(dir.path(), "README.md", "# Project\n");

    let mut repo_map = words_map(dir.path(), 1024);
    let entries = repo_map
        .ranked_entries(
            &[],
            &paths(&["a.py", "b.py", "README.md"]),
            &HashSet::new(),
            &HashSet::new(),
        )
        .unwrap();
    for file in ["a.py", "b.py", "README.md"] {
        assert!(entries.iter().any(|e| e.rel_path() == file), "{file} missing");
    }
}

#[test]
fn chat_files_are_left_out_of_the_map() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.py", "def foo():\n    return 1\n");
    write(dir.path(), "b.py", "def main():\n    foo()\n");

    let mut repo_map = words_map(dir.path(), 1024);
    let map = repo_map
        .get_repo_map(
            &paths(&["b.py"]),
            &paths(&["a.py"]),
            &HashSet::new(),
            &HashSet::new(),
        )
        .unwrap();
    assert!(map.contains("a.py:"));
    assert!(map.contains("│def foo():"));
    assert!(!map.contains("b.py"));
}

#[test]
fn mentioned_identifier_reorders_definitions() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.py", "def alpha():\n    return 1\n");
    write(dir.path(), "b.py", "def beta():\n    return 2\n");
    write(
        dir.path(),
        "main.py",
        "def main():\n    alpha()\n    alpha()\n    alpha()\n    beta()\n",
    );
    let others = paths(&["a.py", "b.py", "main.py"]);

    let mut repo_map = words_map(dir.path(), 1024);
    let plain = repo_map
        .ranked_entries(&[], &others, &HashSet::new(), &HashSet::new())
        .unwrap();
    assert_eq!(plain[0].rel_path(), "a.py");

    let mentioned: HashSet<String> = ["beta".to_string()].into();
    let boosted = repo_map
        .ranked_entries(&[], &others, &HashSet::new(), &mentioned)
        .unwrap();
    assert_eq!(boosted[0].rel_path(), "b.py");
}

#[test]
fn map_stays_under_budget_and_grows_with_it() {
    let dir = tempfile::tempdir().unwrap();
    let mut others = Vec::new();
    for i in 0..20 {
        let rel = format!("mod{i:02}.py");
        write(
            dir.path(),
            &rel,
            &format!("def func{i}():\n    return helper()\n\ndef helper{i}():\n    pass\n"),
        );
        others.push(PathBuf::from(rel));
    }
    write(dir.path(), "util.py", "def helper():\n    return 0\n");
    others.push(PathBuf::from("util.py"));

    let mut last = 0;
    for budget in [8, 16, 32, 64, 128, 256, 1024] {
        let mut repo_map = words_map(dir.path(), budget);
        let Some(ranked) =
            repo_map.get_ranked_map(&[], &others, &HashSet::new(), &HashSet::new())
        else {
            continue;
        };
        assert!(ranked.map.tokens < budget);
        assert!(ranked.map.entries_included >= last);
        last = ranked.map.entries_included;
    }
    assert!(last > 0);
}

#[test]
fn definition_only_grammar_still_ranks() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "geom.h", "struct point { int x; };\nint area(struct point p);\n");
    write(
        dir.path(),
        "geom.c",
        "int area(int w, int h) {\n    return w * h;\n}\n",
    );
    write(
        dir.path(),
        "main.c",
        "int main(void) {\n    return area(2, 3);\n}\n",
    );

    let mut repo_map = words_map(dir.path(), 1024);
    let map = repo_map
        .get_repo_map(
            &[],
            &paths(&["geom.h", "geom.c", "main.c"]),
            &HashSet::new(),
            &HashSet::new(),
        )
        .unwrap();
    assert!(map.contains("geom.c:"), "map was:\n{map}");
}
