//! Integration tests: source tree → code graph.

use std::fs;
use std::path::Path;

use codemap_core::{GraphConfig, OutputFormat};
use codemap_graph::builder::CodeGraphBuilder;
use codemap_graph::changes::ChangeSet;
use codemap_graph::model::{CodeNode, EdgeKind, NodeKind};
use codemap_graph::policy::DirectionPolicy;

const BANK: &str = "public class Bank {
    private Account account;

    public void transfer(int amount) {
        Account target = new Account();
        target.deposit(amount);
        log(amount);
    }

    private void log(int amount) {
        System.out.println(amount);
    }
}
";

const ACCOUNT: &str = "public class Account {
    private int balance;

    public void deposit(int amount) {
        balance += amount;
    }
}
";

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn bank_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "Bank.java", BANK);
    write(dir.path(), "Account.java", ACCOUNT);
    dir
}

fn has_edge(
    graph: &codemap_graph::graph::CodeGraph,
    from: &str,
    to: &str,
    kind: EdgeKind,
) -> bool {
    graph
        .edge_keys()
        .contains(&(from.to_string(), to.to_string(), kind))
}

#[test]
fn class_and_method_are_contained_by_their_file() {
    let dir = bank_repo();
    let graph = CodeGraphBuilder::new(dir.path()).build().unwrap();

    let class = graph.node("Bank.java:Bank").unwrap();
    assert_eq!(class.kind, NodeKind::Class);
    assert_eq!((class.start_line, class.end_line), (1, 13));

    let method = graph.node("Bank.java:Bank.transfer").unwrap();
    assert_eq!(method.kind, NodeKind::Function);
    assert_eq!(method.owning_class.as_deref(), Some("Bank.java:Bank"));
    assert_eq!(method.display_name, "transfer");
    assert_eq!((method.start_line, method.end_line), (4, 8));
    assert!(method.text.starts_with("public void transfer"));
    assert!(method.text.ends_with('}'));

    let file = graph.node("Bank.java").unwrap();
    assert_eq!(file.kind, NodeKind::File);
    assert_eq!(file.text, BANK);

    assert!(has_edge(&graph, "Bank.java", "Bank.java:Bank", EdgeKind::Contains));
    assert!(has_edge(
        &graph,
        "Bank.java",
        "Bank.java:Bank.transfer",
        EdgeKind::Contains
    ));
}

#[test]
fn references_follow_calls_and_class_usage() {
    let dir = bank_repo();
    let graph = CodeGraphBuilder::new(dir.path()).build().unwrap();

    let transfer = "Bank.java:Bank.transfer";
    assert!(has_edge(&graph, transfer, "Account.java:Account", EdgeKind::References));
    assert!(has_edge(
        &graph,
        transfer,
        "Account.java:Account.deposit",
        EdgeKind::References
    ));
    assert!(has_edge(&graph, transfer, "Bank.java:Bank.log", EdgeKind::References));
    // Field type outside any method: the file uses the class.
    assert!(has_edge(&graph, "Bank.java", "Account.java:Account", EdgeKind::References));
}

#[test]
fn file_level_calls_to_functions_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "lib.py", "def helper():\n    return 1\n");
    write(
        dir.path(),
        "app.py",
        "import lib\n\nhelper()\n\ndef main():\n    helper()\n",
    );
    let graph = CodeGraphBuilder::new(dir.path()).build().unwrap();

    assert!(has_edge(&graph, "app.py:main", "lib.py:helper", EdgeKind::References));
    assert!(!has_edge(&graph, "app.py", "lib.py:helper", EdgeKind::References));
}

#[test]
fn rust_array_return_types_keep_the_whole_body() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "lib.rs",
        "fn helper(x: u8) -> u8 {\n    x\n}\n\nfn digest(x: u8) -> [u8; 32] {\n    helper(x);\n    [0; 32]\n}\n",
    );
    let graph = CodeGraphBuilder::new(dir.path()).build().unwrap();

    let digest = graph.node("lib.rs:digest").unwrap();
    assert_eq!((digest.start_line, digest.end_line), (5, 8));
    assert!(digest.text.ends_with('}'));
    assert!(has_edge(
        &graph,
        "lib.rs:digest",
        "lib.rs:helper",
        EdgeKind::References
    ));
}

#[test]
fn full_build_is_stable() {
    let dir = bank_repo();
    let builder = CodeGraphBuilder::new(dir.path());
    let first = builder.build().unwrap();
    let second = builder.build().unwrap();

    assert_eq!(first.node_names(), second.node_names());
    assert_eq!(first.edge_keys(), second.edge_keys());
    assert_eq!(first.stats(), second.stats());
}

#[test]
fn sentinel_change_list_matches_full_build() {
    let dir = bank_repo();
    let builder = CodeGraphBuilder::new(dir.path());
    let full = builder.build().unwrap();
    let sentinel = builder
        .build_incremental(&ChangeSet::from_list(["-1"]))
        .unwrap();

    assert_eq!(full.node_names(), sentinel.node_names());
    assert_eq!(full.edge_keys(), sentinel.edge_keys());
}

#[test]
fn incremental_build_covers_only_changed_files() {
    let dir = bank_repo();
    let graph = CodeGraphBuilder::new(dir.path())
        .build_incremental(&ChangeSet::from_list(["Account.java"]))
        .unwrap();

    assert!(graph.contains("Account.java:Account.deposit"));
    assert!(!graph.contains("Bank.java"));
    assert!(has_edge(
        &graph,
        "Account.java",
        "Account.java:Account.deposit",
        EdgeKind::Contains
    ));
    assert!(!graph.stats().edges.contains_key(&EdgeKind::References));
}

#[test]
fn source_root_names_nodes_relative_to_it() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "src/Bank.java", BANK);
    write(dir.path(), "src/Account.java", ACCOUNT);
    write(dir.path(), "docs/notes.txt", "not source\n");

    let builder = CodeGraphBuilder::new(dir.path()).source_root("src");
    let graph = builder.build().unwrap();
    assert!(graph.contains("Bank.java:Bank.transfer"));
    assert!(!graph.contains("docs/notes.txt"));

    let changed = builder
        .build_incremental(&ChangeSet::from_list(["src/Bank.java"]))
        .unwrap();
    assert!(changed.contains("Bank.java"));
    assert!(!changed.contains("Account.java"));
}

#[test]
fn text_files_become_file_nodes_and_media_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "README.md", "# Bank\n");
    write(dir.path(), ".hidden/secret.py", "def x():\n    pass\n");
    fs::write(dir.path().join("logo.png"), [0x89, b'P', b'N', b'G', 0, 0]).unwrap();
    write(dir.path(), "data.custom", "plain text\n");

    let config = GraphConfig {
        exclude_extensions: vec!["custom".into()],
        ..GraphConfig::default()
    };
    let graph = CodeGraphBuilder::from_config(dir.path(), &config)
        .build()
        .unwrap();

    assert_eq!(graph.node_names().into_iter().collect::<Vec<_>>(), ["README.md"]);
}

struct NothingGoes;

impl DirectionPolicy for NothingGoes {
    fn allows(&self, _source: &CodeNode, _target: &CodeNode) -> bool {
        false
    }
}

#[test]
fn custom_policy_controls_references() {
    let dir = bank_repo();
    let graph = CodeGraphBuilder::new(dir.path())
        .policy(NothingGoes)
        .build()
        .unwrap();
    assert!(graph.edge_count() > 0);
    assert!(graph.edges().all(|(_, _, e)| e.kind == EdgeKind::Contains));
}

#[test]
fn generate_graph_formats() {
    let dir = bank_repo();
    let json = codemap_graph::generate_graph(
        dir.path(),
        &GraphConfig::default(),
        &ChangeSet::Full,
        OutputFormat::Json,
    )
    .unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let ids: Vec<&str> = value["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_str().unwrap())
        .collect();
    assert!(ids.iter().all(|id| id.len() == 64));

    let text = codemap_graph::generate_graph(
        dir.path(),
        &GraphConfig::default(),
        &ChangeSet::Full,
        OutputFormat::Text,
    )
    .unwrap();
    assert!(text.contains("Bank.java -[CONTAINS]-> Bank.java:Bank"));
}

#[test]
fn missing_root_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = CodeGraphBuilder::new(dir.path().join("nope")).build();
    assert!(matches!(
        result,
        Err(codemap_core::CodemapError::FileNotFound(_))
    ));
}
