//! Whole-codebase graph of files, classes, interfaces and functions.
//!
//! Every text file becomes a FILE node; tree-sitter definitions inside it
//! become CLASS, INTERFACE and FUNCTION nodes linked by CONTAINS edges, and
//! references between them become REFERENCES edges filtered by a
//! [`policy::DirectionPolicy`]. Builds can be restricted to a change set for
//! merging into a previously stored graph.

pub mod builder;
pub mod changes;
pub mod export;
pub mod graph;
pub mod model;
pub mod policy;
pub mod span;

use std::path::Path;

use codemap_core::{CodemapError, GraphConfig, OutputFormat};

use crate::builder::CodeGraphBuilder;
use crate::changes::ChangeSet;

/// Build the graph for `changes` and format it.
///
/// # Errors
///
/// Returns an error if the source root is missing or serialization fails.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use codemap_core::{GraphConfig, OutputFormat};
/// use codemap_graph::changes::ChangeSet;
///
/// let out = codemap_graph::generate_graph(
///     Path::new("."),
///     &GraphConfig::default(),
///     &ChangeSet::Full,
///     OutputFormat::Text,
/// )
/// .unwrap();
/// println!("{out}");
/// ```
pub fn generate_graph(
    root: &Path,
    config: &GraphConfig,
    changes: &ChangeSet,
    format: OutputFormat,
) -> Result<String, CodemapError> {
    let graph = CodeGraphBuilder::from_config(root, config).build_incremental(changes)?;
    match format {
        OutputFormat::Text => Ok(export::to_text(&graph)),
        OutputFormat::Json => export::to_json(&graph),
        OutputFormat::Markdown => Ok(export::to_markdown(&graph)),
    }
}
