//! Repository structure mapping via tree-sitter tags and PageRank ranking.
//!
//! Extracts definition and reference tags from source files, links files
//! through the identifiers they share, ranks definitions with personalized
//! PageRank, and renders the most important lines of the most important files
//! into a map that fits a token budget.

pub mod budget;
pub mod graph;
pub mod output;
pub mod pagerank;
pub mod queries;
pub mod ranking;
pub mod render;
pub mod tags;
pub mod tokens;
pub mod walker;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use codemap_core::{CodemapError, MapConfig, OutputFormat};
use rayon::prelude::*;

use crate::budget::{fit_to_budget, RenderedMap};
use crate::graph::{personalization, ReferenceGraph};
use crate::ranking::{order_entries, RankedEntry};
use crate::render::TreeRenderer;
use crate::tags::{extract_tags, Tag};
use crate::tokens::TokenCounter;
use crate::walker::{rel_name, SourceFile};

/// Context window reserved for everything except the map.
const CONTEXT_PADDING: usize = 4096;

/// A rendered map together with the ranked list it was cut from.
#[derive(Debug, Clone)]
pub struct RankedMap {
    pub map: RenderedMap,
    pub entries: Vec<RankedEntry>,
}

/// Builds ranked repo maps for one repository.
///
/// Holds the render cache and the set of already-warned paths, so repeated
/// calls on the same instance reuse rendered fragments and warn about a
/// missing file only once. A `ResourceExhausted` failure disables the
/// instance: later calls return `None` straight away.
///
/// # Examples
///
/// ```no_run
/// use std::collections::HashSet;
/// use std::path::PathBuf;
/// use codemap_core::MapConfig;
/// use codemap_repomap::RepoMap;
///
/// let mut repo_map = RepoMap::new(PathBuf::from("."), MapConfig::default()).unwrap();
/// let others = vec![PathBuf::from("src/lib.rs"), PathBuf::from("src/main.rs")];
/// if let Some(map) = repo_map.get_repo_map(&[], &others, &HashSet::new(), &HashSet::new()) {
///     println!("{map}");
/// }
/// ```
pub struct RepoMap {
    root: PathBuf,
    config: MapConfig,
    counter: Box<dyn TokenCounter>,
    renderer: TreeRenderer,
    warned_files: HashSet<PathBuf>,
    verbose: bool,
}

impl RepoMap {
    /// Create a map builder using the counter selected in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`CodemapError::Config`] if the tokenizer cannot be loaded.
    pub fn new(root: PathBuf, config: MapConfig) -> Result<Self, CodemapError> {
        let counter = tokens::counter_for(config.tokenizer)?;
        Ok(Self::with_counter(root, config, counter))
    }

    /// Create a map builder with a caller-supplied token counter.
    pub fn with_counter(root: PathBuf, config: MapConfig, counter: Box<dyn TokenCounter>) -> Self {
        let renderer = TreeRenderer::new(config.max_line_width);
        Self {
            root,
            config,
            counter,
            renderer,
            warned_files: HashSet::new(),
            verbose: false,
        }
    }

    /// Log the size of every produced map.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Current token budget; zero once mapping has been disabled.
    pub fn max_tokens(&self) -> usize {
        self.config.max_tokens
    }

    pub fn renderer(&self) -> &TreeRenderer {
        &self.renderer
    }

    /// Produce the repo map text, or `None` when there is nothing to show.
    ///
    /// Returns `None` when the budget is zero, `other_files` is empty, or no
    /// rendering fits. Failures are logged, never returned: running out of
    /// resources disables the map for the rest of this instance's life.
    pub fn get_repo_map(
        &mut self,
        chat_files: &[PathBuf],
        other_files: &[PathBuf],
        mentioned_files: &HashSet<String>,
        mentioned_idents: &HashSet<String>,
    ) -> Option<String> {
        let ranked = self.get_ranked_map(chat_files, other_files, mentioned_files, mentioned_idents)?;
        let prefix = self.content_prefix(!chat_files.is_empty());
        Some(output::format_text(&ranked.map, prefix.as_deref()))
    }

    /// Like [`get_repo_map`](Self::get_repo_map), but keep the ranked list
    /// and token count alongside the text.
    pub fn get_ranked_map(
        &mut self,
        chat_files: &[PathBuf],
        other_files: &[PathBuf],
        mentioned_files: &HashSet<String>,
        mentioned_idents: &HashSet<String>,
    ) -> Option<RankedMap> {
        if self.config.max_tokens == 0 || other_files.is_empty() {
            return None;
        }
        let budget = self.effective_budget(!chat_files.is_empty());
        let chat = self.rel_names(chat_files);

        let result =
            match self.ranked_entries(chat_files, other_files, mentioned_files, mentioned_idents) {
                Ok(entries) => fit_to_budget(
                    &entries,
                    &chat,
                    budget,
                    self.counter.as_ref(),
                    &mut self.renderer,
                )
                .map(|map| map.map(|map| RankedMap { map, entries })),
                Err(e) => Err(e),
            };

        match result {
            Ok(Some(ranked)) if !ranked.map.text.is_empty() => {
                if self.verbose {
                    log::info!(
                        "Repo-map: {:.1} k-tokens",
                        ranked.map.tokens as f64 / 1024.0
                    );
                }
                Some(ranked)
            }
            Ok(_) => None,
            Err(CodemapError::ResourceExhausted(reason)) => {
                log::error!("Disabling repo map, repository too large? ({reason})");
                self.config.max_tokens = 0;
                None
            }
            Err(e) => {
                log::warn!("repo map failed: {e}");
                None
            }
        }
    }

    /// Compute the full ranked list for the given files.
    ///
    /// # Errors
    ///
    /// Returns [`CodemapError::ResourceExhausted`] when more than
    /// `max_files` candidate files are supplied.
    pub fn ranked_entries(
        &mut self,
        chat_files: &[PathBuf],
        other_files: &[PathBuf],
        mentioned_files: &HashSet<String>,
        mentioned_idents: &HashSet<String>,
    ) -> Result<Vec<RankedEntry>, CodemapError> {
        let chat = self.rel_names(chat_files);

        // Keyed by relative name for a stable, de-duplicated order.
        let mut candidates: BTreeMap<String, PathBuf> = BTreeMap::new();
        for path in chat_files.iter().chain(other_files) {
            let abs = self.abs_path(path);
            candidates.insert(self.rel_name(&abs), abs);
        }
        if candidates.len() > self.config.max_files {
            return Err(CodemapError::ResourceExhausted(format!(
                "{} candidate files exceed the limit of {}",
                candidates.len(),
                self.config.max_files
            )));
        }

        let candidates: Vec<(String, PathBuf)> = candidates
            .into_iter()
            .filter(|(_, abs)| self.check_regular_file(abs))
            .collect();

        let per_file: Vec<Vec<Tag>> = candidates
            .par_iter()
            .map(|(rel, abs)| {
                SourceFile::load(abs, Path::new(rel))
                    .map(|file| extract_tags(&file))
                    .unwrap_or_default()
            })
            .collect();
        let tags: Vec<Tag> = per_file.into_iter().flatten().collect();
        log::debug!("{} tags from {} files", tags.len(), candidates.len());

        let (graph, symbols) = ReferenceGraph::build(&tags, mentioned_idents);

        let all_files: Vec<String> = candidates.iter().map(|(rel, _)| rel.clone()).collect();
        let boosted: HashSet<String> = all_files
            .iter()
            .filter(|rel| chat.contains(*rel) || mentioned_files.contains(*rel))
            .cloned()
            .collect();
        let weights = personalization(&all_files, &boosted);

        let (ranks, scores) = rank_definitions(&graph, &weights);

        let valid: HashSet<&str> = all_files.iter().map(String::as_str).collect();
        let mut others: Vec<String> = other_files
            .iter()
            .map(|p| self.rel_name(&self.abs_path(p)))
            .filter(|rel| valid.contains(rel.as_str()))
            .collect();
        others.sort();
        others.dedup();

        Ok(order_entries(&scores, &ranks, &symbols, &chat, &others))
    }

    fn effective_budget(&self, has_chat_files: bool) -> usize {
        let max_tokens = self.config.max_tokens;
        match self.config.max_context_window {
            Some(window) if !has_chat_files && max_tokens > 0 => {
                let target = max_tokens
                    .saturating_mul(self.config.map_mul_no_files)
                    .min(window.saturating_sub(CONTEXT_PADDING));
                if target > 0 {
                    target
                } else {
                    max_tokens
                }
            }
            _ => max_tokens,
        }
    }

    fn content_prefix(&self, has_chat_files: bool) -> Option<String> {
        let other = if has_chat_files { "other " } else { "" };
        self.config
            .repo_content_prefix
            .as_ref()
            .map(|p| p.replace("{other}", other))
    }

    fn check_regular_file(&mut self, abs: &Path) -> bool {
        if abs.is_file() {
            return true;
        }
        if self.warned_files.insert(abs.to_path_buf()) {
            if abs.exists() {
                log::warn!(
                    "Repo-map can't include {}: not a normal file",
                    abs.display()
                );
            } else {
                log::warn!(
                    "Repo-map can't include {}: it no longer exists",
                    abs.display()
                );
            }
        }
        false
    }

    fn abs_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn rel_name(&self, abs: &Path) -> String {
        match abs.strip_prefix(&self.root) {
            Ok(rel) => rel_name(rel),
            Err(_) => rel_name(abs),
        }
    }

    fn rel_names(&self, paths: &[PathBuf]) -> HashSet<String> {
        paths
            .iter()
            .map(|p| self.rel_name(&self.abs_path(p)))
            .collect()
    }
}

/// Files and hints for one map request.
#[derive(Debug, Clone, Default)]
pub struct MapRequest {
    /// Files the caller already shows in full.
    pub chat_files: Vec<PathBuf>,
    /// Candidates for the map; `None` means every walked source file not in chat.
    pub other_files: Option<Vec<PathBuf>>,
    pub mentioned_files: HashSet<String>,
    pub mentioned_idents: HashSet<String>,
    /// Log the size of the produced map.
    pub verbose: bool,
}

/// File ranks and per-definition scores. Both are empty when ranking fails,
/// so every candidate is listed as a bare file.
fn rank_definitions(
    graph: &ReferenceGraph,
    weights: &HashMap<String, f64>,
) -> (HashMap<String, f64>, HashMap<(String, String), f64>) {
    match pagerank::pagerank(graph, weights) {
        Ok(ranks) => {
            let scores = pagerank::distribute(graph, &ranks);
            (ranks, scores)
        }
        Err(e) => {
            log::debug!("no ranking available: {e}");
            (HashMap::new(), HashMap::new())
        }
    }
}

/// Generate a ranked map of the codebase at `root`.
///
/// Walks the repository; every source file not listed in `chat_files` is a
/// candidate for the map. Returns an empty string when no map fits.
///
/// # Errors
///
/// Returns [`CodemapError`] if the root cannot be walked, the tokenizer
/// cannot be loaded, or JSON serialization fails.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use codemap_core::{MapConfig, OutputFormat};
/// use codemap_repomap::generate_map;
///
/// let map = generate_map(Path::new("."), &MapConfig::default(), &[], OutputFormat::Text).unwrap();
/// println!("{map}");
/// ```
pub fn generate_map(
    root: &Path,
    config: &MapConfig,
    chat_files: &[PathBuf],
    format: OutputFormat,
) -> Result<String, CodemapError> {
    let request = MapRequest {
        chat_files: chat_files.to_vec(),
        ..MapRequest::default()
    };
    render_map(root, config, &request, format)
}

/// Generate a ranked map for an explicit request.
///
/// # Errors
///
/// Same as [`generate_map`].
pub fn render_map(
    root: &Path,
    config: &MapConfig,
    request: &MapRequest,
    format: OutputFormat,
) -> Result<String, CodemapError> {
    let mut repo_map = RepoMap::new(root.to_path_buf(), config.clone())?.verbose(request.verbose);
    let chat_files = &request.chat_files;

    let others: Vec<PathBuf> = match &request.other_files {
        Some(files) => files.clone(),
        None => {
            let chat = repo_map.rel_names(chat_files);
            walker::walk_repo(root)?
                .into_iter()
                .filter(|f| !chat.contains(&f.rel_name()))
                .map(|f| f.path)
                .collect()
        }
    };

    let Some(ranked) = repo_map.get_ranked_map(
        chat_files,
        &others,
        &request.mentioned_files,
        &request.mentioned_idents,
    ) else {
        return Ok(String::new());
    };

    match format {
        OutputFormat::Text => {
            let prefix = repo_map.content_prefix(!chat_files.is_empty());
            Ok(output::format_text(&ranked.map, prefix.as_deref()))
        }
        OutputFormat::Json => output::format_json(&ranked.map, &ranked.entries),
        OutputFormat::Markdown => Ok(output::format_markdown(&ranked.map)),
    }
}
