//! Which files an incremental build should cover.

use std::collections::BTreeSet;
use std::path::Path;

use codemap_core::CodemapError;
use git2::{Delta, DiffOptions, Repository};

/// Changed-file list entry that asks for a full build.
pub const FULL_BUILD_SENTINEL: &str = "-1";

/// Files to (re)build, relative to the repository root and `/`-separated.
///
/// # Examples
///
/// ```
/// use codemap_graph::changes::ChangeSet;
///
/// assert_eq!(ChangeSet::from_list(["-1"]), ChangeSet::Full);
/// assert_eq!(ChangeSet::from_list(Vec::<String>::new()), ChangeSet::Full);
///
/// let set = ChangeSet::from_list(["src/A.java", "./src/B.java"]);
/// assert!(set.includes("src/B.java"));
/// assert!(!set.includes("src/C.java"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSet {
    Full,
    Files(BTreeSet<String>),
}

impl ChangeSet {
    /// Build from an externally supplied list.
    ///
    /// An empty list, or one whose only entry is `-1`, means a full build.
    pub fn from_list<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let files: BTreeSet<String> = paths
            .into_iter()
            .map(|p| normalize(p.as_ref()))
            .filter(|p| !p.is_empty())
            .collect();

        if files.is_empty() || (files.len() == 1 && files.contains(FULL_BUILD_SENTINEL)) {
            ChangeSet::Full
        } else {
            ChangeSet::Files(files)
        }
    }

    /// Files touched by the commit at `HEAD`, compared with its first parent.
    ///
    /// A root commit, or a commit with an empty diff, yields [`ChangeSet::Full`].
    /// Deleted files are left out since there is nothing left to parse.
    ///
    /// # Errors
    ///
    /// Returns [`CodemapError::Git`] if the repository cannot be opened or
    /// `HEAD` cannot be resolved.
    pub fn from_last_commit(repo_path: &Path) -> Result<Self, CodemapError> {
        let repo = Repository::open(repo_path)
            .map_err(|e| CodemapError::Git(format!("failed to open repository: {e}")))?;
        let commit = repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .map_err(|e| CodemapError::Git(format!("failed to resolve HEAD: {e}")))?;

        if commit.parent_count() == 0 {
            log::info!("HEAD is a root commit, building the full graph");
            return Ok(ChangeSet::Full);
        }

        let commit_tree = commit
            .tree()
            .map_err(|e| CodemapError::Git(format!("failed to get commit tree: {e}")))?;
        let parent_tree = commit
            .parent(0)
            .and_then(|parent| parent.tree())
            .map_err(|e| CodemapError::Git(format!("failed to get parent tree: {e}")))?;

        let mut diff_opts = DiffOptions::new();
        let diff = repo
            .diff_tree_to_tree(Some(&parent_tree), Some(&commit_tree), Some(&mut diff_opts))
            .map_err(|e| CodemapError::Git(format!("failed to compute diff: {e}")))?;

        let files: Vec<String> = diff
            .deltas()
            .filter(|delta| delta.status() != Delta::Deleted)
            .filter_map(|delta| delta.new_file().path().map(|p| p.to_string_lossy().into_owned()))
            .collect();

        log::debug!("last commit touched {} files", files.len());
        Ok(Self::from_list(files))
    }

    pub fn is_full(&self) -> bool {
        matches!(self, ChangeSet::Full)
    }

    /// Whether `rel_path` (relative to the repository root) is covered.
    pub fn includes(&self, rel_path: &str) -> bool {
        match self {
            ChangeSet::Full => true,
            ChangeSet::Files(files) => files.contains(&normalize(rel_path)),
        }
    }
}

fn normalize(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    path.trim_start_matches("./").to_string()
}
