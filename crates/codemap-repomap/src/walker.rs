use std::path::{Path, PathBuf};

use codemap_core::CodemapError;

/// Maximum file size to process (1 MB).
const MAX_FILE_SIZE: u64 = 1_048_576;

/// Number of bytes to check for binary detection.
const BINARY_CHECK_SIZE: usize = 8192;

/// Number of leading bytes sniffed when an extension is not recognised.
const TEXT_SNIFF_SIZE: usize = 1024;

/// Extensions that are never text, regardless of content.
const BINARY_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "bmp", "tiff", "webp", "ico", "svg", "mp4", "avi", "mov", "wmv",
    "flv", "mp3", "wav", "zip", "gz", "tar", "jar", "class", "so", "dll", "exe", "pdf", "ipynb",
];

/// Extensions that are always treated as text.
const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "rst", "json", "yaml", "yml", "toml", "xml", "html", "css", "scss", "sql", "sh",
    "bash", "properties", "gradle", "cfg", "ini", "csv",
];

/// A source file discovered during repository walking.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use codemap_repomap::walker::{Language, SourceFile};
///
/// let file = SourceFile {
///     path: PathBuf::from("src/main.rs"),
///     abs_path: PathBuf::from("/repo/src/main.rs"),
///     language: Language::Rust,
///     content: "fn main() {}".to_string(),
/// };
/// assert_eq!(file.language, Language::Rust);
/// assert_eq!(file.rel_name(), "src/main.rs");
/// ```
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the repository root.
    pub path: PathBuf,
    /// Absolute (or caller-supplied) path used for reading.
    pub abs_path: PathBuf,
    /// Detected programming language.
    pub language: Language,
    /// Full file content.
    pub content: String,
}

impl SourceFile {
    /// Load `abs_path`, recording it under `rel_path`.
    ///
    /// Returns `None` when the file is unreadable, binary, or larger than 1 MB.
    pub fn load(abs_path: &Path, rel_path: &Path) -> Option<Self> {
        let content = read_source(abs_path)?;
        Some(Self {
            path: rel_path.to_path_buf(),
            abs_path: abs_path.to_path_buf(),
            language: Language::from_path(abs_path),
            content,
        })
    }

    /// Relative path rendered with forward slashes.
    pub fn rel_name(&self) -> String {
        rel_name(&self.path)
    }
}

/// Render a relative path with `/` separators on every platform.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use codemap_repomap::walker::rel_name;
///
/// assert_eq!(rel_name(Path::new("src/lib.rs")), "src/lib.rs");
/// ```
pub fn rel_name(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Programming language detected from file extension.
///
/// # Examples
///
/// ```
/// use codemap_repomap::walker::Language;
///
/// assert_eq!(Language::from_extension("rs"), Language::Rust);
/// assert_eq!(Language::from_extension("py"), Language::Python);
/// assert_eq!(Language::from_extension("java"), Language::Java);
/// assert_eq!(Language::from_extension("c"), Language::C);
/// assert_eq!(Language::from_extension("cpp"), Language::Cpp);
/// assert_eq!(Language::from_extension("rb"), Language::Ruby);
/// assert_eq!(Language::from_extension("txt"), Language::Unknown);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Language {
    Rust,
    Python,
    TypeScript,
    JavaScript,
    Go,
    Java,
    C,
    Cpp,
    Ruby,
    Unknown,
}

impl Language {
    /// Every language with a grammar, in table order.
    pub const SUPPORTED: [Language; 9] = [
        Language::Rust,
        Language::Python,
        Language::TypeScript,
        Language::JavaScript,
        Language::Go,
        Language::Java,
        Language::C,
        Language::Cpp,
        Language::Ruby,
    ];

    /// Detect language from a file extension string (without the dot).
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "rs" => Language::Rust,
            "py" => Language::Python,
            "ts" | "tsx" => Language::TypeScript,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "go" => Language::Go,
            "java" => Language::Java,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hxx" | "hh" => Language::Cpp,
            "rb" => Language::Ruby,
            _ => Language::Unknown,
        }
    }

    /// Detect language from a path's extension.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::Path;
    /// use codemap_repomap::walker::Language;
    ///
    /// assert_eq!(Language::from_path(Path::new("a/b/Bank.java")), Language::Java);
    /// assert_eq!(Language::from_path(Path::new("Makefile")), Language::Unknown);
    /// ```
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Language::from_extension)
            .unwrap_or(Language::Unknown)
    }

    /// Short lowercase name, as used in logs and JSON output.
    pub fn name(&self) -> &'static str {
        match self {
            Language::Rust => "rust",
            Language::Python => "python",
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Go => "go",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Ruby => "ruby",
            Language::Unknown => "unknown",
        }
    }

    /// Get the tree-sitter language grammar for this language.
    ///
    /// Returns `None` for `Language::Unknown`.
    pub fn tree_sitter_language(&self) -> Option<tree_sitter::Language> {
        match self {
            Language::Rust => Some(tree_sitter_rust::LANGUAGE.into()),
            Language::Python => Some(tree_sitter_python::LANGUAGE.into()),
            Language::TypeScript => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            Language::JavaScript => Some(tree_sitter_javascript::LANGUAGE.into()),
            Language::Go => Some(tree_sitter_go::LANGUAGE.into()),
            Language::Java => Some(tree_sitter_java::LANGUAGE.into()),
            Language::C => Some(tree_sitter_c::LANGUAGE.into()),
            Language::Cpp => Some(tree_sitter_cpp::LANGUAGE.into()),
            Language::Ruby => Some(tree_sitter_ruby::LANGUAGE.into()),
            Language::Unknown => None,
        }
    }

    /// Parse `source` with this language's grammar.
    ///
    /// Returns `None` for unknown languages or when the parser gives up.
    pub fn parse(&self, source: &str) -> Option<tree_sitter::Tree> {
        let grammar = self.tree_sitter_language()?;
        let mut parser = tree_sitter::Parser::new();
        if let Err(e) = parser.set_language(&grammar) {
            log::warn!("failed to load {} grammar: {e}", self.name());
            return None;
        }
        parser.parse(source, None)
    }
}

/// Read a file as UTF-8 text, skipping binary and oversized files.
pub fn read_source(path: &Path) -> Option<String> {
    let metadata = std::fs::metadata(path).ok()?;
    if metadata.len() > MAX_FILE_SIZE {
        log::debug!("skipping {}: larger than 1 MB", path.display());
        return None;
    }
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            log::debug!("skipping {}: {e}", path.display());
            return None;
        }
    };

    let check_len = content.len().min(BINARY_CHECK_SIZE);
    if content.as_bytes()[..check_len].contains(&0) {
        return None;
    }
    Some(content)
}

/// Decide whether `path` holds text worth indexing.
///
/// Known media and archive extensions (plus `extra_excluded`) are rejected
/// outright. Source and common text extensions are accepted. Anything else is
/// accepted only if its first kilobyte decodes as UTF-8 with no NUL bytes.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use codemap_repomap::walker::is_text_file;
///
/// assert!(!is_text_file(Path::new("logo.png"), &[]));
/// ```
pub fn is_text_file(path: &Path, extra_excluded: &[String]) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    if let Some(ext) = ext.as_deref() {
        if BINARY_EXTENSIONS.contains(&ext)
            || extra_excluded.iter().any(|x| x.eq_ignore_ascii_case(ext))
        {
            return false;
        }
        if Language::from_extension(ext) != Language::Unknown || TEXT_EXTENSIONS.contains(&ext) {
            return true;
        }
    }

    sniff_text(path)
}

fn sniff_text(path: &Path) -> bool {
    use std::io::Read;

    let Ok(file) = std::fs::File::open(path) else {
        return false;
    };
    let mut head = Vec::with_capacity(TEXT_SNIFF_SIZE);
    if file
        .take(TEXT_SNIFF_SIZE as u64)
        .read_to_end(&mut head)
        .is_err()
    {
        return false;
    }
    if head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(&head) {
        Ok(_) => true,
        // A multi-byte character cut at the sniff boundary is still text.
        Err(e) => e.error_len().is_none(),
    }
}

fn build_walker(root: &Path) -> Result<ignore::Walk, CodemapError> {
    if !root.is_dir() {
        return Err(CodemapError::FileNotFound(root.to_path_buf()));
    }
    Ok(ignore::WalkBuilder::new(root)
        .sort_by_file_name(|a, b| a.cmp(b))
        .build())
}

/// Walk a repository, respecting `.gitignore`, returning parseable source files.
///
/// Skips binary files, files larger than 1 MB, and files with unknown extensions.
/// Returned paths are relative to `root`, in a stable order.
///
/// # Errors
///
/// Returns [`CodemapError::FileNotFound`] if `root` is not a directory.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use codemap_repomap::walker::walk_repo;
///
/// let files = walk_repo(Path::new(".")).unwrap();
/// for f in &files {
///     println!("{}: {:?}", f.path.display(), f.language);
/// }
/// ```
pub fn walk_repo(root: &Path) -> Result<Vec<SourceFile>, CodemapError> {
    let mut files = Vec::new();

    for path in walk_paths(root)? {
        if Language::from_path(&path) == Language::Unknown {
            continue;
        }
        let relative = match path.strip_prefix(root) {
            Ok(r) => r.to_path_buf(),
            Err(_) => path.clone(),
        };
        if let Some(file) = SourceFile::load(&path, &relative) {
            files.push(file);
        }
    }

    Ok(files)
}

/// Walk a repository returning every text file, whatever its language.
///
/// Hidden entries and `.gitignore`d paths are skipped; see [`is_text_file`]
/// for the text test. Returned paths are joined onto `root`.
///
/// # Errors
///
/// Returns [`CodemapError::FileNotFound`] if `root` is not a directory.
pub fn walk_text_files(root: &Path, extra_excluded: &[String]) -> Result<Vec<PathBuf>, CodemapError> {
    Ok(walk_paths(root)?
        .into_iter()
        .filter(|p| is_text_file(p, extra_excluded))
        .collect())
}

fn walk_paths(root: &Path) -> Result<Vec<PathBuf>, CodemapError> {
    let mut paths = Vec::new();
    for entry in build_walker(root)? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::debug!("walk error: {e}");
                continue;
            }
        };
        let Some(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_file() {
            paths.push(entry.into_path());
        }
    }
    Ok(paths)
}
