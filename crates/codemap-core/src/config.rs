use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CodemapError;
use crate::types::TokenizerKind;

/// Top-level configuration loaded from `.codemap.toml`.
///
/// Supports layered resolution: CLI flags > local config > defaults.
///
/// # Examples
///
/// ```
/// use codemap_core::CodemapConfig;
///
/// let config = CodemapConfig::default();
/// assert_eq!(config.map.max_tokens, 1024);
/// assert_eq!(config.graph.impl_suffix, "Impl");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodemapConfig {
    /// Repo map rendering settings.
    #[serde(default)]
    pub map: MapConfig,
    /// Whole-codebase graph settings.
    #[serde(default)]
    pub graph: GraphConfig,
}

impl CodemapConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CodemapError::Io`] if the file cannot be read, or
    /// [`CodemapError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use codemap_core::CodemapConfig;
    /// use std::path::Path;
    ///
    /// let config = CodemapConfig::from_file(Path::new(".codemap.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, CodemapError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`CodemapError::Toml`] if parsing fails, or
    /// [`CodemapError::Config`] if a value is out of range.
    ///
    /// # Examples
    ///
    /// ```
    /// use codemap_core::CodemapConfig;
    ///
    /// let toml = r#"
    /// [map]
    /// max_tokens = 2048
    /// "#;
    /// let config = CodemapConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.map.max_tokens, 2048);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, CodemapError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), CodemapError> {
        if self.map.max_line_width == 0 {
            return Err(CodemapError::Config(
                "map.max_line_width must be greater than zero".into(),
            ));
        }
        if self.map.map_mul_no_files == 0 {
            return Err(CodemapError::Config(
                "map.map_mul_no_files must be greater than zero".into(),
            ));
        }
        if self.graph.impl_suffix.is_empty() {
            return Err(CodemapError::Config(
                "graph.impl_suffix must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Repo map configuration.
///
/// # Examples
///
/// ```
/// use codemap_core::{MapConfig, TokenizerKind};
///
/// let config = MapConfig::default();
/// assert_eq!(config.max_tokens, 1024);
/// assert_eq!(config.map_mul_no_files, 8);
/// assert_eq!(config.tokenizer, TokenizerKind::Words);
/// assert_eq!(config.max_line_width, 100);
/// assert!(config.max_context_window.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    /// Token budget for the rendered map (default: 1024).
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
    /// Model context window; enables the enlarged map when no chat files exist.
    pub max_context_window: Option<usize>,
    /// Budget multiplier applied when no chat files exist (default: 8).
    #[serde(default = "default_map_mul_no_files")]
    pub map_mul_no_files: usize,
    /// Token counter used to measure candidate maps (default: words).
    #[serde(default)]
    pub tokenizer: TokenizerKind,
    /// Rendered lines are cut to this many characters (default: 100).
    #[serde(default = "default_max_line_width")]
    pub max_line_width: usize,
    /// Text placed before the map; `{other}` expands to `"other "` when chat files exist.
    pub repo_content_prefix: Option<String>,
    /// Candidate file count above which mapping is disabled (default: 20000).
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

fn default_max_tokens() -> usize {
    1024
}

fn default_map_mul_no_files() -> usize {
    8
}

fn default_max_line_width() -> usize {
    100
}

fn default_max_files() -> usize {
    20_000
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            max_context_window: None,
            map_mul_no_files: default_map_mul_no_files(),
            tokenizer: TokenizerKind::default(),
            max_line_width: default_max_line_width(),
            repo_content_prefix: None,
            max_files: default_max_files(),
        }
    }
}

/// Whole-codebase graph configuration.
///
/// # Examples
///
/// ```
/// use codemap_core::GraphConfig;
///
/// let config = GraphConfig::default();
/// assert!(config.source_root.is_none());
/// assert_eq!(config.impl_suffix, "Impl");
/// assert!(config.exclude_extensions.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Sub-directory of the repository to walk (default: repository root).
    pub source_root: Option<PathBuf>,
    /// Class-name suffix marking an interface implementation (default: `"Impl"`).
    #[serde(default = "default_impl_suffix")]
    pub impl_suffix: String,
    /// Extra file extensions to treat as binary and skip.
    #[serde(default)]
    pub exclude_extensions: Vec<String>,
}

fn default_impl_suffix() -> String {
    "Impl".into()
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            source_root: None,
            impl_suffix: default_impl_suffix(),
            exclude_extensions: Vec::new(),
        }
    }
}
