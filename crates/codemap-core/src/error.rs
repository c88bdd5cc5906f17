use std::path::PathBuf;

/// Errors that can occur across codemap.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary crate converts to a `miette` diagnostic at the boundary.
///
/// # Examples
///
/// ```
/// use codemap_core::CodemapError;
///
/// let err = CodemapError::Config("unknown tokenizer".into());
/// assert!(err.to_string().contains("unknown tokenizer"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CodemapError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git operation failure.
    #[error("git error: {0}")]
    Git(String),

    /// Source code parsing failure.
    #[error("parse error: {0}")]
    Parse(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The repository is too large or too deeply nested to map.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CodemapError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn config_error_displays_message() {
        let err = CodemapError::Config("bad value".into());
        assert_eq!(err.to_string(), "configuration error: bad value");
    }

    #[test]
    fn file_not_found_shows_path() {
        let err = CodemapError::FileNotFound(PathBuf::from("/tmp/missing.rs"));
        assert!(err.to_string().contains("/tmp/missing.rs"));
    }

    #[test]
    fn resource_exhausted_names_the_limit() {
        let err = CodemapError::ResourceExhausted("25000 files exceeds max_files 20000".into());
        assert_eq!(
            err.to_string(),
            "resource exhausted: 25000 files exceeds max_files 20000"
        );
    }
}
