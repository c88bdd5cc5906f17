//! Core types, configuration, and error handling for codemap.
//!
//! This crate provides the shared foundation used by the other codemap crates:
//! - [`CodemapError`]: unified error type using `thiserror`
//! - [`CodemapConfig`]: configuration loaded from `.codemap.toml`
//! - Shared types: [`OutputFormat`], [`TokenizerKind`]

mod config;
mod error;
mod types;

pub use config::{CodemapConfig, GraphConfig, MapConfig};
pub use error::CodemapError;
pub use types::{OutputFormat, TokenizerKind};

/// A convenience `Result` type for codemap operations.
pub type Result<T> = std::result::Result<T, CodemapError>;
