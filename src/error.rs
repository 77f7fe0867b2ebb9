//! Error type for the build pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, ordering or rendering a site
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid front-matter in {path:?}: {message}")]
    FrontMatter { path: PathBuf, message: String },

    #[error("{count} item(s) tagged '{tag}' have no numeric index: {}", sources.join(", "))]
    MissingIndex {
        tag: String,
        count: usize,
        sources: Vec<String>,
    },

    #[error("{first} and {second} both write to {output}")]
    DuplicateOutput {
        output: String,
        first: String,
        second: String,
    },

    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("failed to load {} content file(s):\n{}", .0.len(), .0.join("\n"))]
    Content(Vec<String>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;
