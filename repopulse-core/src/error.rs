//! Error types for repopulse-core

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the repopulse-core library
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// GitHub API error
    #[error("GitHub API error: {0}")]
    Github(String),

    /// No token available for authenticated GitHub requests
    #[error("GITHUB_TOKEN is required; export it or set github.token in the config file")]
    MissingToken,

    /// The cached repository list input file does not exist
    #[error("repository list not found: {0} (run the repository cache step first)")]
    RepoListNotFound(PathBuf),
}

/// Result type alias for repopulse-core
pub type Result<T> = std::result::Result<T, Error>;
