//! Pipeline error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::engine::EngineError;
use crate::rewriter::RewriteError;
use crate::scanner::ScanError;

/// Errors that can occur while processing literals.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] gqlweave_config::ConfigError),

    /// Working directory must be absolute
    #[error("working directory must be an absolute path: {0}")]
    RelativeWorkingDir(PathBuf),

    /// File system error with the offending path
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source could not be scanned
    #[error("failed to scan '{path}': {source}")]
    Scan {
        path: String,
        #[source]
        source: ScanError,
    },

    /// The generation engine rejected a literal
    #[error("type generation failed for literal in '{source_path}': {source}\n  literal: {literal}")]
    Generation {
        source_path: String,
        literal: String,
        #[source]
        source: EngineError,
    },

    /// Source could not be rewritten
    #[error("failed to rewrite '{path}': {source}")]
    Rewrite {
        path: String,
        #[source]
        source: RewriteError,
    },

    /// Cache could not be persisted
    #[error("failed to serialize literal cache: {0}")]
    CacheSerialize(#[from] serde_json::Error),
}

impl PipelineError {
    /// Create a new Io error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
