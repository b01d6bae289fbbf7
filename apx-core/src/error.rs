//! Error types for apx-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from descriptor, cache and config handling.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (write path) or a body that is not JSON at all.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error (config write path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The persisted descriptor cache exists but could not be parsed.
    #[error("failed to parse descriptor cache at {path}: {source}")]
    CacheParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The config file exists but could not be parsed.
    #[error("failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A descriptor document is valid JSON but does not match the schema
    /// (missing `cars` / `track`, wrong field types, ...).
    #[error("malformed mod descriptor: {reason}")]
    MalformedDescriptor { reason: String },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.apx/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// Convenience constructor for [`CoreError::Io`].
pub fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}
