use std::path::PathBuf;

use thiserror::Error;

/// Error surface for installer invocation and post-install verification.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("failed to launch installer {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The presence check after installation did not find the component.
    #[error("installation failed: {name} {version} is not present after running the installer")]
    VerificationFailed { name: String, version: String },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> InstallError {
    InstallError::Io {
        path: path.into(),
        source,
    }
}
