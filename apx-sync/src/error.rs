//! Error types for apx-sync.

use std::path::PathBuf;

use thiserror::Error;

use apx_core::{CoreError, SourceKind};
use apx_installer::InstallError;

/// All errors that can abort a synchronization.
///
/// Every variant is fatal for the current `synchronize` call. Soft,
/// per-file fetch misses are reported through `UpdateReport`, not here.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Descriptor, cache or config failure from apx-core.
    #[error("{0}")]
    Core(#[from] CoreError),

    /// Installer invocation or post-install verification failure.
    #[error("{0}")]
    Install(#[from] InstallError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Non-200 status or unparseable body on a descriptor or listing fetch.
    #[error("protocol error from {url}: {reason}")]
    Protocol { url: String, reason: String },

    /// The remote descriptor is JSON but does not satisfy the schema.
    #[error("remote mod descriptor is malformed: {reason}")]
    MalformedDescriptor { reason: String },

    /// The request never produced an HTTP response.
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// The base version an update depends on could not be installed.
    #[error("{}", base_unrecoverable_message(.source_ref, .name, .version, .kind))]
    BaseUnrecoverable {
        source_ref: String,
        name: String,
        version: String,
        kind: SourceKind,
    },

    /// The connect target is not an http(s) URL with a host.
    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    /// Cancellation was requested while fetching update files.
    #[error("update of {name} {version} was cancelled; its directory may be partial")]
    Cancelled { name: String, version: String },
}

fn base_unrecoverable_message(
    source_ref: &str,
    name: &str,
    version: &str,
    kind: &SourceKind,
) -> String {
    match kind {
        SourceKind::Workshop => format!(
            "the mod base {name} {version} cannot be installed. Check \
             https://steamcommunity.com/sharedfiles/filedetails/?id={source_ref}"
        ),
        SourceKind::FileBased => format!(
            "the mod base {name} {version} cannot be installed. Check the mod source ({source_ref})."
        ),
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
