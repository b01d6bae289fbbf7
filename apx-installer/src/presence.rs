//! Installed-state oracle.
//!
//! There is no installed-state record: a component is installed iff
//! `<root>/Installed/<category>/<name>/<version>` exists. Callers query at
//! decision time and never cache the answer.

use std::path::PathBuf;

use apx_core::{paths, Category};

/// Read-only view of what is installed.
pub trait PresenceOracle: Send + Sync {
    fn exists(&self, category: Category, name: &str, version: &str) -> bool;
}

/// [`PresenceOracle`] backed by the real installation tree.
#[derive(Debug, Clone)]
pub struct FsPresence {
    root: PathBuf,
}

impl FsPresence {
    pub fn new(install_root: impl Into<PathBuf>) -> Self {
        Self {
            root: install_root.into(),
        }
    }
}

impl PresenceOracle for FsPresence {
    fn exists(&self, category: Category, name: &str, version: &str) -> bool {
        let path = paths::component_dir(&self.root, category, name, version);
        let present = path.exists();
        tracing::debug!(path = %path.display(), present, "presence check");
        present
    }
}
