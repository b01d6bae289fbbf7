//! Descriptor store: the last successfully applied `/mod` envelope.
//!
//! Persists a [`ModEnvelope`] JSON document at `<install_root>/apx.json`.
//! Writes go to `apx.json.tmp` and are renamed into place, so the cache is
//! either the previous document or the new one, never a partial write.

use std::path::{Path, PathBuf};

use crate::error::{io_err, CoreError};
use crate::paths;
use crate::types::ModEnvelope;

/// Owner of the persisted descriptor cache.
#[derive(Debug, Clone)]
pub struct DescriptorStore {
    path: PathBuf,
}

impl DescriptorStore {
    /// Store rooted at an installation root.
    pub fn new(install_root: &Path) -> Self {
        Self {
            path: paths::cache_path(install_root),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the cached envelope.
    ///
    /// Returns `None` if no cache exists yet. A cache that exists but does not
    /// parse is an error, never "no cache".
    pub fn load(&self) -> Result<Option<ModEnvelope>, CoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path).map_err(|e| io_err(&self.path, e))?;
        let value = serde_json::from_str(&contents).map_err(|e| CoreError::CacheParse {
            path: self.path.clone(),
            source: e,
        })?;
        ModEnvelope::from_value(value).map(Some)
    }

    /// Replace the cached envelope atomically.
    pub fn save(&self, envelope: &ModEnvelope) -> Result<(), CoreError> {
        let Some(dir) = self.path.parent() else {
            return Err(io_err(
                &self.path,
                std::io::Error::other("invalid descriptor cache path"),
            ));
        };
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

        let json = serde_json::to_string_pretty(envelope)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(&self.path, e));
        }
        Ok(())
    }
}
