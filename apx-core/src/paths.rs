//! Path templates under the installation root and the workshop cache.
//!
//! All functions are pure; none of them touch the filesystem.

use std::path::{Component, Path, PathBuf};

use crate::types::{Category, ModIdentity, SourceRef};

/// File name of the persisted descriptor cache.
pub const CACHE_FILE: &str = "apx.json";

pub fn installed_dir(root: &Path) -> PathBuf {
    root.join("Installed")
}

/// `<root>/Installed/<category>/<name>/<version>`
pub fn component_dir(root: &Path, category: Category, name: &str, version: &str) -> PathBuf {
    installed_dir(root)
        .join(category.dir_name())
        .join(name)
        .join(version)
}

/// `<root>/Manifests/<name>_<version-without-dots>.mft`
pub fn manifest_path(root: &Path, identity: &ModIdentity) -> PathBuf {
    root.join("Manifests")
        .join(format!("{}.mft", identity.artifact_stem()))
}

/// `<root>/Installed/rFm/<name>_<version-without-dots>.mas`
pub fn rfm_package_path(root: &Path, identity: &ModIdentity) -> PathBuf {
    installed_dir(root)
        .join("rFm")
        .join(format!("{}.mas", identity.artifact_stem()))
}

/// `<root>/apx.json`
pub fn cache_path(root: &Path) -> PathBuf {
    root.join(CACHE_FILE)
}

/// `<workshop_root>/<source_ref>`
pub fn workshop_item_dir(workshop_root: &Path, source_ref: &SourceRef) -> PathBuf {
    workshop_root.join(&source_ref.0)
}

/// A single normal path component: no separators, no `.`/`..`, not empty.
///
/// Every name that gets joined under the installation root must pass this.
pub fn is_plain_component(name: &str) -> bool {
    if name.is_empty() || name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
