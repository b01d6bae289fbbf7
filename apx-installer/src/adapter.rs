//! Installer adapter: invoke the installer over a source directory and
//! verify the outcome by presence.

use std::path::{Path, PathBuf};

use apx_core::Category;

use crate::error::{io_err, InstallError};
use crate::modmgr::Installer;
use crate::presence::PresenceOracle;

/// Pairs an [`Installer`] with a [`PresenceOracle`].
pub struct InstallerAdapter<'a> {
    installer: &'a dyn Installer,
    presence: &'a dyn PresenceOracle,
}

impl<'a> InstallerAdapter<'a> {
    pub fn new(installer: &'a dyn Installer, presence: &'a dyn PresenceOracle) -> Self {
        Self {
            installer,
            presence,
        }
    }

    /// Invoke the installer once per file directly under `source_dir`
    /// (non-recursive, sorted by name). Does not judge success.
    ///
    /// Returns the number of installer invocations.
    pub fn install_component(
        &self,
        source_dir: &Path,
        name: &str,
        version: &str,
    ) -> Result<usize, InstallError> {
        let packages = list_packages(source_dir)?;
        for package in &packages {
            self.installer.install(package, name, version)?;
        }
        Ok(packages.len())
    }

    /// `version` must be a bare base version.
    pub fn is_installed(&self, category: Category, name: &str, version: &str) -> bool {
        self.presence.exists(category, name, version)
    }

    /// Install from `source_dir`, then require `<category>/<name>/<base_version>`
    /// to be present.
    ///
    /// `install_version` is passed through to the installer and may be the
    /// modifier-qualified version; the check always targets `base_version`.
    pub fn install_and_verify(
        &self,
        category: Category,
        source_dir: &Path,
        name: &str,
        install_version: &str,
        base_version: &str,
    ) -> Result<usize, InstallError> {
        let invocations = self.install_component(source_dir, name, install_version)?;
        if !self.is_installed(category, name, base_version) {
            return Err(InstallError::VerificationFailed {
                name: name.to_string(),
                version: base_version.to_string(),
            });
        }
        tracing::info!(component = name, version = base_version, "component installed");
        Ok(invocations)
    }
}

fn list_packages(source_dir: &Path) -> Result<Vec<PathBuf>, InstallError> {
    let entries = std::fs::read_dir(source_dir).map_err(|e| io_err(source_dir, e))?;
    let mut packages = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(source_dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| io_err(&path, e))?;
        if file_type.is_file() {
            packages.push(path);
        }
    }
    packages.sort();
    Ok(packages)
}
