//! Process-backed [`Installer`] driving the game's package manager.
//!
//! Invocation: `<exe> -c<install_root> -q -i<package>`. The exit status is
//! logged but never interpreted; success is judged by a presence check.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::InstallError;

/// Installs a single content package.
pub trait Installer: Send + Sync {
    /// Run the installer against one package file. `name` and `version`
    /// identify the component the package belongs to.
    fn install(&self, package: &Path, name: &str, version: &str) -> Result<(), InstallError>;
}

/// Runs the external package manager executable in quiet mode.
#[derive(Debug, Clone)]
pub struct ModMgrInstaller {
    executable: PathBuf,
    install_root: PathBuf,
}

impl ModMgrInstaller {
    pub fn new(executable: impl Into<PathBuf>, install_root: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            install_root: install_root.into(),
        }
    }

    pub fn command_args(&self, package: &Path) -> Vec<String> {
        vec![
            format!("-c{}", self.install_root.display()),
            "-q".to_string(),
            format!("-i{}", package.display()),
        ]
    }
}

impl Installer for ModMgrInstaller {
    fn install(&self, package: &Path, name: &str, version: &str) -> Result<(), InstallError> {
        tracing::info!(component = name, version, package = %package.display(), "running installer");
        let status = Command::new(&self.executable)
            .args(self.command_args(package))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| InstallError::Spawn {
                program: self.executable.clone(),
                source: e,
            })?;
        tracing::debug!(component = name, %status, "installer exited");
        Ok(())
    }
}
