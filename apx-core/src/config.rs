//! User configuration at `<home>/.apx/config.yaml`.
//!
//! Like every other persisted file, the config is written via a `.tmp`
//! sibling and renamed into place. Missing files load as defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};

pub const DEFAULT_APX_SUFFIX: &str = ".9apx";
pub const DEFAULT_STEAM_APP_ID: u32 = 365960;
pub const DEFAULT_FETCH_WORKERS: usize = 4;

/// Paths and tunables injected into every component at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApxConfig {
    /// rFactor 2 installation root.
    pub install_root: PathBuf,
    /// Steam workshop content directory for the game.
    pub workshop_root: PathBuf,
    /// Explicit installer executable; defaults to `<install_root>/Bin64/ModMgr.exe`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub installer: Option<PathBuf>,
    /// Version modifier marking derived builds of a base version.
    pub apx_suffix: String,
    pub steam_app_id: u32,
    /// Upper bound on concurrent file fetches per update.
    pub fetch_workers: usize,
}

impl Default for ApxConfig {
    fn default() -> Self {
        let steamapps = PathBuf::from(r"C:\Program Files (x86)\Steam\steamapps");
        Self {
            install_root: steamapps.join("common").join("rFactor 2"),
            workshop_root: steamapps
                .join("workshop")
                .join("content")
                .join(DEFAULT_STEAM_APP_ID.to_string()),
            installer: None,
            apx_suffix: DEFAULT_APX_SUFFIX.to_string(),
            steam_app_id: DEFAULT_STEAM_APP_ID,
            fetch_workers: DEFAULT_FETCH_WORKERS,
        }
    }
}

impl ApxConfig {
    pub fn installer_path(&self) -> PathBuf {
        self.installer
            .clone()
            .unwrap_or_else(|| self.install_root.join("Bin64").join("ModMgr.exe"))
    }

    pub fn workers(&self) -> usize {
        self.fetch_workers.max(1)
    }
}

/// `<home>/.apx/config.yaml`: pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".apx").join("config.yaml")
}

/// Load the config, falling back to defaults if the file does not exist.
pub fn load_at(home: &Path) -> Result<ApxConfig, CoreError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(ApxConfig::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    serde_yaml::from_str(&contents).map_err(|e| CoreError::ConfigParse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<ApxConfig, CoreError> {
    load_at(&home()?)
}

/// Save the config atomically.
pub fn save_at(home: &Path, config: &ApxConfig) -> Result<(), CoreError> {
    let path = config_path_at(home);
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid config path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let yaml = serde_yaml::to_string(config)?;
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(config: &ApxConfig) -> Result<(), CoreError> {
    save_at(&home()?, config)
}

pub fn home() -> Result<PathBuf, CoreError> {
    dirs::home_dir().ok_or(CoreError::HomeNotFound)
}
