pub mod config;
pub mod connect;
pub mod remove_updates;
pub mod status;

use std::path::PathBuf;

use anyhow::{Context, Result};

use apx_core::{config as apx_config, ApxConfig};

use crate::GlobalArgs;

/// Persisted config with `--root` / `--workshop` applied on top.
pub fn effective_config(global: &GlobalArgs) -> Result<ApxConfig> {
    let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
    let mut config = apx_config::load_at(&home).context("failed to load apx config")?;
    if let Some(root) = &global.root {
        config.install_root = root.clone();
    }
    if let Some(workshop) = &global.workshop {
        config.workshop_root = workshop.clone();
    }
    Ok(config)
}
