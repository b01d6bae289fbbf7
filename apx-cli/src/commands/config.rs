//! `apx config show|set-root|set-workshop`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;

use apx_core::config as apx_config;

use crate::GlobalArgs;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration, overrides applied.
    Show,

    /// Persist the rFactor 2 installation root.
    SetRoot { path: PathBuf },

    /// Persist the Steam workshop content directory.
    SetWorkshop { path: PathBuf },
}

pub fn run(cmd: ConfigCommand, global: &GlobalArgs) -> Result<()> {
    match cmd {
        ConfigCommand::Show => show(global),
        ConfigCommand::SetRoot { path } => update(|c| c.install_root = path),
        ConfigCommand::SetWorkshop { path } => update(|c| c.workshop_root = path),
    }
}

fn show(global: &GlobalArgs) -> Result<()> {
    let config = super::effective_config(global)?;
    println!("install_root:  {}", config.install_root.display());
    println!("workshop_root: {}", config.workshop_root.display());
    println!("installer:     {}", config.installer_path().display());
    println!("apx_suffix:    {}", config.apx_suffix);
    println!("steam_app_id:  {}", config.steam_app_id);
    println!("fetch_workers: {}", config.workers());
    Ok(())
}

/// Apply `edit` to the persisted file; command-line overrides are not saved.
fn update(edit: impl FnOnce(&mut apx_config::ApxConfig)) -> Result<()> {
    let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
    let mut config = apx_config::load_at(&home).context("failed to load apx config")?;
    edit(&mut config);
    apx_config::save_at(&home, &config).context("failed to save apx config")?;
    println!("✓ saved {}", apx_config::config_path_at(&home).display());
    Ok(())
}
