//! `apx remove-updates`: strip update tiers of the applied mod.

use anyhow::{Context, Result};
use clap::Args;

use apx_core::DescriptorStore;

use crate::GlobalArgs;

/// Arguments for `apx remove-updates`.
#[derive(Args, Debug)]
pub struct RemoveUpdatesArgs {}

impl RemoveUpdatesArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let config = super::effective_config(global)?;
        let store = DescriptorStore::new(&config.install_root);
        let Some(envelope) = store
            .load()
            .with_context(|| format!("failed to read {}", store.path().display()))?
        else {
            println!("No mod applied; nothing to remove.");
            return Ok(());
        };

        let removed = apx_sync::remove_updates(&config.install_root, &envelope.descriptor)
            .context("failed to remove update directories")?;
        if removed.is_empty() {
            println!("✓ '{}' has no installed updates", envelope.identity());
            return Ok(());
        }
        println!("✓ removed {} update(s) of '{}'", removed.len(), envelope.identity());
        for path in &removed {
            println!("  ✗  {}", path.display());
        }
        Ok(())
    }
}
