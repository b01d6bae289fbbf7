//! Connection orchestrator.
//!
//! `synchronize(target)`:
//! 1. Validate the target and fetch `<target>/mod`.
//! 2. Load the cached envelope. Same `(name, version)` → nothing to do.
//! 3. Otherwise remove the old mod's manifest and rFm package, reconcile
//!    the new descriptor, and only then persist it as the cache.
//! 4. Resolve the launch target from the target host and the served port.
//!
//! Any fatal error returns before the cache is written, so a re-run starts
//! from the last known-good state.

use std::fmt;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use apx_core::{paths, ApxConfig, DescriptorStore, ModDescriptor, ModIdentity};
use apx_installer::{Installer, PresenceOracle};

use crate::error::{io_err, SyncError};
use crate::reconcile::{plan, remove_update_dir, Action, ReconcileReport, Reconciler};
use crate::remote::{fetch_envelope, RemoteTarget};
use crate::transport::Transport;

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Compute the plan without installing, fetching, removing or persisting.
    pub dry_run: bool,
}

/// Game server address handed to the launcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchTarget {
    pub host: String,
    pub port: u16,
}

impl LaunchTarget {
    /// `host:port`
    pub fn connect_string(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `steam://run/<app_id>//+connect=host:port`
    pub fn steam_uri(&self, app_id: u32) -> String {
        format!("steam://run/{app_id}//+connect={}", self.connect_string())
    }
}

impl fmt::Display for LaunchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.connect_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    /// The cached mod identity matches the remote one.
    Unchanged,
    /// Dry run: what would be done.
    Planned { actions: Vec<Action> },
    /// The plan was applied and the cache replaced.
    Applied {
        removed_artifacts: Vec<PathBuf>,
        report: ReconcileReport,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub identity: ModIdentity,
    pub previous: Option<ModIdentity>,
    pub launch: LaunchTarget,
    pub status: SyncStatus,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Top-level driver wiring the remote, the cache and the reconciler.
pub struct Orchestrator<'a> {
    config: &'a ApxConfig,
    transport: &'a dyn Transport,
    installer: &'a dyn Installer,
    presence: &'a dyn PresenceOracle,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a ApxConfig,
        transport: &'a dyn Transport,
        installer: &'a dyn Installer,
        presence: &'a dyn PresenceOracle,
    ) -> Self {
        Self {
            config,
            transport,
            installer,
            presence,
        }
    }

    pub fn synchronize(
        &self,
        target: &str,
        options: SyncOptions,
        cancel: &CancellationToken,
    ) -> Result<SyncOutcome, SyncError> {
        let remote = RemoteTarget::parse(target)?;
        tracing::info!(target = %remote.as_url(), "attempting connect");

        let envelope = fetch_envelope(self.transport, &remote)?;
        let launch = LaunchTarget {
            host: remote.host().to_string(),
            port: envelope.port,
        };
        let identity = envelope.identity().clone();

        let store = DescriptorStore::new(&self.config.install_root);
        let cached = store.load()?;
        let previous = cached.as_ref().map(|c| c.identity().clone());

        if previous.as_ref() == Some(&identity) {
            tracing::info!(%identity, "mod is identical; nothing to do");
            return Ok(SyncOutcome {
                identity,
                previous,
                launch,
                status: SyncStatus::Unchanged,
            });
        }

        let old = cached.as_ref().map(|c| &c.descriptor);
        let actions = plan(old, &envelope.descriptor);
        if options.dry_run {
            return Ok(SyncOutcome {
                identity,
                previous,
                launch,
                status: SyncStatus::Planned { actions },
            });
        }

        let removed_artifacts = match &previous {
            Some(old_identity) => {
                tracing::info!(%old_identity, "previous mod differs; removing its artifacts");
                remove_stale_artifacts(&self.config.install_root, old_identity)?
            }
            None => Vec::new(),
        };

        if let Some(comp) = &envelope.descriptor.comp {
            tracing::info!(%comp, "found APX version");
        }
        let reconciler = Reconciler::new(self.config, self.installer, self.presence, self.transport);
        let report = reconciler.apply(&remote, &actions, cancel)?;

        store.save(&envelope)?;
        tracing::info!(%identity, "received mod contents");

        Ok(SyncOutcome {
            identity,
            previous,
            launch,
            status: SyncStatus::Applied {
                removed_artifacts,
                report,
            },
        })
    }
}

/// Remove the manifest and rFm package of a previously applied mod.
pub fn remove_stale_artifacts(
    install_root: &Path,
    identity: &ModIdentity,
) -> Result<Vec<PathBuf>, SyncError> {
    let mut removed = Vec::new();
    for path in [
        paths::manifest_path(install_root, identity),
        paths::rfm_package_path(install_root, identity),
    ] {
        if path.exists() {
            std::fs::remove_file(&path).map_err(|e| io_err(&path, e))?;
            tracing::info!(path = %path.display(), "removed stale mod artifact");
            removed.push(path);
        }
    }
    Ok(removed)
}

/// Remove every update-tier directory `descriptor` declares.
pub fn remove_updates(
    install_root: &Path,
    descriptor: &ModDescriptor,
) -> Result<Vec<PathBuf>, SyncError> {
    let mut removed = Vec::new();
    for c in descriptor.components().filter(|c| c.component.update) {
        if let Some(path) = remove_update_dir(
            install_root,
            c.category,
            &c.component.name,
            &c.component.version,
        )? {
            removed.push(path);
        }
    }
    Ok(removed)
}
