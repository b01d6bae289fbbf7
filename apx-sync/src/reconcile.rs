//! Component reconciler.
//!
//! [`plan`] is a pure function of the old and new descriptors. Installed
//! state is observed only while [`Reconciler::apply`] runs, at the moment
//! each decision is taken.
//!
//! Plan order:
//! 1. `RemoveUpdate` for every update layer of the old descriptor that the
//!    new descriptor no longer declares (cars, then track).
//! 2. Per component of the new descriptor, cars then track, in descriptor
//!    order: `EnsureBase` if `update` is false, else `ApplyUpdate`.

use std::fmt;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use apx_core::{paths, ApxConfig, Category, Component, ModDescriptor, SourceRef};
use apx_installer::{Installer, InstallerAdapter, PresenceOracle};

use crate::error::{io_err, SyncError};
use crate::remote::RemoteTarget;
use crate::transport::Transport;
use crate::update::{check_install_path, UpdateEngine, UpdateReport};

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// One step of a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Delete the update-tier directory of a layer that is no longer declared.
    RemoveUpdate {
        category: Category,
        name: String,
        version: String,
    },
    /// Make sure the base version is installed from the workshop cache.
    EnsureBase {
        category: Category,
        source_ref: SourceRef,
        component: Component,
    },
    /// Repair the base dependency if needed, then fetch the update files.
    ApplyUpdate {
        category: Category,
        source_ref: SourceRef,
        component: Component,
    },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::RemoveUpdate {
                category,
                name,
                version,
            } => write!(f, "remove update {category}/{name} {version}"),
            Action::EnsureBase {
                category,
                source_ref,
                component,
            } => write!(
                f,
                "ensure base {category}/{} {} (source {source_ref})",
                component.name, component.version
            ),
            Action::ApplyUpdate {
                category,
                source_ref,
                component,
            } => write!(
                f,
                "apply update {category}/{} {} (source {source_ref})",
                component.name, component.version
            ),
        }
    }
}

/// Compute the actions that bring the installation from `old` to `new`.
pub fn plan(old: Option<&ModDescriptor>, new: &ModDescriptor) -> Vec<Action> {
    let mut actions = Vec::new();

    if let Some(old) = old {
        for c in old.components().filter(|c| c.component.update) {
            if !new.declares_update(c.category, &c.component.name, &c.component.version) {
                actions.push(Action::RemoveUpdate {
                    category: c.category,
                    name: c.component.name.clone(),
                    version: c.component.version.clone(),
                });
            }
        }
    }

    for c in new.components() {
        let category = c.category;
        let source_ref = c.source_ref.clone();
        let component = c.component.clone();
        actions.push(if component.update {
            Action::ApplyUpdate {
                category,
                source_ref,
                component,
            }
        } else {
            Action::EnsureBase {
                category,
                source_ref,
                component,
            }
        });
    }

    actions
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// What happened to a base component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseOutcome {
    Installed { invocations: usize },
    AlreadyPresent,
    /// File-based sources cannot be installed from the workshop cache.
    SkippedFileBased,
    /// No cached workshop content for the source.
    WorkshopMissing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseResult {
    pub category: Category,
    pub name: String,
    pub version: String,
    pub outcome: BaseOutcome,
}

/// Summary of an applied plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub removed: Vec<PathBuf>,
    pub bases: Vec<BaseResult>,
    /// `name base-version` of update dependencies repaired from the cache.
    pub healed: Vec<String>,
    pub updates: Vec<UpdateReport>,
}

impl ReconcileReport {
    pub fn skipped_files(&self) -> usize {
        self.updates.iter().map(|u| u.skipped.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// Reconciler
// ---------------------------------------------------------------------------

/// Executes plans against the installation tree.
pub struct Reconciler<'a> {
    config: &'a ApxConfig,
    adapter: InstallerAdapter<'a>,
    engine: UpdateEngine<'a>,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        config: &'a ApxConfig,
        installer: &'a dyn Installer,
        presence: &'a dyn PresenceOracle,
        transport: &'a dyn Transport,
    ) -> Self {
        Self {
            config,
            adapter: InstallerAdapter::new(installer, presence),
            engine: UpdateEngine::new(&config.install_root, transport, config.workers()),
        }
    }

    /// `plan` + `apply`.
    pub fn reconcile(
        &self,
        target: &RemoteTarget,
        old: Option<&ModDescriptor>,
        new: &ModDescriptor,
        cancel: &CancellationToken,
    ) -> Result<ReconcileReport, SyncError> {
        self.apply(target, &plan(old, new), cancel)
    }

    /// Run `actions` in order. The first fatal error aborts the run.
    pub fn apply(
        &self,
        target: &RemoteTarget,
        actions: &[Action],
        cancel: &CancellationToken,
    ) -> Result<ReconcileReport, SyncError> {
        let mut report = ReconcileReport::default();
        for action in actions {
            tracing::debug!(%action, "reconcile");
            match action {
                Action::RemoveUpdate {
                    category,
                    name,
                    version,
                } => {
                    if let Some(path) =
                        remove_update_dir(&self.config.install_root, *category, name, version)?
                    {
                        report.removed.push(path);
                    }
                }
                Action::EnsureBase {
                    category,
                    source_ref,
                    component,
                } => {
                    let outcome = self.ensure_base(*category, source_ref, component)?;
                    report.bases.push(BaseResult {
                        category: *category,
                        name: component.name.clone(),
                        version: component.base_version(&self.config.apx_suffix).to_string(),
                        outcome,
                    });
                }
                Action::ApplyUpdate {
                    category,
                    source_ref,
                    component,
                } => {
                    if self.ensure_update_base(*category, source_ref, component)? {
                        report.healed.push(format!(
                            "{} {}",
                            component.name,
                            component.base_version(&self.config.apx_suffix)
                        ));
                    }
                    let update = self
                        .engine
                        .apply_update(target, *category, component, cancel)?;
                    report.updates.push(update);
                }
            }
        }
        Ok(report)
    }

    fn ensure_base(
        &self,
        category: Category,
        source_ref: &SourceRef,
        component: &Component,
    ) -> Result<BaseOutcome, SyncError> {
        if source_ref.is_file_based() {
            tracing::warn!(
                component = %component.name,
                source = %source_ref,
                "file based items are not supported; skipping"
            );
            return Ok(BaseOutcome::SkippedFileBased);
        }

        let base = component.base_version(&self.config.apx_suffix);
        if self.adapter.is_installed(category, &component.name, base) {
            return Ok(BaseOutcome::AlreadyPresent);
        }

        let source_dir = paths::workshop_item_dir(&self.config.workshop_root, source_ref);
        if !source_dir.is_dir() {
            tracing::warn!(
                component = %component.name,
                source = %source_ref,
                path = %source_dir.display(),
                "workshop content missing; skipping"
            );
            return Ok(BaseOutcome::WorkshopMissing);
        }

        let invocations =
            self.adapter
                .install_and_verify(category, &source_dir, &component.name, base, base)?;
        Ok(BaseOutcome::Installed { invocations })
    }

    /// For modifier-suffixed updates, make sure the base version is present,
    /// installing it from the workshop cache if not.
    ///
    /// Returns `true` if a repair was performed.
    fn ensure_update_base(
        &self,
        category: Category,
        source_ref: &SourceRef,
        component: &Component,
    ) -> Result<bool, SyncError> {
        let suffix = &self.config.apx_suffix;
        if !component.is_modified(suffix) {
            return Ok(false);
        }
        let base = component.base_version(suffix);
        if self.adapter.is_installed(category, &component.name, base) {
            tracing::info!(component = %component.name, version = base, "parent component is installed");
            return Ok(false);
        }

        tracing::warn!(component = %component.name, version = base, "parent component is missing");
        let source_dir = paths::workshop_item_dir(&self.config.workshop_root, source_ref);
        if source_dir.is_dir() {
            tracing::info!(source = %source_ref, "found workshop content; installing parent");
            self.adapter
                .install_component(&source_dir, &component.name, &component.version)?;
        }

        if !self.adapter.is_installed(category, &component.name, base) {
            return Err(SyncError::BaseUnrecoverable {
                source_ref: source_ref.0.clone(),
                name: component.name.clone(),
                version: base.to_string(),
                kind: source_ref.kind(),
            });
        }
        Ok(true)
    }
}

/// Delete `<root>/Installed/<category>/<name>/<version>` if it exists.
pub fn remove_update_dir(
    install_root: &Path,
    category: Category,
    name: &str,
    version: &str,
) -> Result<Option<PathBuf>, SyncError> {
    check_install_path(name, version)?;
    let path = paths::component_dir(install_root, category, name, version);
    if !path.exists() {
        tracing::debug!(component = name, version, "update not installed; nothing to remove");
        return Ok(None);
    }
    std::fs::remove_dir_all(&path).map_err(|e| io_err(&path, e))?;
    tracing::info!(component = name, version, "removed update");
    Ok(Some(path))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeInstaller, FakeTransport, StaticPresence};
    use apx_core::ModEnvelope;
    use serde_json::json;
    use tempfile::TempDir;

    fn descriptor(cars: serde_json::Value, track: serde_json::Value) -> ModDescriptor {
        ModEnvelope::from_value(json!({
            "mod": {"mod": {"name": "Cup", "version": "1.0"}, "cars": cars, "track": track},
            "port": 1
        }))
        .unwrap()
        .descriptor
    }

    fn entry(name: &str, version: &str, update: bool) -> serde_json::Value {
        json!({"component": {"name": name, "version": version, "update": update}})
    }

    fn config(root: &TempDir, workshop: &TempDir) -> ApxConfig {
        ApxConfig {
            install_root: root.path().to_path_buf(),
            workshop_root: workshop.path().to_path_buf(),
            ..ApxConfig::default()
        }
    }

    #[test]
    fn plan_without_cache_classifies_by_update_flag() {
        let new = descriptor(
            json!({"111": entry("CarA", "1.0", false), "222": entry("CarB", "2.0.9apx", true)}),
            json!({"333": entry("Spa", "3.1", false)}),
        );
        let actions = plan(None, &new);
        assert_eq!(actions.len(), 3);
        assert!(matches!(&actions[0], Action::EnsureBase { component, .. } if component.name == "CarA"));
        assert!(matches!(&actions[1], Action::ApplyUpdate { component, .. } if component.name == "CarB"));
        assert!(matches!(
            &actions[2],
            Action::EnsureBase { category: Category::Locations, .. }
        ));
    }

    #[test]
    fn plan_removes_dropped_and_unflagged_updates_first() {
        let old = descriptor(
            json!({
                "1": entry("Gone", "1.0.9apx", true),
                "2": entry("Kept", "2.0.9apx", true),
                "3": entry("Demoted", "3.0", true),
            }),
            json!({"4": entry("TrackUpd", "1.1", true)}),
        );
        let new = descriptor(
            json!({"2": entry("Kept", "2.0.9apx", true), "3": entry("Demoted", "3.0", false)}),
            json!({}),
        );
        let actions = plan(Some(&old), &new);
        let removals: Vec<_> = actions
            .iter()
            .take_while(|a| matches!(a, Action::RemoveUpdate { .. }))
            .map(|a| a.to_string())
            .collect();
        assert_eq!(
            removals,
            vec![
                "remove update Vehicles/Gone 1.0.9apx",
                "remove update Vehicles/Demoted 3.0",
                "remove update Locations/TrackUpd 1.1",
            ]
        );
        assert_eq!(actions.len(), 5);
    }

    #[test]
    fn file_based_base_is_skipped_not_fatal() {
        let root = TempDir::new().unwrap();
        let workshop = TempDir::new().unwrap();
        let config = config(&root, &workshop);
        let installer = FakeInstaller::default();
        let presence = StaticPresence::default();
        let transport = FakeTransport::new();
        let reconciler = Reconciler::new(&config, &installer, &presence, &transport);

        let new = descriptor(
            json!({"car-a": entry("CarA", "1.0", false), "222": entry("CarB", "2.0", false)}),
            json!({}),
        );
        let report = reconciler
            .reconcile(
                &RemoteTarget::parse("http://srv").unwrap(),
                None,
                &new,
                &CancellationToken::new(),
            )
            .unwrap();

        assert_eq!(report.bases[0].outcome, BaseOutcome::SkippedFileBased);
        assert_eq!(report.bases[1].outcome, BaseOutcome::WorkshopMissing);
        assert_eq!(installer.call_count(), 0);
    }

    #[test]
    fn present_base_is_not_reinstalled() {
        let root = TempDir::new().unwrap();
        let workshop = TempDir::new().unwrap();
        std::fs::create_dir_all(workshop.path().join("111")).unwrap();
        std::fs::write(workshop.path().join("111").join("a.rfcmp"), b"x").unwrap();
        let config = config(&root, &workshop);
        let installer = FakeInstaller::default();
        let presence = StaticPresence::default().with(Category::Vehicles, "CarA", "1.0");
        let transport = FakeTransport::new();
        let reconciler = Reconciler::new(&config, &installer, &presence, &transport);

        let new = descriptor(json!({"111": entry("CarA", "1.0.9apx", false)}), json!({}));
        let report = reconciler
            .reconcile(
                &RemoteTarget::parse("http://srv").unwrap(),
                None,
                &new,
                &CancellationToken::new(),
            )
            .unwrap();

        assert_eq!(report.bases[0].outcome, BaseOutcome::AlreadyPresent);
        assert_eq!(report.bases[0].version, "1.0");
        assert_eq!(installer.call_count(), 0);
    }

    #[test]
    fn remove_update_dir_refuses_parent_references() {
        let root = TempDir::new().unwrap();
        let sibling = paths::component_dir(root.path(), Category::Vehicles, "CarB", "2.0");
        std::fs::create_dir_all(&sibling).unwrap();

        let err = remove_update_dir(root.path(), Category::Vehicles, "CarA", "..").unwrap_err();
        assert!(matches!(err, SyncError::MalformedDescriptor { .. }), "got: {err}");
        assert!(sibling.exists());
    }

    #[test]
    fn remove_update_dir_is_noop_when_absent() {
        let root = TempDir::new().unwrap();
        let removed = remove_update_dir(root.path(), Category::Vehicles, "CarA", "1.0").unwrap();
        assert!(removed.is_none());
    }
}
