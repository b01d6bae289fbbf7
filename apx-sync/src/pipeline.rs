//! Production wiring for the orchestrator, used by the CLI.

use tokio_util::sync::CancellationToken;

use apx_core::ApxConfig;
use apx_installer::{FsPresence, ModMgrInstaller};

use crate::connect::{Orchestrator, SyncOptions, SyncOutcome};
use crate::error::SyncError;
use crate::transport::HttpTransport;

/// Synchronize against `target` using HTTP, the configured installer
/// executable and the real installation tree.
pub fn run(
    config: &ApxConfig,
    target: &str,
    options: SyncOptions,
    cancel: &CancellationToken,
) -> Result<SyncOutcome, SyncError> {
    let transport = HttpTransport::new();
    let installer = ModMgrInstaller::new(config.installer_path(), &config.install_root);
    let presence = FsPresence::new(&config.install_root);
    Orchestrator::new(config, &transport, &installer, &presence).synchronize(target, options, cancel)
}
