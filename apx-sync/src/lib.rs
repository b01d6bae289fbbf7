//! # apx-sync
//!
//! Reconciliation and synchronization engine.
//!
//! Call [`pipeline::run`] to synchronize the local installation against a
//! mod server, or build an [`Orchestrator`] with injected collaborators.

pub mod connect;
pub mod error;
pub mod pipeline;
pub mod reconcile;
pub mod remote;
pub mod transport;
pub mod update;

#[cfg(test)]
mod test_support;

pub use connect::{
    remove_stale_artifacts, remove_updates, LaunchTarget, Orchestrator, SyncOptions, SyncOutcome,
    SyncStatus,
};
pub use error::SyncError;
pub use reconcile::{plan, Action, BaseOutcome, ReconcileReport, Reconciler};
pub use remote::RemoteTarget;
pub use transport::{HttpTransport, Response, Transport};
pub use update::{SkipReason, SkippedFile, UpdateEngine, UpdateReport};
pub use tokio_util::sync::CancellationToken;
