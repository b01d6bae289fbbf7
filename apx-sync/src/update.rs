//! Update sync engine: file-sync overlay for update-flagged components.
//!
//! ## `apply_update` protocol
//!
//! 1. `GET <target>/files/<name>/<version>` → JSON array of file names.
//! 2. Destination is `<root>/Installed/<category>/<name>/<version>`.
//! 3. An existing destination is deleted wholesale and recreated empty.
//! 4. Each file is fetched on a bounded worker pool and streamed to
//!    `<destination>/<file>` byte-for-byte. A miss on one file is recorded
//!    in the report and never stops its siblings.
//!
//! There is no rollback: an interrupted run leaves a partial directory that
//! the next run overwrites wholesale.

use std::collections::VecDeque;
use std::fmt;
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use apx_core::{paths, Category, Component};

use crate::error::{io_err, SyncError};
use crate::remote::{fetch_listing, RemoteTarget};
use crate::transport::Transport;

const COPY_BUFFER: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Why a listed file was not written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The server answered with a status other than 200.
    Status(u16),
    /// The request produced no response.
    Transport(String),
    /// The response body could not be read to the end.
    Interrupted(String),
    /// The listing entry is not a plain relative file name.
    InvalidName,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Status(status) => write!(f, "HTTP status {status}"),
            SkipReason::Transport(reason) => write!(f, "request failed: {reason}"),
            SkipReason::Interrupted(reason) => write!(f, "body interrupted: {reason}"),
            SkipReason::InvalidName => f.write_str("not a plain file name"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub file: String,
    pub reason: SkipReason,
}

/// Outcome of one update, in listing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub category: Category,
    pub component: String,
    pub version: String,
    pub destination: PathBuf,
    /// `true` if the destination existed and was replaced.
    pub overwritten: bool,
    pub written: Vec<String>,
    pub skipped: Vec<SkippedFile>,
}

impl UpdateReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

enum FileOutcome {
    Written(String),
    Skipped(SkippedFile),
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Fetches update payloads into the installation tree.
pub struct UpdateEngine<'a> {
    install_root: &'a Path,
    transport: &'a dyn Transport,
    workers: usize,
}

impl<'a> UpdateEngine<'a> {
    pub fn new(install_root: &'a Path, transport: &'a dyn Transport, workers: usize) -> Self {
        Self {
            install_root,
            transport,
            workers: workers.max(1),
        }
    }

    /// Replace the update directory of `component` with the server's files.
    ///
    /// Fatal: listing failures, local filesystem failures, cancellation.
    /// Soft (reported): per-file misses.
    pub fn apply_update(
        &self,
        target: &RemoteTarget,
        category: Category,
        component: &Component,
        cancel: &CancellationToken,
    ) -> Result<UpdateReport, SyncError> {
        let cancelled = || SyncError::Cancelled {
            name: component.name.clone(),
            version: component.version.clone(),
        };
        if cancel.is_cancelled() {
            return Err(cancelled());
        }
        check_install_path(&component.name, &component.version)?;

        let files = fetch_listing(self.transport, target, &component.name, &component.version)?;
        tracing::info!(
            component = %component.name,
            version = %component.version,
            files = files.len(),
            "fetched update listing"
        );

        let destination =
            paths::component_dir(self.install_root, category, &component.name, &component.version);
        let overwritten = destination.exists();
        if overwritten {
            std::fs::remove_dir_all(&destination).map_err(|e| io_err(&destination, e))?;
            tracing::info!(
                component = %component.name,
                version = %component.version,
                "already present; forcing update with overwrite"
            );
        }
        std::fs::create_dir_all(&destination).map_err(|e| io_err(&destination, e))?;

        let outcomes = self.fetch_all(target, component, &destination, files, cancel)?;
        if cancel.is_cancelled() {
            return Err(cancelled());
        }

        let mut report = UpdateReport {
            category,
            component: component.name.clone(),
            version: component.version.clone(),
            destination,
            overwritten,
            written: Vec::new(),
            skipped: Vec::new(),
        };
        for outcome in outcomes {
            match outcome {
                FileOutcome::Written(file) => report.written.push(file),
                FileOutcome::Skipped(skipped) => report.skipped.push(skipped),
            }
        }
        if !report.is_complete() {
            tracing::warn!(
                component = %component.name,
                version = %component.version,
                skipped = report.skipped.len(),
                "update applied with missing files"
            );
        }
        Ok(report)
    }

    /// Fan `files` out over at most `workers` scoped threads and return the
    /// outcomes in listing order. The destination must already exist.
    fn fetch_all(
        &self,
        target: &RemoteTarget,
        component: &Component,
        destination: &Path,
        files: Vec<String>,
        cancel: &CancellationToken,
    ) -> Result<Vec<FileOutcome>, SyncError> {
        let total = files.len();
        let queue = Mutex::new(files.into_iter().enumerate().collect::<VecDeque<_>>());
        let outcomes = Mutex::new(Vec::with_capacity(total));
        let failure: Mutex<Option<SyncError>> = Mutex::new(None);
        // Stops dispatch on cancellation or on the first fatal error.
        let halt = cancel.child_token();

        std::thread::scope(|scope| {
            for _ in 0..self.workers.min(total) {
                scope.spawn(|| loop {
                    if halt.is_cancelled() {
                        break;
                    }
                    let next = lock(&queue).pop_front();
                    let Some((index, file)) = next else {
                        break;
                    };
                    match self.fetch_file(target, component, destination, file) {
                        Ok(outcome) => lock(&outcomes).push((index, outcome)),
                        Err(err) => {
                            let mut slot = lock(&failure);
                            if slot.is_none() {
                                *slot = Some(err);
                            }
                            halt.cancel();
                        }
                    }
                });
            }
        });

        if let Some(err) = failure.into_inner().unwrap_or_else(PoisonError::into_inner) {
            return Err(err);
        }
        let mut outcomes = outcomes.into_inner().unwrap_or_else(PoisonError::into_inner);
        outcomes.sort_by_key(|(index, _)| *index);
        Ok(outcomes.into_iter().map(|(_, outcome)| outcome).collect())
    }

    fn fetch_file(
        &self,
        target: &RemoteTarget,
        component: &Component,
        destination: &Path,
        file: String,
    ) -> Result<FileOutcome, SyncError> {
        let skip = |file: String, reason: SkipReason| -> Result<FileOutcome, SyncError> {
            tracing::warn!(component = %component.name, file = %file, %reason, "skipping file");
            Ok(FileOutcome::Skipped(SkippedFile { file, reason }))
        };

        if !paths::is_plain_component(&file) {
            return skip(file, SkipReason::InvalidName);
        }

        let url = target.file_url(&component.name, &component.version, &file);
        let response = match self.transport.get(&url) {
            Ok(response) => response,
            Err(SyncError::Transport { reason, .. }) => {
                return skip(file, SkipReason::Transport(reason));
            }
            Err(other) => return Err(other),
        };
        if !response.is_ok() {
            return skip(file, SkipReason::Status(response.status));
        }

        let path = destination.join(&file);
        let mut out = File::create(&path).map_err(|e| io_err(&path, e))?;
        match copy_body(response.body, &mut out) {
            Ok(bytes) => {
                tracing::info!(
                    component = %component.name,
                    version = %component.version,
                    file = %file,
                    bytes,
                    "placed file"
                );
                Ok(FileOutcome::Written(file))
            }
            Err(CopyError::Read(e)) => {
                drop(out);
                let _ = std::fs::remove_file(&path);
                skip(file, SkipReason::Interrupted(e.to_string()))
            }
            Err(CopyError::Write(e)) => Err(io_err(&path, e)),
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

enum CopyError {
    Read(std::io::Error),
    Write(std::io::Error),
}

/// Stream `body` into `out`, keeping remote read failures apart from local
/// write failures.
fn copy_body(mut body: impl Read, out: &mut impl Write) -> Result<u64, CopyError> {
    let mut buf = vec![0u8; COPY_BUFFER];
    let mut total = 0u64;
    loop {
        let n = match body.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(CopyError::Read(e)),
        };
        out.write_all(&buf[..n]).map_err(CopyError::Write)?;
        total += n as u64;
    }
    out.flush().map_err(CopyError::Write)?;
    Ok(total)
}

/// Refuse names that would resolve outside their own component directory.
pub(crate) fn check_install_path(name: &str, version: &str) -> Result<(), SyncError> {
    for value in [name, version] {
        if !paths::is_plain_component(value) {
            return Err(SyncError::MalformedDescriptor {
                reason: format!("{value:?} is not a plain path component"),
            });
        }
    }
    Ok(())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
