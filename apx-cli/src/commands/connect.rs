//! `apx connect`: synchronize with a mod server, then hand off to Steam.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use apx_sync::{
    pipeline, BaseOutcome, CancellationToken, ReconcileReport, SyncOptions, SyncOutcome,
    SyncStatus,
};

use crate::GlobalArgs;

/// Arguments for `apx connect`.
#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Mod server base URL, e.g. `http://10.0.0.5:8080`.
    pub target: String,

    /// Show what would be done without installing, fetching or removing anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl ConnectArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let config = super::effective_config(global)?;
        let options = SyncOptions {
            dry_run: self.dry_run,
        };

        let outcome = pipeline::run(&config, &self.target, options, &CancellationToken::new())
            .with_context(|| format!("connect to '{}' failed", self.target))?;

        print_outcome(&outcome);
        if !self.dry_run {
            println!("Launch: {}", outcome.launch.steam_uri(config.steam_app_id).bold());
        }
        Ok(())
    }
}

fn print_outcome(outcome: &SyncOutcome) {
    match &outcome.status {
        SyncStatus::Unchanged => {
            println!("{} '{}' already applied; nothing to do", "✓".green(), outcome.identity);
        }
        SyncStatus::Planned { actions } => {
            println!("[dry-run] '{}' would apply {} action(s)", outcome.identity, actions.len());
            for action in actions {
                println!("  ~  {action}");
            }
        }
        SyncStatus::Applied {
            removed_artifacts,
            report,
        } => {
            match &outcome.previous {
                Some(previous) => println!(
                    "{} '{}' applied (replacing '{previous}')",
                    "✓".green(),
                    outcome.identity
                ),
                None => println!("{} '{}' applied", "✓".green(), outcome.identity),
            }
            for path in removed_artifacts {
                println!("  ✗  {}", path.display());
            }
            print_report(report);
        }
    }
}

fn print_report(report: &ReconcileReport) {
    for path in &report.removed {
        println!("  ✗  {}", path.display());
    }
    for base in &report.bases {
        let detail = match &base.outcome {
            BaseOutcome::Installed { invocations } => {
                format!("installed ({invocations} package(s))").green().to_string()
            }
            BaseOutcome::AlreadyPresent => "present".to_string(),
            BaseOutcome::SkippedFileBased => "skipped: file based".yellow().to_string(),
            BaseOutcome::WorkshopMissing => "skipped: no workshop content".yellow().to_string(),
        };
        println!("  ·  {}/{} {}: {detail}", base.category, base.name, base.version);
    }
    for healed in &report.healed {
        println!("  ✎  repaired base {healed}");
    }
    for update in &report.updates {
        println!(
            "  ✎  {}/{} {}: {} file(s)",
            update.category,
            update.component,
            update.version,
            update.written.len()
        );
        for skipped in &update.skipped {
            println!(
                "     {} {}: {}",
                "!".yellow().bold(),
                skipped.file,
                skipped.reason
            );
        }
    }
    let skipped = report.skipped_files();
    if skipped > 0 {
        println!(
            "{}",
            format!("{skipped} file(s) could not be fetched; re-run connect to retry").yellow()
        );
    }
}
