//! `apx status`: the applied mod and the live state of its components.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use apx_core::{ApxConfig, DescriptorStore, ModEnvelope};
use apx_installer::{FsPresence, PresenceOracle};

use crate::GlobalArgs;

/// Arguments for `apx status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let config = super::effective_config(global)?;
        let store = DescriptorStore::new(&config.install_root);
        let cached = store
            .load()
            .with_context(|| format!("failed to read {}", store.path().display()))?;

        let report = build_report(&config, cached.as_ref());
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize status JSON")?
            );
            return Ok(());
        }
        print_table(&config, report);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct StatusReport {
    #[serde(rename = "mod")]
    identity: Option<IdentityJson>,
    port: Option<u16>,
    components: Vec<ComponentStatus>,
}

#[derive(Debug, Serialize)]
struct IdentityJson {
    name: String,
    version: String,
}

#[derive(Debug, Serialize)]
struct ComponentStatus {
    category: String,
    source: String,
    name: String,
    version: String,
    update: bool,
    installed: bool,
    /// Only set for modifier-suffixed updates.
    base_installed: Option<bool>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "category")]
    category: String,
    #[tabled(rename = "component")]
    name: String,
    #[tabled(rename = "version")]
    version: String,
    #[tabled(rename = "tier")]
    tier: &'static str,
    #[tabled(rename = "source")]
    source: String,
    #[tabled(rename = "installed")]
    installed: String,
}

fn build_report(config: &ApxConfig, cached: Option<&ModEnvelope>) -> StatusReport {
    let Some(envelope) = cached else {
        return StatusReport {
            identity: None,
            port: None,
            components: Vec::new(),
        };
    };

    let presence = FsPresence::new(&config.install_root);
    let suffix = &config.apx_suffix;
    let components = envelope
        .descriptor
        .components()
        .map(|c| {
            let component = c.component;
            let installed_version = if component.update {
                component.version.as_str()
            } else {
                component.base_version(suffix)
            };
            ComponentStatus {
                category: c.category.to_string(),
                source: c.source_ref.to_string(),
                name: component.name.clone(),
                version: component.version.clone(),
                update: component.update,
                // Base tiers are installed under their base version.
                installed: presence.exists(c.category, &component.name, installed_version),
                base_installed: (component.update && component.is_modified(suffix)).then(|| {
                    presence.exists(c.category, &component.name, component.base_version(suffix))
                }),
            }
        })
        .collect();

    StatusReport {
        identity: Some(IdentityJson {
            name: envelope.identity().name.clone(),
            version: envelope.identity().version.clone(),
        }),
        port: Some(envelope.port),
        components,
    }
}

fn print_table(config: &ApxConfig, report: StatusReport) {
    let Some(identity) = report.identity else {
        println!("No mod applied under {}.", config.install_root.display());
        println!("Run: apx connect <target>");
        return;
    };

    let missing = report.components.iter().filter(|c| !c.installed).count();
    println!(
        "apx v{} | {} {} | port {} | {} components | {} missing",
        env!("CARGO_PKG_VERSION"),
        identity.name.bold(),
        identity.version,
        report.port.unwrap_or_default(),
        report.components.len(),
        missing,
    );
    if report.components.is_empty() {
        return;
    }

    let rows: Vec<StatusTableRow> = report
        .components
        .into_iter()
        .map(|c| StatusTableRow {
            category: c.category,
            name: c.name,
            version: c.version,
            tier: if c.update { "update" } else { "base" },
            source: c.source,
            installed: installed_label(c.installed, c.base_installed),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if missing > 0 {
        // connect short-circuits while the cached identity matches the server.
        println!(
            "Delete {} and run 'apx connect <target>' again to reinstall missing components.",
            DescriptorStore::new(&config.install_root).path().display()
        );
    }
}

fn installed_label(installed: bool, base_installed: Option<bool>) -> String {
    let own = if installed {
        "■ yes".green().to_string()
    } else {
        "■ no".red().to_string()
    };
    match base_installed {
        Some(false) => format!("{own} {}", "(base missing)".yellow()),
        _ => own,
    }
}
