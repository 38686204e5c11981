//! Default command: install the latest mainline kernel.

use std::sync::Arc;

use anyhow::Result;
use crossterm::style::Stylize;
use uuku_core::system::preflight;
use uuku_core::{Config, NullReporter, Reporter, UpdateError, UpdateOutcome, Updater};

use super::Host;
use crate::ui::{ConsoleReporter, Theme};
use crate::ui::table::{plan_table, report_table};

/// Tools a dry run shells out to.
const DRY_RUN_TOOLS: &[(&str, &str)] = &[("uname", "coreutils"), ("dpkg-query", "dpkg")];

pub async fn upgrade(config: &Config, dry_run: bool, quiet: bool) -> Result<()> {
    let tools = if dry_run {
        preflight::check_required_tools(DRY_RUN_TOOLS)
    } else {
        preflight::check_host_tools(config)
    };
    tools.map_err(UpdateError::from)?;

    let reporter: Arc<dyn Reporter> = if quiet {
        Arc::new(NullReporter)
    } else {
        Arc::new(ConsoleReporter::new())
    };

    let host = Host::new(config)?;
    let outcome = Updater::new(config, host.collaborators(), &reporter)
        .run(dry_run)
        .await?;

    match outcome {
        UpdateOutcome::UpToDate { .. } | UpdateOutcome::NothingToInstall { .. } => {}
        UpdateOutcome::Planned { version, plan } => {
            let theme = Theme::default();
            println!();
            println!(
                "{} {} ({} {})",
                "Would install".bold(),
                version.canonical().with(theme.colors.version).bold(),
                config.arch,
                config.flavor
            );
            println!("{}", plan_table(&plan));
        }
        UpdateOutcome::Installed { report, .. } => {
            if !quiet || !report.failed.is_empty() {
                println!();
                println!("{}", report_table(&report));
            }
        }
    }
    Ok(())
}
