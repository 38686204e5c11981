//! Check command: report whether a newer kernel is available.

use anyhow::Result;
use uuku_core::system::preflight;
use uuku_core::{Config, NullReporter, UpdateError, Updater};

use super::Host;
use crate::ui::table::check_table;

/// Tools `check` shells out to.
const CHECK_TOOLS: &[(&str, &str)] = &[("uname", "coreutils"), ("dpkg-query", "dpkg")];

pub async fn check(config: &Config, json: bool) -> Result<()> {
    preflight::check_required_tools(CHECK_TOOLS).map_err(UpdateError::from)?;

    let host = Host::new(config)?;
    let report = Updater::new(config, host.collaborators(), &NullReporter)
        .check()
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", check_table(&report));
    }
    Ok(())
}
