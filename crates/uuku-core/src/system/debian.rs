//! Debian host: `uname`, `dpkg-query`, `dpkg` and `apt-get`.

use std::path::Path;

use async_trait::async_trait;
use tracing::debug;

use super::{
    CommandError, CommandRunner, InstallStatus, LocalSystem, PackageManager, run_output,
    run_status,
};

const INSTALLED_STATUS: &str = "install ok installed";

/// Whether `dpkg-query -W -f '${Status}\n'` output reports any installed
/// package.
pub fn any_installed(status_output: &str) -> bool {
    status_output
        .lines()
        .any(|line| line.trim() == INSTALLED_STATUS)
}

/// Queries the running kernel and the dpkg database.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebianSystem {
    runner: CommandRunner,
}

impl DebianSystem {
    pub fn new() -> Self {
        Self {
            runner: CommandRunner::new(false),
        }
    }
}

#[async_trait]
impl LocalSystem for DebianSystem {
    async fn running_release(&self) -> Result<String, CommandError> {
        let mut cmd = self.runner.command("uname");
        cmd.arg("-r");
        let output = run_output(cmd).await?;
        if !output.status.success() {
            return Err(CommandError::Failed {
                program: "uname".to_string(),
                status: InstallStatus::from(output.status).to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn is_package_installed(&self, pattern: &str) -> Result<bool, CommandError> {
        let mut cmd = self.runner.command("dpkg-query");
        cmd.args(["-W", "-f", "${Status}\\n", pattern]);
        // Exits non-zero when nothing matches the pattern.
        let output = run_output(cmd).await?;
        let installed = any_installed(&String::from_utf8_lossy(&output.stdout));
        debug!(pattern, installed, "package query");
        Ok(installed)
    }
}

/// Installs packages with `dpkg -i` and repairs with `apt-get install -f`.
#[derive(Debug, Clone, Copy)]
pub struct Dpkg {
    runner: CommandRunner,
    assume_yes: bool,
}

impl Dpkg {
    pub fn new(sudo: bool, assume_yes: bool) -> Self {
        Self {
            runner: CommandRunner::new(sudo),
            assume_yes,
        }
    }
}

#[async_trait]
impl PackageManager for Dpkg {
    async fn install(&self, package: &Path) -> Result<InstallStatus, CommandError> {
        let mut cmd = self.runner.privileged("dpkg");
        cmd.arg("-i").arg(package);
        Ok(run_status(cmd).await?.into())
    }

    async fn fix_broken(&self) -> Result<InstallStatus, CommandError> {
        let mut cmd = self.runner.privileged("apt-get");
        cmd.args(["install", "-f"]);
        if self.assume_yes {
            cmd.arg("-y");
        }
        Ok(run_status(cmd).await?.into())
    }
}
