//! Preflight checks.
//!
//! Makes sure the host tools the run shells out to are on `PATH` before
//! anything is downloaded.

use crate::config::{Config, ConfigError};

/// Tools every run needs, as (command, Debian package) pairs.
pub const REQUIRED_TOOLS: &[(&str, &str)] = &[
    ("uname", "coreutils"),
    ("dpkg-query", "dpkg"),
    ("dpkg", "dpkg"),
    ("apt-get", "apt"),
    ("gpg", "gnupg"),
];

/// Check if a command exists on `PATH`.
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Tools needed by a run with `config`.
pub fn tools_for(config: &Config) -> Vec<(&'static str, &'static str)> {
    let mut tools = REQUIRED_TOOLS.to_vec();
    if config.sudo {
        tools.push(("sudo", "sudo"));
    }
    if config.signing.is_some() {
        tools.push(("sbsign", "sbsigntool"));
    }
    tools
}

/// Check that specific tools are available.
///
/// # Errors
///
/// Returns [`ConfigError::MissingTools`] listing every missing tool and the
/// package that provides it.
pub fn check_required_tools(tools: &[(&str, &str)]) -> Result<(), ConfigError> {
    let missing: Vec<String> = tools
        .iter()
        .filter(|(tool, _)| !command_exists(tool))
        .map(|(tool, package)| format!("{tool} (install: {package})"))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::MissingTools(missing.join(", ")))
    }
}

/// Check every tool a run with `config` will invoke.
pub fn check_host_tools(config: &Config) -> Result<(), ConfigError> {
    check_required_tools(&tools_for(config))
}
