//! External collaborators: the local system, the package manager, integrity
//! verification and image signing.
//!
//! Each concern is a trait so the update pipeline can run against fakes in
//! tests. The implementations shell out to the Debian tools that own the
//! concern (`uname`, `dpkg`, `apt-get`, `gpg`, `sbsign`).

pub mod debian;
pub mod gpg;
pub mod preflight;
pub mod sbsign;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::process::{ExitStatus, Output};

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;

use crate::config::SigningKeys;
use tracing::debug;

use crate::error::VerifyError;
use crate::io::checksums::ChecksumStatus;

pub use debian::{DebianSystem, Dpkg};
pub use gpg::GpgVerifier;
pub use sbsign::SbSigner;

/// An external command could not be run or reported failure.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed ({status})")]
    Failed { program: String, status: String },
}

/// Result of one package-manager invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallStatus {
    Success,
    Failed(Option<i32>),
}

impl InstallStatus {
    pub fn success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<ExitStatus> for InstallStatus {
    fn from(status: ExitStatus) -> Self {
        if status.success() {
            Self::Success
        } else {
            Self::Failed(status.code())
        }
    }
}

impl fmt::Display for InstallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Failed(Some(code)) => write!(f, "exit code {code}"),
            Self::Failed(None) => f.write_str("terminated by signal"),
        }
    }
}

/// Facts about the machine being updated.
#[async_trait]
pub trait LocalSystem: Send + Sync {
    /// Release string of the running kernel (`uname -r`), e.g.
    /// `6.8.0-31-generic`.
    async fn running_release(&self) -> Result<String, CommandError>;

    /// Whether any package matching `pattern` is installed.
    async fn is_package_installed(&self, pattern: &str) -> Result<bool, CommandError>;
}

/// Installs local package files.
#[async_trait]
pub trait PackageManager: Send + Sync {
    /// Install one package file. A non-zero exit is reported in the status,
    /// not as an error.
    async fn install(&self, package: &Path) -> Result<InstallStatus, CommandError>;

    /// Resolve dependencies left unsatisfied by earlier installs.
    async fn fix_broken(&self) -> Result<InstallStatus, CommandError>;
}

/// Checks downloaded files against the signed upstream manifest.
#[async_trait]
pub trait IntegrityVerifier: Send + Sync {
    /// Check every entry of `manifest` in `dir`, keyed by filename.
    async fn verify_checksums(
        &self,
        dir: &Path,
        manifest: &str,
    ) -> Result<BTreeMap<String, ChecksumStatus>, VerifyError>;

    /// Verify the detached `signature` over `data`, both in `dir`.
    async fn verify_signature(
        &self,
        dir: &Path,
        signature: &str,
        data: &str,
    ) -> Result<bool, VerifyError>;

    /// Make sure `key_id` is in the local keyring, fetching it if absent.
    async fn ensure_trusted_key(&self, key_id: &str) -> Result<(), VerifyError>;
}

/// Signs an installed kernel image for Secure Boot.
#[async_trait]
pub trait ImageSigner: Send + Sync {
    /// Sign `image` in place with `keys`.
    async fn sign_image(&self, keys: &SigningKeys, image: &Path) -> Result<(), CommandError>;
}

/// Builds commands, prefixing privileged ones with `sudo` when enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandRunner {
    sudo: bool,
}

impl CommandRunner {
    pub fn new(sudo: bool) -> Self {
        Self { sudo }
    }

    pub fn command(&self, program: &str) -> Command {
        let mut cmd = Command::new(program);
        cmd.kill_on_drop(true);
        cmd
    }

    pub fn privileged(&self, program: &str) -> Command {
        if self.sudo {
            let mut cmd = self.command("sudo");
            cmd.arg(program);
            cmd
        } else {
            self.command(program)
        }
    }
}

fn program_name(cmd: &Command) -> String {
    let std_cmd = cmd.as_std();
    let program = std_cmd.get_program().to_string_lossy();
    match std_cmd.get_args().next() {
        Some(first) if program == "sudo" => format!("sudo {}", first.to_string_lossy()),
        _ => program.into_owned(),
    }
}

/// Run `cmd` with inherited stdio and return its exit status.
pub(crate) async fn run_status(mut cmd: Command) -> Result<ExitStatus, CommandError> {
    let program = program_name(&cmd);
    debug!(command = ?cmd.as_std(), "running");
    cmd.status()
        .await
        .map_err(|source| CommandError::Spawn { program, source })
}

/// Run `cmd` capturing its output.
pub(crate) async fn run_output(mut cmd: Command) -> Result<Output, CommandError> {
    let program = program_name(&cmd);
    debug!(command = ?cmd.as_std(), "running (captured)");
    cmd.output()
        .await
        .map_err(|source| CommandError::Spawn { program, source })
}

/// Run `cmd` and turn a non-zero exit into [`CommandError::Failed`].
pub(crate) async fn run_checked(cmd: Command) -> Result<(), CommandError> {
    let program = program_name(&cmd);
    let status = run_status(cmd).await?;
    if status.success() {
        Ok(())
    } else {
        Err(CommandError::Failed {
            program,
            status: InstallStatus::from(status).to_string(),
        })
    }
}
