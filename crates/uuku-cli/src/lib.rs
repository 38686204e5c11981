//! uuku - Ubuntu mainline kernel updater
//!
//! Finds the newest kernel build on the Ubuntu mainline mirror, downloads
//! the Debian packages for this machine, verifies them against the signed
//! `CHECKSUMS` manifest and installs them with `dpkg`. Optionally signs the
//! installed image for Secure Boot.
//!
//! # Configuration
//!
//! ```text
//! ~/.config/uuku/
//! └── config.toml   # optional defaults, overridden by flags
//! ```
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

pub mod cmd;
pub mod ui;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use uuku_core::{Config, Settings};
use uuku_schema::{Arch, Flavor};

#[derive(Debug, Parser)]
#[command(name = "uuku")]
#[command(author, version = env!("UUKU_VERSION"), about = "Install the latest Ubuntu mainline kernel")]
pub struct Cli {
    /// Restrict to a kernel series: "X" or "X.Y" (e.g. 6 or 6.9)
    #[arg(short, long, global = true)]
    pub prefix: Option<String>,

    /// Target architecture
    #[arg(short, long, global = true)]
    pub arch: Option<Arch>,

    /// Kernel flavor
    #[arg(short, long, global = true)]
    pub flavor: Option<Flavor>,

    /// Sign the installed image with MOK.priv/MOK.pem from this directory
    #[arg(short, long, value_name = "KEY_DIR", env = "UUKU_SIGN_DIR", global = true)]
    pub sign: Option<PathBuf>,

    /// Mainline mirror base URL
    #[arg(long, value_name = "URL", env = "UUKU_MIRROR", global = true)]
    pub mirror: Option<String>,

    /// Connect and read timeout in seconds; pages must also arrive within it
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Build-success marker regex; group 1 captures the architecture
    #[arg(long = "marker-pattern", value_name = "RE", global = true)]
    pub marker_patterns: Vec<String>,

    /// Keyserver for the release signing key
    #[arg(long, value_name = "HOST", global = true)]
    pub keyserver: Option<String>,

    /// Run privileged commands without sudo
    #[arg(long, global = true)]
    pub no_sudo: bool,

    /// Answer yes to package manager prompts
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Resolve and print the install plan without downloading
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (default: ~/.config/uuku/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compare the latest upstream kernel with the running one
    Check {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

impl Cli {
    /// The settings layer given on the command line.
    pub fn settings(&self) -> Settings {
        Settings {
            prefix: self.prefix.clone(),
            arch: self.arch,
            flavor: self.flavor,
            sign_key_dir: self.sign.clone(),
            mirror: self.mirror.clone(),
            keyserver: self.keyserver.clone(),
            timeout_secs: self.timeout,
            marker_patterns: (!self.marker_patterns.is_empty())
                .then(|| self.marker_patterns.clone()),
            sudo: self.no_sudo.then_some(false),
            assume_yes: self.yes.then_some(true),
            ..Settings::default()
        }
    }

    /// Defaults, then the config file, then flags.
    pub fn load_config(&self) -> Result<Config> {
        let file = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::load_default()?,
        };
        Ok(file.merge(self.settings()).into_config()?)
    }
}
