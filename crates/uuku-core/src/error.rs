//! Error types for the update run, and the exit code each one maps to.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::html::ParseError;
use crate::io::fetch::FetchError;
use crate::system::CommandError;

/// Failures of the two listing resolvers.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Error parsing {page} page: {source}")]
    Parse {
        page: &'static str,
        #[source]
        source: ParseError,
    },

    #[error("No kernel versions found in the index{}", prefix_note(.prefix.as_deref()))]
    NoVersionsFound { prefix: Option<String> },

    #[error("Invalid asset pattern: {0}")]
    Pattern(#[from] regex::Error),
}

fn prefix_note(prefix: Option<&str>) -> String {
    prefix.map_or_else(String::new, |p| format!(" matching prefix '{p}'"))
}

/// Failures while checking downloaded files before installation.
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Checksum validation failed for: {}", .files.join(", "))]
    ChecksumMismatch { files: Vec<String> },

    #[error("Failed to read checksum manifest {}: {source}", .path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Signature verification failed for {data}")]
    Signature { data: String },

    #[error("Could not obtain release key {key}: {source}")]
    KeyRetrieval {
        key: String,
        #[source]
        source: CommandError,
    },

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Anything that ends an update run early.
#[derive(Error, Debug)]
pub enum UpdateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Verify(#[from] VerifyError),

    #[error("Signing failed: {0}")]
    Signing(#[source] CommandError),

    #[error("Fixing broken dependencies failed ({status})")]
    DependencyFix { status: String },

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Process exit codes.
pub mod exit {
    pub const SUCCESS: u8 = 0;
    pub const INVALID_INPUT: u8 = 1;
    pub const PARSE: u8 = 2;
    pub const CHECKSUM: u8 = 3;
    pub const NO_VERSIONS: u8 = 4;
    pub const FETCH: u8 = 5;
    pub const SIGNATURE: u8 = 6;
    pub const COMMAND: u8 = 7;
    pub const IO: u8 = 8;
}

impl UpdateError {
    /// Exit code reported to the shell for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => exit::INVALID_INPUT,
            Self::Resolve(ResolveError::Parse { .. } | ResolveError::Pattern(_)) => exit::PARSE,
            Self::Resolve(ResolveError::NoVersionsFound { .. }) => exit::NO_VERSIONS,
            Self::Fetch(FetchError::Io(_)) => exit::IO,
            Self::Fetch(_) => exit::FETCH,
            Self::Verify(VerifyError::ChecksumMismatch { .. } | VerifyError::Manifest { .. }) => {
                exit::CHECKSUM
            }
            Self::Verify(VerifyError::Signature { .. }) => exit::SIGNATURE,
            Self::Verify(VerifyError::KeyRetrieval { .. } | VerifyError::Command(_))
            | Self::Signing(_)
            | Self::DependencyFix { .. }
            | Self::Command(_) => exit::COMMAND,
            Self::Verify(VerifyError::Io(_)) | Self::Io(_) => exit::IO,
        }
    }
}
