//! Run configuration.
//!
//! [`Settings`] is the raw, partially-filled layer read from the config file
//! or built from command-line flags. Layers are merged with
//! [`Settings::merge`] and validated once by [`Settings::into_config`], which
//! happens before any network activity.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use uuku_schema::{Arch, Flavor, KernelVersion, MAINLINE_RELEASE_KEY};
use uuku_schema::{VersionError, VersionPrefix};

use crate::release::{BuildMarkers, MarkerError};

pub const DEFAULT_MIRROR: &str = "https://kernel.ubuntu.com/mainline/";
pub const DEFAULT_KEYSERVER: &str = "hkps://keyserver.ubuntu.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RETRIES: u32 = 2;

/// Private key file expected in the signing key directory.
pub const SIGNING_KEY_FILE: &str = "MOK.priv";
/// Certificate file expected in the signing key directory.
pub const SIGNING_CERT_FILE: &str = "MOK.pem";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    InvalidPrefix(#[from] VersionError),

    #[error(transparent)]
    InvalidMarker(#[from] MarkerError),

    #[error("Signing key directory {} must contain MOK.priv and MOK.pem", .path.display())]
    MissingSigningKey { path: PathBuf },

    #[error("Failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Required tools not found: {0}")]
    MissingTools(String),
}

/// One configuration layer. Unset fields fall through to the next layer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub prefix: Option<String>,
    pub arch: Option<Arch>,
    pub flavor: Option<Flavor>,
    pub sign_key_dir: Option<PathBuf>,
    pub mirror: Option<String>,
    pub keyserver: Option<String>,
    pub release_key: Option<String>,
    pub timeout_secs: Option<u64>,
    pub retries: Option<u32>,
    pub marker_patterns: Option<Vec<String>>,
    pub sudo: Option<bool>,
    pub assume_yes: Option<bool>,
}

impl Settings {
    /// Read a TOML settings file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read the default settings file, if there is one.
    pub fn load_default() -> Result<Self, ConfigError> {
        match crate::paths::config_path() {
            Some(path) if path.exists() => {
                debug!(path = %path.display(), "loading config");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Layer `overrides` on top of `self`; set fields in `overrides` win.
    pub fn merge(self, overrides: Self) -> Self {
        Self {
            prefix: overrides.prefix.or(self.prefix),
            arch: overrides.arch.or(self.arch),
            flavor: overrides.flavor.or(self.flavor),
            sign_key_dir: overrides.sign_key_dir.or(self.sign_key_dir),
            mirror: overrides.mirror.or(self.mirror),
            keyserver: overrides.keyserver.or(self.keyserver),
            release_key: overrides.release_key.or(self.release_key),
            timeout_secs: overrides.timeout_secs.or(self.timeout_secs),
            retries: overrides.retries.or(self.retries),
            marker_patterns: overrides.marker_patterns.or(self.marker_patterns),
            sudo: overrides.sudo.or(self.sudo),
            assume_yes: overrides.assume_yes.or(self.assume_yes),
        }
    }

    /// Validate and fill defaults.
    ///
    /// An empty prefix means "no restriction"; an empty signing directory
    /// means "do not sign".
    pub fn into_config(self) -> Result<Config, ConfigError> {
        let prefix = match self.prefix.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(p) => Some(VersionPrefix::parse(p)?),
        };

        let signing = match self.sign_key_dir {
            Some(dir) if !dir.as_os_str().is_empty() => Some(SigningKeys::new(dir)?),
            _ => None,
        };

        let markers = match self.marker_patterns {
            Some(patterns) if !patterns.is_empty() => BuildMarkers::new(patterns)?,
            _ => BuildMarkers::default(),
        };

        let mut mirror = self.mirror.unwrap_or_else(|| DEFAULT_MIRROR.to_string());
        if !mirror.ends_with('/') {
            mirror.push('/');
        }

        Ok(Config {
            prefix,
            arch: self.arch.unwrap_or_default(),
            flavor: self.flavor.unwrap_or_default(),
            signing,
            mirror,
            keyserver: self
                .keyserver
                .unwrap_or_else(|| DEFAULT_KEYSERVER.to_string()),
            release_key: self
                .release_key
                .unwrap_or_else(|| MAINLINE_RELEASE_KEY.to_string()),
            timeout: Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            retries: self.retries.unwrap_or(DEFAULT_RETRIES),
            markers,
            sudo: self.sudo.unwrap_or(true),
            assume_yes: self.assume_yes.unwrap_or(false),
        })
    }
}

/// A Secure Boot signing key pair directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningKeys {
    dir: PathBuf,
}

impl SigningKeys {
    /// Accept `dir` if it holds both `MOK.priv` and `MOK.pem`.
    pub fn new(dir: PathBuf) -> Result<Self, ConfigError> {
        if dir.join(SIGNING_KEY_FILE).is_file() && dir.join(SIGNING_CERT_FILE).is_file() {
            Ok(Self { dir })
        } else {
            Err(ConfigError::MissingSigningKey { path: dir })
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key_path(&self) -> PathBuf {
        self.dir.join(SIGNING_KEY_FILE)
    }

    pub fn cert_path(&self) -> PathBuf {
        self.dir.join(SIGNING_CERT_FILE)
    }
}

/// Validated settings for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub prefix: Option<VersionPrefix>,
    pub arch: Arch,
    pub flavor: Flavor,
    pub signing: Option<SigningKeys>,
    /// Mirror base URL, always ending in `/`.
    pub mirror: String,
    pub keyserver: String,
    pub release_key: String,
    pub timeout: Duration,
    pub retries: u32,
    pub markers: BuildMarkers,
    pub sudo: bool,
    pub assume_yes: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prefix: None,
            arch: Arch::default(),
            flavor: Flavor::default(),
            signing: None,
            mirror: DEFAULT_MIRROR.to_string(),
            keyserver: DEFAULT_KEYSERVER.to_string(),
            release_key: MAINLINE_RELEASE_KEY.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retries: DEFAULT_RETRIES,
            markers: BuildMarkers::default(),
            sudo: true,
            assume_yes: false,
        }
    }
}

impl Config {
    /// The version directory listing.
    pub fn index_url(&self) -> String {
        self.mirror.clone()
    }

    /// The build page of one version.
    pub fn release_page_url(&self, version: &KernelVersion) -> String {
        format!("{}v{}/", self.mirror, version.dir_name())
    }

    /// Download URL of a file in the per-architecture directory of a build.
    pub fn asset_url(&self, version: &KernelVersion, local_name: &str) -> String {
        format!(
            "{}v{}/{}/{}",
            self.mirror,
            version.dir_name(),
            self.arch,
            local_name
        )
    }
}
