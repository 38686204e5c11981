//! Kernel version strings as published in the mainline directory listing.
//!
//! The listing names directories `v6.9/`, `v6.9.1/`, `v6.10/`. Two-component
//! names are canonicalized to three components (`6.9` becomes `6.9.0`)
//! before being compared with the running kernel or interpolated into
//! package filenames. Ordering is numeric per component, so `6.10` sorts
//! after `6.9`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors produced while parsing versions and version prefixes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// The string is not two or three dot-separated integers.
    #[error("Invalid kernel version '{0}': expected X.Y or X.Y.Z")]
    InvalidVersion(String),

    /// The prefix is not `X` or `X.Y`.
    #[error("Version prefix must match pattern 'X.Y' or just 'X', but '{0}' was found")]
    InvalidPrefix(String),
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// A mainline kernel version such as `6.10` or `6.9.1`.
///
/// The spelling used by the upstream directory is kept because it names the
/// remote directory (`v6.10/`); [`canonical`](Self::canonical) gives the
/// three-component form used everywhere else.
///
/// # Example
///
/// ```
/// use uuku_schema::KernelVersion;
///
/// let v: KernelVersion = "6.10".parse().unwrap();
/// assert_eq!(v.dir_name(), "6.10");
/// assert_eq!(v.canonical(), "6.10.0");
/// assert!(v > "6.9.1".parse().unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KernelVersion {
    dir: String,
    parts: [u32; 3],
    components: usize,
}

impl KernelVersion {
    /// Parse `X.Y` or `X.Y.Z`.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::InvalidVersion`] for anything else, including
    /// components that overflow `u32`.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let invalid = || VersionError::InvalidVersion(s.to_string());

        let fields: Vec<&str> = s.split('.').collect();
        if !(2..=3).contains(&fields.len()) || !fields.iter().all(|f| is_digits(f)) {
            return Err(invalid());
        }

        let mut parts = [0u32; 3];
        for (slot, field) in parts.iter_mut().zip(&fields) {
            *slot = field.parse().map_err(|_| invalid())?;
        }

        Ok(Self {
            dir: s.to_string(),
            parts,
            components: fields.len(),
        })
    }

    /// Parse a directory-listing entry of the form `v<version>/`.
    ///
    /// Returns `None` when the entry does not have that shape; malformed
    /// entries are simply not versions.
    pub fn from_dir_entry(entry: &str) -> Option<Self> {
        entry
            .trim()
            .strip_prefix('v')
            .and_then(|rest| rest.strip_suffix('/'))
            .and_then(|version| Self::parse(version).ok())
    }

    /// Canonicalize a bare version string, appending `.0` to two-component
    /// versions. Strings that are not versions are returned unchanged.
    pub fn canonicalize(s: &str) -> String {
        Self::parse(s).map_or_else(|_| s.to_string(), |v| v.canonical())
    }

    /// The version as spelled in the upstream directory name.
    pub fn dir_name(&self) -> &str {
        &self.dir
    }

    /// The three-component form (`6.9` becomes `6.9.0`).
    pub fn canonical(&self) -> String {
        let [major, minor, patch] = self.parts;
        format!("{major}.{minor}.{patch}")
    }
}

impl Ord for KernelVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // `6.10` sorts before `6.10.0`, matching list-of-integers ordering.
        self.parts
            .cmp(&other.parts)
            .then(self.components.cmp(&other.components))
            .then_with(|| self.dir.cmp(&other.dir))
    }
}

impl PartialOrd for KernelVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl FromStr for KernelVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A user-supplied filter restricting eligible versions to a major (`6`) or
/// a major.minor (`6.9`) series.
///
/// Matching is textual on the directory spelling, the same way the listing
/// is scanned: prefix `6.1` matches `6.1.5` but not `6.10`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionPrefix {
    major: String,
    minor: Option<String>,
}

impl VersionPrefix {
    /// Validate a prefix against `^\d+(\.\d+)?$`.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError::InvalidPrefix`] when the input has any other
    /// shape.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let (major, minor) = match s.split_once('.') {
            Some((major, minor)) => (major, Some(minor)),
            None => (s, None),
        };

        if !is_digits(major) || minor.is_some_and(|m| !is_digits(m)) {
            return Err(VersionError::InvalidPrefix(s.to_string()));
        }

        Ok(Self {
            major: major.to_string(),
            minor: minor.map(str::to_string),
        })
    }

    /// Check whether `version` belongs to this prefix.
    pub fn matches(&self, version: &KernelVersion) -> bool {
        let mut fields = version.dir_name().split('.');
        if fields.next() != Some(self.major.as_str()) {
            return false;
        }
        match &self.minor {
            Some(minor) => fields.next() == Some(minor.as_str()),
            None => true,
        }
    }
}

impl fmt::Display for VersionPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.minor {
            Some(minor) => write!(f, "{}.{minor}", self.major),
            None => f.write_str(&self.major),
        }
    }
}

impl FromStr for VersionPrefix {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
