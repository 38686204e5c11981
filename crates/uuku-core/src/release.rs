//! Release asset resolution with architecture gating.
//!
//! A mainline build page interleaves per-architecture status lines with the
//! files that build produced:
//!
//! ```text
//! Test arm64/build succeeded (rc=0, on=arm64, time=0:12:40, log=arm64/log)
//! arm64/linux-headers-6.9.1-060901_6.9.1-060901.202405171142_all.deb
//! arm64/linux-image-unsigned-6.9.1-060901-generic_..._arm64.deb
//! Test amd64/build succeeded (rc=0, on=amd64, time=0:14:05, log=amd64/log)
//! amd64/linux-headers-6.9.1-060901_6.9.1-060901.202405171142_all.deb
//! ...
//! ```
//!
//! A file is only accepted while the most recent status marker names the
//! requested architecture. This matters for the `_all.deb` packages, which
//! carry no architecture suffix of their own.

use regex::Regex;
use thiserror::Error;
use tracing::{debug, trace};
use uuku_schema::{Arch, AssetFilename, Flavor, KernelVersion};

use crate::error::ResolveError;
use crate::html;

/// Status marker grammars seen on upstream build pages, most specific
/// first. Group 1 captures the architecture.
pub const DEFAULT_MARKER_PATTERNS: &[&str] = &[
    r"(?:Build for|Test) (\w+)(?:/build)? succeeded",
    r"Build for (\S+) succeeded",
];

/// A marker pattern that cannot be used.
#[derive(Error, Debug)]
pub enum MarkerError {
    /// The pattern is not a valid regular expression.
    #[error("Invalid build marker pattern '{pattern}': {source}")]
    Invalid {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The pattern compiles but captures no architecture.
    #[error("Build marker pattern '{pattern}' has no capture group for the architecture")]
    NoCapture { pattern: String },
}

/// Ordered set of build-success marker patterns.
#[derive(Debug, Clone)]
pub struct BuildMarkers {
    patterns: Vec<Regex>,
}

impl BuildMarkers {
    /// Compile marker patterns. Each must have at least one capture group;
    /// group 1 is the architecture name.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerError`] for a pattern that does not compile or lacks
    /// a capture group.
    pub fn new<I, S>(patterns: I) -> Result<Self, MarkerError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                let pattern = p.as_ref();
                let re = Regex::new(pattern).map_err(|source| MarkerError::Invalid {
                    pattern: pattern.to_string(),
                    source,
                })?;
                if re.captures_len() < 2 {
                    return Err(MarkerError::NoCapture {
                        pattern: pattern.to_string(),
                    });
                }
                Ok(re)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// Architecture named by `token` if it is a build-success marker. The
    /// first matching pattern wins.
    pub fn captured_arch<'t>(&self, token: &'t str) -> Option<&'t str> {
        self.patterns.iter().find_map(|re| {
            re.captures(token)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim())
        })
    }
}

impl Default for BuildMarkers {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER_PATTERNS).expect("default marker patterns compile")
    }
}

/// Positional gate state while scanning a build page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchGate {
    marker_seen: bool,
    current_arch: Option<String>,
    arch_matches: bool,
}

impl ArchGate {
    /// Record a marker for `marker_arch`; later tokens are gated by it.
    pub fn observe_marker(&mut self, marker_arch: &str, target: Arch) {
        self.marker_seen = true;
        self.arch_matches = marker_arch == target.as_str();
        self.current_arch = Some(marker_arch.to_string());
    }

    /// Whether a file seen now belongs to the target architecture.
    pub fn is_open(&self) -> bool {
        self.marker_seen && self.arch_matches
    }

    /// Architecture of the most recent marker.
    pub fn current_arch(&self) -> Option<&str> {
        self.current_arch.as_deref()
    }
}

/// Filename pattern for installable assets of one version/flavor/arch:
/// `^(<arch>/)?linux.*<version>.*(_all\.deb|<flavor>.*_<arch>\.deb)`.
///
/// # Errors
///
/// Returns the regex error if the pattern cannot be built.
pub fn asset_pattern(
    arch: Arch,
    flavor: Flavor,
    version: &KernelVersion,
) -> Result<Regex, regex::Error> {
    let arch = regex::escape(arch.as_str());
    let flavor = regex::escape(flavor.as_str());
    let version = regex::escape(&version.canonical());
    Regex::new(&format!(
        r"^(?:{arch}/)?linux.*{version}.*(?:_all\.deb|{flavor}.*_{arch}\.deb)"
    ))
}

/// Select the package files for `arch`/`flavor`/`version` from a build page,
/// in document order.
///
/// An empty result is not an error: the build may have failed for this
/// architecture, and the caller decides what "nothing to install" means.
///
/// # Errors
///
/// Returns [`ResolveError::Parse`] for malformed markup.
pub fn resolve_assets(
    page_html: &str,
    arch: Arch,
    flavor: Flavor,
    version: &KernelVersion,
    markers: &BuildMarkers,
) -> Result<Vec<AssetFilename>, ResolveError> {
    let tokens = html::text_tokens(page_html).map_err(|source| ResolveError::Parse {
        page: "release",
        source,
    })?;
    let file_pattern = asset_pattern(arch, flavor, version)?;

    let mut gate = ArchGate::default();
    let mut assets = Vec::new();

    for token in &tokens {
        if let Some(marker_arch) = markers.captured_arch(token) {
            gate.observe_marker(marker_arch, arch);
            trace!(marker = marker_arch, open = gate.is_open(), "build marker");
            continue;
        }
        if gate.is_open() && file_pattern.is_match(token) {
            assets.push(AssetFilename::new(token.as_str()));
        }
    }

    debug!(
        count = assets.len(),
        %arch,
        %flavor,
        version = %version,
        "resolved release assets"
    );
    Ok(assets)
}
