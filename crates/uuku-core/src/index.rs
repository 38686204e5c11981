//! Version index resolution.
//!
//! The mainline index is a plain directory listing. Every entry whose text
//! has the shape `v<major>.<minor>[.<patch>]/` is a build directory; release
//! candidates (`v6.10-rc1/`) and anything else are ignored.

use tracing::debug;
use uuku_schema::{KernelVersion, VersionPrefix};

use crate::error::ResolveError;
use crate::html;

/// Collect every version directory listed in `index_html` that belongs to
/// `prefix`, in document order.
///
/// # Errors
///
/// Returns [`ResolveError::Parse`] if the listing is not well-formed markup.
pub fn collect_versions(
    index_html: &str,
    prefix: Option<&VersionPrefix>,
) -> Result<Vec<KernelVersion>, ResolveError> {
    let tokens = html::text_tokens(index_html).map_err(|source| ResolveError::Parse {
        page: "index",
        source,
    })?;

    Ok(tokens
        .iter()
        .filter_map(|token| KernelVersion::from_dir_entry(token))
        .filter(|version| prefix.is_none_or(|p| p.matches(version)))
        .collect())
}

/// Pick the newest version listed in `index_html`, optionally restricted to
/// `prefix`.
///
/// Versions compare numerically per component, so `6.10` wins over `6.9`.
/// Use [`KernelVersion::canonical`] on the result for the three-component
/// form.
///
/// # Errors
///
/// Returns [`ResolveError::Parse`] for malformed markup and
/// [`ResolveError::NoVersionsFound`] when nothing matches.
pub fn resolve_latest_version(
    index_html: &str,
    prefix: Option<&VersionPrefix>,
) -> Result<KernelVersion, ResolveError> {
    let versions = collect_versions(index_html, prefix)?;
    debug!(count = versions.len(), "collected version directories");

    versions
        .into_iter()
        .max()
        .ok_or_else(|| ResolveError::NoVersionsFound {
            prefix: prefix.map(ToString::to_string),
        })
}
