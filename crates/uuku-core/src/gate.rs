//! Version gate: decides whether the resolved build is worth installing.

use std::fmt;

use uuku_schema::KernelVersion;

use crate::system::{CommandError, LocalSystem};

/// Why an update run stops before downloading anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The running kernel already is the resolved version.
    RunningLatest,
    /// An image package for the resolved version is installed.
    AlreadyInstalled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunningLatest => f.write_str("already running the latest kernel"),
            Self::AlreadyInstalled => f.write_str("latest kernel is already installed"),
        }
    }
}

/// Base version of a kernel release string: the part before the first `-`,
/// canonicalized (`6.9.0-060900-generic` → `6.9.0`, `6.9-rc1` → `6.9.0`).
pub fn running_base_version(release: &str) -> String {
    let base = release.trim().split('-').next().unwrap_or_default();
    KernelVersion::canonicalize(base)
}

/// Package pattern matching the unsigned image of `version`.
pub fn image_package_pattern(version: &KernelVersion) -> String {
    format!("linux-image-unsigned-{}*", version.canonical())
}

/// Check whether installing `resolved` is unnecessary.
///
/// Comparison is exact string equality on canonical versions; a running
/// kernel newer than the resolved build does not cause a skip.
pub async fn should_skip(
    resolved: &KernelVersion,
    running_release: &str,
    system: &dyn LocalSystem,
) -> Result<Option<SkipReason>, CommandError> {
    if running_base_version(running_release) == resolved.canonical() {
        return Ok(Some(SkipReason::RunningLatest));
    }

    if system
        .is_package_installed(&image_package_pattern(resolved))
        .await?
    {
        return Ok(Some(SkipReason::AlreadyInstalled));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Installed(Vec<&'static str>);

    #[async_trait]
    impl LocalSystem for Installed {
        async fn running_release(&self) -> Result<String, CommandError> {
            Ok("6.8.0-31-generic".to_string())
        }

        async fn is_package_installed(&self, pattern: &str) -> Result<bool, CommandError> {
            Ok(self.0.iter().any(|p| *p == pattern))
        }
    }

    fn version(s: &str) -> KernelVersion {
        KernelVersion::parse(s).unwrap()
    }

    #[test]
    fn test_running_base_version() {
        assert_eq!(running_base_version("6.9.0-060900-generic"), "6.9.0");
        assert_eq!(running_base_version("6.10-rc1"), "6.10.0");
        assert_eq!(running_base_version("6.8.12\n"), "6.8.12");
    }

    #[tokio::test]
    async fn test_running_latest_is_skipped() {
        let system = Installed(vec![]);
        let skip = should_skip(&version("6.10"), "6.10.0-061000-generic", &system)
            .await
            .unwrap();
        assert_eq!(skip, Some(SkipReason::RunningLatest));
    }

    #[tokio::test]
    async fn test_installed_image_is_skipped() {
        let system = Installed(vec!["linux-image-unsigned-6.10.0*"]);
        let skip = should_skip(&version("6.10"), "6.9.0-060900-generic", &system)
            .await
            .unwrap();
        assert_eq!(skip, Some(SkipReason::AlreadyInstalled));
    }

    #[tokio::test]
    async fn test_newer_running_kernel_does_not_skip() {
        let system = Installed(vec![]);
        let skip = should_skip(&version("6.9.1"), "6.10.0-061000-generic", &system)
            .await
            .unwrap();
        assert_eq!(skip, None);
    }
}
