//! Install ordering for a downloaded kernel package set.

use uuku_schema::{AssetFilename, AssetRole, Flavor};

/// Classify a local package filename into its install role for `flavor`.
///
/// Role patterns, checked in install order (first match wins):
/// `linux-headers-*_all`, `linux-headers-*-<flavor>`,
/// `linux-modules-*-<flavor>`, `linux-image*-<flavor>`.
pub fn classify(local_name: &str, flavor: Flavor) -> Option<AssetRole> {
    let flavor_tag = format!("-{}", flavor.as_str());
    let after = |prefix: &str, needle: &str| {
        local_name
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.contains(needle))
    };

    AssetRole::INSTALL_ORDER.into_iter().find(|role| match role {
        AssetRole::HeadersAll => after("linux-headers-", "_all"),
        AssetRole::HeadersFlavor => after("linux-headers-", flavor_tag.as_str()),
        AssetRole::ModulesFlavor => after("linux-modules-", flavor_tag.as_str()),
        AssetRole::ImageFlavor => after("linux-image", flavor_tag.as_str()),
    })
}

/// One package in an [`InstallPlan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPackage {
    /// Which group the package is installed with.
    pub role: AssetRole,
    /// Local filename inside the download directory.
    pub file: AssetFilename,
}

/// Packages to hand to the package manager, one at a time, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallPlan {
    steps: Vec<PlannedPackage>,
}

impl InstallPlan {
    /// Steps in install order.
    pub fn steps(&self) -> &[PlannedPackage] {
        &self.steps
    }

    /// True when nothing matched the architecture and flavor.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of packages.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Filenames in install order.
    pub fn files(&self) -> impl Iterator<Item = &AssetFilename> {
        self.steps.iter().map(|step| &step.file)
    }
}

/// Order `downloaded` (local filenames) for installation.
///
/// Files are grouped by role in the fixed order headers(all), headers,
/// modules, image; discovery order is kept within a group. Files without a
/// role, such as `CHECKSUMS`, are left out.
pub fn plan_install<I>(downloaded: I, flavor: Flavor) -> InstallPlan
where
    I: IntoIterator<Item = AssetFilename>,
{
    let mut steps: Vec<PlannedPackage> = downloaded
        .into_iter()
        .filter_map(|file| {
            classify(file.as_str(), flavor).map(|role| PlannedPackage { role, file })
        })
        .collect();

    // Stable: keeps discovery order inside each role.
    steps.sort_by_key(|step| step.role);

    InstallPlan { steps }
}
