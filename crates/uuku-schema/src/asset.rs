//! Package asset filenames found on a mainline build page.
//!
//! Filenames are listed either bare (`linux-image-unsigned-..._amd64.deb`)
//! or prefixed by their architecture directory (`amd64/linux-...`). The
//! prefix is part of the page token but never part of the local filename.

use std::fmt;
use std::path::PathBuf;

use crate::Arch;

/// Role of a package within a kernel package set.
///
/// Variants are declared in install order: headers shared by all flavors,
/// then flavor headers, modules and finally the image. `dpkg` does not
/// resolve dependencies between local `.deb` files on its own, so this order
/// has to be respected by whoever installs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssetRole {
    /// `linux-headers-*_all.deb`
    HeadersAll,
    /// `linux-headers-*-<flavor>_<arch>.deb`
    HeadersFlavor,
    /// `linux-modules-*-<flavor>_<arch>.deb`
    ModulesFlavor,
    /// `linux-image-*-<flavor>_<arch>.deb`
    ImageFlavor,
}

impl AssetRole {
    /// Every role, in install order.
    pub const INSTALL_ORDER: [Self; 4] = [
        Self::HeadersAll,
        Self::HeadersFlavor,
        Self::ModulesFlavor,
        Self::ImageFlavor,
    ];

    /// Short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::HeadersAll => "headers (all)",
            Self::HeadersFlavor => "headers",
            Self::ModulesFlavor => "modules",
            Self::ImageFlavor => "image",
        }
    }
}

impl fmt::Display for AssetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A downloadable file name as it appeared on the build page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetFilename(String);

impl AssetFilename {
    /// Wrap a page token.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The token exactly as listed.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Local filename: the token with any leading `<arch>/` removed.
    ///
    /// # Example
    ///
    /// ```
    /// use uuku_schema::{Arch, AssetFilename};
    ///
    /// let f = AssetFilename::new("amd64/linux-headers-6.9.1_all.deb");
    /// assert_eq!(f.local_name(Arch::Amd64), "linux-headers-6.9.1_all.deb");
    /// ```
    pub fn local_name(&self, arch: Arch) -> &str {
        self.0
            .strip_prefix(arch.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(&self.0)
    }

    /// Boot image path that installing this package produces, if it is a
    /// kernel image package.
    ///
    /// `linux-image-unsigned-6.9.1-060901-generic_6.9.1-060901.2024_amd64.deb`
    /// installs `/boot/vmlinuz-6.9.1-060901-generic`: the package name is the
    /// part before the first `_`, and everything after its third `-` is the
    /// kernel release.
    pub fn boot_image_path(&self, arch: Arch) -> Option<PathBuf> {
        let local = self.local_name(arch);
        if !local.starts_with("linux-image") {
            return None;
        }
        let package = local.split('_').next().unwrap_or(local);
        let release: Vec<&str> = package.split('-').skip(3).collect();
        if release.is_empty() {
            return None;
        }
        Some(PathBuf::from(format!("/boot/vmlinuz-{}", release.join("-"))))
    }
}

impl fmt::Display for AssetFilename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetFilename {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AssetFilename {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_name_strips_only_own_arch() {
        let prefixed = AssetFilename::new("arm64/linux-image-6.9.1-generic_arm64.deb");
        assert_eq!(
            prefixed.local_name(Arch::Arm64),
            "linux-image-6.9.1-generic_arm64.deb"
        );
        assert_eq!(prefixed.local_name(Arch::Amd64), prefixed.as_str());

        let bare = AssetFilename::new("linux-image-6.9.1-generic_amd64.deb");
        assert_eq!(bare.local_name(Arch::Amd64), bare.as_str());
    }

    #[test]
    fn test_boot_image_path() {
        let image = AssetFilename::new(
            "amd64/linux-image-unsigned-6.9.1-060901-generic_6.9.1-060901.202405171142_amd64.deb",
        );
        assert_eq!(
            image.boot_image_path(Arch::Amd64),
            Some(PathBuf::from("/boot/vmlinuz-6.9.1-060901-generic"))
        );

        let modules = AssetFilename::new(
            "linux-modules-6.9.1-060901-generic_6.9.1-060901.202405171142_amd64.deb",
        );
        assert_eq!(modules.boot_image_path(Arch::Amd64), None);
    }

    #[test]
    fn test_roles_sort_in_install_order() {
        let mut roles = vec![
            AssetRole::ImageFlavor,
            AssetRole::HeadersAll,
            AssetRole::ModulesFlavor,
            AssetRole::HeadersFlavor,
        ];
        roles.sort();
        assert_eq!(roles, AssetRole::INSTALL_ORDER);
    }
}
