//! Debian architecture names.

/// Debian architecture a mainline build is published for.
///
/// The mainline build pages group packages per architecture directory
/// (`amd64/`, `arm64/`, ...), and the architecture name is also the
/// `_<arch>.deb` suffix of flavor-specific packages.
///
/// # Example
///
/// ```
/// use uuku_schema::Arch;
///
/// let arch: Arch = "x86_64".parse().unwrap();
/// assert_eq!(arch, Arch::Amd64);
/// assert_eq!(arch.as_str(), "amd64");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// 64-bit x86 (Intel/AMD)
    #[default]
    Amd64,
    /// 64-bit ARM
    Arm64,
    /// 32-bit ARM, hard float
    Armhf,
    /// 32-bit x86
    I386,
    /// 64-bit little-endian POWER
    Ppc64el,
    /// IBM Z
    S390x,
    /// 64-bit RISC-V
    Riscv64,
}

impl Arch {
    /// Debian name, as used in package filenames and build directories.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::Arm64 => "arm64",
            Self::Armhf => "armhf",
            Self::I386 => "i386",
            Self::Ppc64el => "ppc64el",
            Self::S390x => "s390x",
            Self::Riscv64 => "riscv64",
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "amd64" | "x86_64" => Ok(Self::Amd64),
            "arm64" | "aarch64" => Ok(Self::Arm64),
            "armhf" => Ok(Self::Armhf),
            "i386" => Ok(Self::I386),
            "ppc64el" => Ok(Self::Ppc64el),
            "s390x" => Ok(Self::S390x),
            "riscv64" => Ok(Self::Riscv64),
            _ => Err(format!("Unknown architecture: {s}")),
        }
    }
}
