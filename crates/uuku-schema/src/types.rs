//! Kernel flavors.

use serde::{Deserialize, Serialize};

/// Kernel build variant, selecting which binary package set is installed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
    /// General purpose kernel (default).
    #[default]
    Generic,
    /// Kernel tuned for low scheduling latency.
    Lowlatency,
}

impl Flavor {
    /// Name used in package filenames (`...-generic_...`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Lowlatency => "lowlatency",
        }
    }
}

impl std::fmt::Display for Flavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Flavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generic" => Ok(Self::Generic),
            "lowlatency" => Ok(Self::Lowlatency),
            _ => Err(format!(
                "Unknown flavor: {s} (expected 'generic' or 'lowlatency')"
            )),
        }
    }
}
