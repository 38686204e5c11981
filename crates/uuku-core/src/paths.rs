use dirs::config_dir;
use std::path::PathBuf;

/// Returns the configuration directory, or None if no config directory can be
/// resolved for the current user.
pub fn try_uuku_home() -> Option<PathBuf> {
    if let Ok(val) = std::env::var("UUKU_HOME") {
        return Some(PathBuf::from(val));
    }
    config_dir().map(|c| c.join("uuku"))
}

/// Config file path: ~/.config/uuku/config.toml
pub fn config_path() -> Option<PathBuf> {
    try_uuku_home().map(|home| home.join("config.toml"))
}

/// Prefix for per-run scratch directories under the system temp dir.
pub const SCRATCH_PREFIX: &str = "uuku-";
