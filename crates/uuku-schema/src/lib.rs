//! Shared types for uuku: kernel versions, version prefixes, architectures,
//! flavors and package asset names.

pub mod arch;
pub mod asset;
pub mod types;
pub mod version;

// Re-exports
pub use arch::*;
pub use asset::*;
pub use types::*;
pub use version::*;

/// Fingerprint of the key that signs mainline `CHECKSUMS` manifests.
pub const MAINLINE_RELEASE_KEY: &str = "60AA7B6F30434AE68E569963E50C6A0917C622B0";

/// Manifest listing digests of every file in a build directory.
pub const CHECKSUMS_FILE: &str = "CHECKSUMS";

/// Detached GPG signature over [`CHECKSUMS_FILE`].
pub const CHECKSUMS_SIGNATURE_FILE: &str = "CHECKSUMS.gpg";
