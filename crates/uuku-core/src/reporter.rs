//! Reporter trait for dependency injection
//!
//! Lets the update pipeline report progress without being coupled to a
//! particular terminal frontend.

use std::path::Path;

use uuku_schema::AssetFilename;

pub trait Reporter: Send + Sync {
    /// A new phase has started (e.g. "Resolving", "Downloading").
    fn section(&self, title: &str);

    /// A download of `file` is about to start.
    fn fetching(&self, file: &str);

    /// `file` finished downloading.
    fn fetched(&self, file: &str, bytes: u64);

    /// `file` is being handed to the package manager.
    fn installing(&self, file: &AssetFilename);

    /// `file` was installed.
    fn installed(&self, file: &AssetFilename);

    /// Installing `file` failed; the run continues.
    fn install_failed(&self, file: &AssetFilename, reason: &str);

    /// A kernel image is being signed.
    fn signing(&self, image: &Path);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn fetching(&self, file: &str) {
        (**self).fetching(file);
    }
    fn fetched(&self, file: &str, bytes: u64) {
        (**self).fetched(file, bytes);
    }
    fn installing(&self, file: &AssetFilename) {
        (**self).installing(file);
    }
    fn installed(&self, file: &AssetFilename) {
        (**self).installed(file);
    }
    fn install_failed(&self, file: &AssetFilename, reason: &str) {
        (**self).install_failed(file, reason);
    }
    fn signing(&self, image: &Path) {
        (**self).signing(image);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn success(&self, msg: &str) {
        (**self).success(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
}

/// A no-op reporter for silent operations (e.g. `--quiet`, testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn fetching(&self, _: &str) {}
    fn fetched(&self, _: &str, _: u64) {}
    fn installing(&self, _: &AssetFilename) {}
    fn installed(&self, _: &AssetFilename) {}
    fn install_failed(&self, _: &AssetFilename, _: &str) {}
    fn signing(&self, _: &Path) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
}
