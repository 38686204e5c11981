//! Console implementation of the core [`Reporter`].

use std::path::Path;

use crossterm::style::Stylize;
use uuku_core::Reporter;
use uuku_schema::AssetFilename;

use super::theme::{Theme, format_size};

/// Prints progress lines to stdout and problems to stderr.
#[derive(Debug, Clone, Default)]
pub struct ConsoleReporter {
    theme: Theme,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn line(&self, icon: &str, msg: &str) {
        println!("  {icon} {msg}");
    }
}

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        println!();
        println!("{}", title.with(self.theme.colors.header).bold());
    }

    fn fetching(&self, file: &str) {
        let icon = self.theme.icons.active.with(self.theme.colors.secondary);
        self.line(&icon.to_string(), &file.with(self.theme.colors.package_name).to_string());
    }

    fn fetched(&self, file: &str, bytes: u64) {
        let icon = self.theme.icons.success.with(self.theme.colors.success);
        let size = format_size(bytes).with(self.theme.colors.secondary);
        self.line(&icon.to_string(), &format!("{file} {size}"));
    }

    fn installing(&self, file: &AssetFilename) {
        let icon = self.theme.icons.active.with(self.theme.colors.secondary);
        self.line(
            &icon.to_string(),
            &file.as_str().with(self.theme.colors.package_name).to_string(),
        );
    }

    fn installed(&self, file: &AssetFilename) {
        let icon = self.theme.icons.success.with(self.theme.colors.success);
        self.line(&icon.to_string(), file.as_str());
    }

    fn install_failed(&self, file: &AssetFilename, reason: &str) {
        let icon = self.theme.icons.error.with(self.theme.colors.error);
        eprintln!("  {icon} {file} {}", reason.with(self.theme.colors.error));
    }

    fn signing(&self, image: &Path) {
        let icon = self.theme.icons.active.with(self.theme.colors.secondary);
        self.line(&icon.to_string(), &image.display().to_string());
    }

    fn info(&self, msg: &str) {
        let icon = self.theme.icons.info.with(self.theme.colors.secondary);
        self.line(&icon.to_string(), msg);
    }

    fn success(&self, msg: &str) {
        let icon = self.theme.icons.success.with(self.theme.colors.success);
        self.line(&icon.to_string(), &msg.with(self.theme.colors.success).to_string());
    }

    fn warning(&self, msg: &str) {
        let icon = self.theme.icons.warning.with(self.theme.colors.warning);
        eprintln!("  {icon} {}", msg.with(self.theme.colors.warning));
    }
}
