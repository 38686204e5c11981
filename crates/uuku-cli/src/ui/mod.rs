//! Terminal output: theme, progress reporter and tables.

pub mod output;
pub mod table;
pub mod theme;

pub use output::ConsoleReporter;
pub use theme::Theme;
