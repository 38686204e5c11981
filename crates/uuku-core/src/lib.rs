//! Core library for uuku.
//!
//! Resolves the newest mainline kernel build from the upstream listing,
//! selects the package files for one architecture and flavor, and drives
//! download, verification, installation and signing through pluggable
//! collaborators (see [`system`] and [`io::fetch`]).

pub mod config;
pub mod error;
pub mod gate;
pub mod html;
pub mod index;
pub mod io;
pub mod paths;
pub mod pipeline;
pub mod plan;
pub mod release;
pub mod reporter;
pub mod system;

pub use config::{Config, Settings};
pub use error::UpdateError;
pub use pipeline::{Collaborators, UpdateOutcome, Updater};
pub use reporter::{NullReporter, Reporter};

/// User Agent string for every upstream request
pub const USER_AGENT: &str = concat!("uuku/", env!("CARGO_PKG_VERSION"));
