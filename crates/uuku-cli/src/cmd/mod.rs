//! Command implementations.

pub mod check;
pub mod completions;
pub mod upgrade;

use uuku_core::Config;
use uuku_core::io::fetch::HttpFetcher;
use uuku_core::system::{DebianSystem, Dpkg, GpgVerifier, SbSigner};
use uuku_core::{Collaborators, UpdateError};

/// The real host collaborators for a run with `config`.
#[derive(Debug)]
pub struct Host {
    fetcher: HttpFetcher,
    system: DebianSystem,
    packages: Dpkg,
    verifier: GpgVerifier,
    signer: SbSigner,
}

impl Host {
    pub fn new(config: &Config) -> Result<Self, UpdateError> {
        Ok(Self {
            fetcher: HttpFetcher::new(config.timeout, config.retries)?,
            system: DebianSystem::new(),
            packages: Dpkg::new(config.sudo, config.assume_yes),
            verifier: GpgVerifier::new(config.keyserver.as_str()),
            signer: SbSigner::new(config.sudo),
        })
    }

    pub fn collaborators(&self) -> Collaborators<'_> {
        Collaborators {
            fetcher: &self.fetcher,
            system: &self.system,
            packages: &self.packages,
            verifier: &self.verifier,
            signer: &self.signer,
        }
    }
}
