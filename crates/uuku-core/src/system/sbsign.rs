//! Secure Boot image signing with `sbsign`.

use std::path::Path;

use async_trait::async_trait;

use super::{CommandError, CommandRunner, ImageSigner, run_checked};
use crate::config::SigningKeys;

/// Signs images in place with `MOK.priv`/`MOK.pem` from the key directory.
#[derive(Debug, Clone, Copy)]
pub struct SbSigner {
    runner: CommandRunner,
}

impl SbSigner {
    pub fn new(sudo: bool) -> Self {
        Self {
            runner: CommandRunner::new(sudo),
        }
    }
}

#[async_trait]
impl ImageSigner for SbSigner {
    async fn sign_image(&self, keys: &SigningKeys, image: &Path) -> Result<(), CommandError> {
        let mut cmd = self.runner.privileged("sbsign");
        cmd.arg("--key")
            .arg(keys.key_path())
            .arg("--cert")
            .arg(keys.cert_path())
            .arg(image)
            .arg("--output")
            .arg(image);
        run_checked(cmd).await
    }
}
