//! Integrity verification: SHA-256 manifest check plus `gpg` signatures.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{CommandRunner, IntegrityVerifier, run_checked, run_output, run_status};
use crate::error::VerifyError;
use crate::io::checksums::{self, ChecksumStatus};

/// [`IntegrityVerifier`] backed by the user's `gpg` keyring.
#[derive(Debug, Clone)]
pub struct GpgVerifier {
    runner: CommandRunner,
    keyserver: String,
}

impl GpgVerifier {
    pub fn new(keyserver: impl Into<String>) -> Self {
        Self {
            runner: CommandRunner::default(),
            keyserver: keyserver.into(),
        }
    }

    async fn has_key(&self, key_id: &str) -> Result<bool, VerifyError> {
        let mut cmd = self.runner.command("gpg");
        cmd.args(["--list-keys", key_id]);
        Ok(run_output(cmd).await?.status.success())
    }
}

#[async_trait]
impl IntegrityVerifier for GpgVerifier {
    async fn verify_checksums(
        &self,
        dir: &Path,
        manifest: &str,
    ) -> Result<BTreeMap<String, ChecksumStatus>, VerifyError> {
        checksums::verify_manifest(dir, manifest).await
    }

    async fn verify_signature(
        &self,
        dir: &Path,
        signature: &str,
        data: &str,
    ) -> Result<bool, VerifyError> {
        let mut cmd = self.runner.command("gpg");
        cmd.args(["--verify", signature, data]).current_dir(dir);
        Ok(run_status(cmd).await?.success())
    }

    async fn ensure_trusted_key(&self, key_id: &str) -> Result<(), VerifyError> {
        if self.has_key(key_id).await? {
            debug!(key_id, "release key already in keyring");
            return Ok(());
        }

        info!(key_id, keyserver = %self.keyserver, "fetching release key");
        let mut cmd = self.runner.command("gpg");
        cmd.args(["--keyserver", &self.keyserver, "--recv-keys", key_id]);
        run_checked(cmd)
            .await
            .map_err(|source| VerifyError::KeyRetrieval {
                key: key_id.to_string(),
                source,
            })
    }
}
