//! `CHECKSUMS` manifest parsing and SHA-256 verification.
//!
//! The upstream manifest carries `#` comment lines and two sections of
//! `<hex digest>  <filename>` lines, SHA-1 first and SHA-256 second. Only the
//! SHA-256 entries are used.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::error::VerifyError;

const SHA256_HEX_LEN: usize = 64;

/// Verification outcome for one manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecksumStatus {
    Ok,
    Mismatch { expected: String, actual: String },
    Missing,
}

impl ChecksumStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }
}

/// Extract `(filename, sha256)` pairs from manifest text.
///
/// Lines whose digest is not 64 hex characters (comments, SHA-1 entries) are
/// skipped. A leading `*` on the filename (binary-mode marker) is dropped.
pub fn parse_manifest(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let digest = fields.next()?;
            let name = fields.next()?;
            let is_sha256 =
                digest.len() == SHA256_HEX_LEN && digest.bytes().all(|b| b.is_ascii_hexdigit());
            is_sha256.then(|| {
                (
                    name.trim_start_matches('*').to_string(),
                    digest.to_ascii_lowercase(),
                )
            })
        })
        .collect()
}

/// SHA-256 of the file at `path`, or `None` if it does not exist.
pub async fn sha256_file(path: &Path) -> std::io::Result<Option<String>> {
    let mut file = match File::open(path).await {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(Some(hex::encode(hasher.finalize())))
}

/// Check every SHA-256 entry of the manifest `dir/manifest` against the
/// files next to it.
///
/// # Errors
///
/// Returns [`VerifyError::Manifest`] if the manifest cannot be read, and
/// [`VerifyError::Io`] if a listed file exists but cannot be hashed.
pub async fn verify_manifest(
    dir: &Path,
    manifest: &str,
) -> Result<BTreeMap<String, ChecksumStatus>, VerifyError> {
    let path = dir.join(manifest);
    let text = tokio::fs::read_to_string(&path)
        .await
        .map_err(|source| VerifyError::Manifest { path, source })?;

    let mut results = BTreeMap::new();
    for (name, expected) in parse_manifest(&text) {
        let status = match sha256_file(&dir.join(&name)).await? {
            None => ChecksumStatus::Missing,
            Some(actual) if actual == expected => ChecksumStatus::Ok,
            Some(actual) => ChecksumStatus::Mismatch { expected, actual },
        };
        debug!(file = %name, ?status, "checksum");
        results.insert(name, status);
    }
    Ok(results)
}
