//! Small filesystem and hashing helpers shared across the crate.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::fs as async_fs;

/// Stable directory name for a cache key: the first 16 hex chars of the
/// SHA-256 of the base address. Keeps arbitrary address strings (schemes,
/// query parameters) out of filesystem names on every platform.
#[must_use]
pub fn key_digest(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    hex::encode(&digest[..8])
}

/// Recreates `path` as an empty directory, discarding any previous content.
///
/// Used before a fetch so that partial content left behind by an earlier
/// failed attempt never leaks into a successful download.
pub async fn recreate_dir(path: &Path) -> Result<()> {
    if path.exists() {
        async_fs::remove_dir_all(path)
            .await
            .with_context(|| format!("clearing stale download directory {}", path.display()))?;
    }
    async_fs::create_dir_all(path)
        .await
        .with_context(|| format!("creating download directory {}", path.display()))?;
    Ok(())
}
