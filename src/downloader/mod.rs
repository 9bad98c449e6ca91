//! Transport layer that materializes a remote base address onto disk.
//!
//! The [`Downloader`] trait is the seam between the resolution logic and the
//! network: the [`Resolver`](crate::resolver::Resolver) decides *where* a
//! base address lands and *how often* it is fetched (exactly once, via the
//! [`DownloadCache`](crate::cache::DownloadCache)), while the downloader
//! only knows how to fill a destination directory. Tests inject counting or
//! failing downloaders through the same seam.
//!
//! The default implementation is [`GitDownloader`], which shells out to the
//! system `git` binary. Any transport-level retry policy belongs to the
//! downloader; the rest of the crate never retries on its own.

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

pub mod git;

pub use git::GitDownloader;

/// Materializes the content of a base address into a local directory.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Fetches `address` into `dest`.
    ///
    /// `dest` exists and is empty when called. The address is the full base
    /// address as it appears in the source string, fetch parameters
    /// included; interpreting both is the downloader's job.
    ///
    /// # Errors
    ///
    /// Any error fails the single in-flight fetch for this address; the
    /// cache guarantees the failure is never published and a later call
    /// starts fresh.
    async fn fetch(&self, address: &str, dest: &Path) -> Result<()>;
}
