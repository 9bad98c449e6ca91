//! The public resolve operation: source string in, local path out.
//!
//! [`Resolver`] composes the source parser, the download cache, and the
//! downloader. A local source passes through verbatim - a caller pointing
//! at an in-repo file is never copied or relocated. A remote source is
//! split into base and subpath, the base is fetched through the cache
//! (at most once per process, see [`crate::cache`]), and the subpath is
//! joined onto the downloaded directory.
//!
//! Each base address downloads into its own directory under the resolver's
//! download root, named by a hash of the base so distinct refs of the same
//! repository never collide. The root defaults to a fresh process-lifetime
//! directory under the system temp dir; set the `FETCH_ONCE_CACHE_DIR`
//! environment variable or use [`Resolver::with_dir`] to relocate it.
//! Downloaded directories are owned by their cache entry and are never
//! removed by this crate - cleanup is the caller's, once the caller knows
//! no resolution still relies on the entry.

use crate::cache::DownloadCache;
use crate::core::ResolveError;
use crate::downloader::{Downloader, GitDownloader};
use crate::source::{self, SourceRef};
use crate::utils::key_digest;
use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Environment variable overriding the default download root.
pub const CACHE_DIR_ENV: &str = "FETCH_ONCE_CACHE_DIR";

/// Joins a downloaded directory with the requested subpath.
///
/// An empty subpath selects the directory itself. No normalization beyond
/// standard path joining, and no existence check - existence is a property
/// of the final path only and is verified by [`Resolver::resolve`].
#[must_use]
pub fn join_subpath(dir: &Path, subpath: &str) -> PathBuf {
    if subpath.is_empty() {
        dir.to_path_buf()
    } else {
        dir.join(subpath)
    }
}

/// Resolves source strings to local filesystem paths.
///
/// Cheap to clone; clones share the download cache and root, so concurrent
/// tasks resolving through clones still fetch each base address once.
///
/// ```rust,no_run
/// use fetch_once::resolver::Resolver;
///
/// # async fn example() -> anyhow::Result<()> {
/// let resolver = Resolver::new()?;
/// let path = resolver
///     .resolve("git::https://github.com/example/repo.git//policy?ref=v1")
///     .await?;
/// assert!(path.exists());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Resolver {
    cache: DownloadCache,
    downloader: Arc<dyn Downloader>,
    download_root: PathBuf,
    fetch_timeout: Option<Duration>,
}

impl Resolver {
    /// Creates a resolver with the default git downloader.
    ///
    /// The download root honors `FETCH_ONCE_CACHE_DIR` when set; otherwise
    /// a unique directory is created under the system temp dir and kept for
    /// the caller to clean up.
    ///
    /// # Errors
    ///
    /// Returns an error if the download root cannot be created.
    pub fn new() -> Result<Self> {
        let root = match std::env::var_os(CACHE_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => tempfile::Builder::new()
                .prefix("fetch-once-")
                .tempdir()
                .context("creating download root in system temp dir")?
                .keep(),
        };
        Self::with_dir(root)
    }

    /// Creates a resolver downloading under an explicit root directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn with_dir(download_root: impl Into<PathBuf>) -> Result<Self> {
        let download_root = download_root.into();
        std::fs::create_dir_all(&download_root).with_context(|| {
            format!("creating download root {}", download_root.display())
        })?;
        Ok(Self {
            cache: DownloadCache::new(),
            downloader: Arc::new(GitDownloader::new()),
            download_root,
            fetch_timeout: None,
        })
    }

    /// Replaces the transport used to materialize remote base addresses.
    #[must_use]
    pub fn with_downloader(mut self, downloader: Arc<dyn Downloader>) -> Self {
        self.downloader = downloader;
        self
    }

    /// Shares an existing download cache instead of this resolver's own.
    #[must_use]
    pub fn with_cache(mut self, cache: DownloadCache) -> Self {
        self.cache = cache;
        self
    }

    /// Bounds each fetch; on expiry the owning call and all concurrent
    /// waiters on that base address fail with the timeout as cause.
    #[must_use]
    pub fn with_fetch_timeout(mut self, duration: Duration) -> Self {
        self.fetch_timeout = Some(duration);
        self
    }

    /// The directory remote base addresses download into.
    #[must_use]
    pub fn download_root(&self) -> &Path {
        &self.download_root
    }

    /// Read access to the download cache, mainly for callers that clean up
    /// downloaded directories and for tests.
    #[must_use]
    pub fn cache(&self) -> &DownloadCache {
        &self.cache
    }

    /// Resolves a source string to a local path.
    ///
    /// Local sources come back verbatim with no fetch. Remote sources
    /// return a path inside the downloaded base directory; the path is
    /// guaranteed to exist on success.
    ///
    /// Safe to call from any number of tasks concurrently with no external
    /// synchronization.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::InvalidSource`] for malformed input
    /// - [`ResolveError::FetchFailed`] when the downloader fails (or the
    ///   fetch timeout fires)
    /// - [`ResolveError::PathNotFound`] when the subpath names nothing
    ///   inside a successfully fetched base
    ///
    /// All errors carry the source string being resolved as context.
    pub async fn resolve(&self, src: &str) -> Result<PathBuf> {
        let parsed =
            source::parse(src).with_context(|| format!("resolving source '{src}'"))?;

        match parsed {
            SourceRef::Local(path) => {
                tracing::debug!(source = src, "local source, returning verbatim");
                Ok(path)
            }
            SourceRef::Remote(remote) => {
                let dir = self
                    .fetch_base(&remote.base)
                    .await
                    .with_context(|| format!("resolving source '{src}'"))?;

                let final_path = join_subpath(&dir, &remote.subpath);
                if !final_path.exists() {
                    return Err(ResolveError::PathNotFound { path: final_path }).with_context(
                        || {
                            format!(
                                "resolving source '{src}' (base '{}', subpath '{}')",
                                remote.base, remote.subpath
                            )
                        },
                    );
                }
                Ok(final_path)
            }
        }
    }

    /// Fetches a base address through the cache, downloading it at most
    /// once per process.
    async fn fetch_base(&self, base: &str) -> Result<PathBuf> {
        self.cache
            .get_or_fetch(base, || async move {
                let dest = self.download_root.join(format!("src_{}", key_digest(base)));

                // Clears partial content from an earlier failed attempt;
                // nothing here was ever published into the cache.
                crate::utils::recreate_dir(&dest).await?;

                tracing::debug!(base, dest = %dest.display(), "downloading base address");

                let fetch = self.downloader.fetch(base, &dest);
                let outcome = match self.fetch_timeout {
                    Some(duration) => match tokio::time::timeout(duration, fetch).await {
                        Ok(outcome) => outcome,
                        Err(_) => Err(anyhow!("fetch timed out after {duration:?}")),
                    },
                    None => fetch.await,
                };

                // Wrap rather than flatten: the typed downloader error
                // (GitNotFound, GitCommandError, ...) stays in the chain
                // for callers that downcast past the FetchFailed layer.
                if let Err(err) = outcome {
                    let failure = ResolveError::FetchFailed {
                        address: base.to_string(),
                        reason: format!("{err:#}"),
                    };
                    return Err(err.context(failure));
                }

                Ok(dest)
            })
            .await
    }
}
