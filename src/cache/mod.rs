//! Process-wide download cache with at-most-one-fetch-per-key semantics.
//!
//! [`DownloadCache`] maps a normalized base address to the local directory
//! holding its downloaded content. The map is the only shared mutable state
//! in the crate, and every mutation goes through
//! [`get_or_fetch`](DownloadCache::get_or_fetch), which guarantees that the
//! fetch closure runs at most once per key no matter how many callers ask
//! for that key concurrently.
//!
//! # Coordination
//!
//! Each entry is a small state machine:
//!
//! - no entry (implicit) - nobody has requested the key yet
//! - `Pending` - one caller owns the fetch; the entry holds a notification
//!   handle everyone else waits on
//! - `Ready` - the fetch completed and the directory is published for all
//!   callers
//!
//! The first caller to claim a vacant slot inserts `Pending` and runs the
//! fetch. Concurrent callers for the same key find the `Pending` state,
//! register on its [`Notify`] handle, and suspend - this is the only
//! blocking point in the crate. On success the owner publishes `Ready` and
//! wakes everyone; on failure it records the rendered error in the shared
//! in-flight cell, removes the entry, and wakes everyone. Waiters therefore
//! observe the same outcome as the owner, success or failure, while a
//! *later* call for the failed key finds a vacant slot and starts a fresh
//! fetch. A failed or partial fetch is never published.
//!
//! A plain read-check-then-write map cannot provide this: two callers
//! arriving before any entry exists would both trigger the fetch. `DashMap`'s
//! entry API makes the claim atomic, and fetches for distinct keys never
//! block each other.
//!
//! The cache is an in-memory index over disk state written by the
//! downloader. Entries live for the lifetime of the process; removing a
//! downloaded directory out-of-band leaves a dangling entry.

use crate::core::ResolveError;
use anyhow::Result;
use dashmap::DashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Shared handle for one in-flight fetch.
///
/// Waiters hold a clone of this across the suspension so that a failure can
/// reach them even after the map entry has been removed.
#[derive(Debug, Default)]
struct InFlight {
    /// Wakes all waiters once the fetch completes, either way.
    notify: Notify,
    /// Rendered error from the owning fetch, set before the entry is
    /// removed and waiters are woken. `None` means success.
    failure: Mutex<Option<String>>,
}

/// State of a cache entry during and after its fetch.
#[derive(Debug)]
enum FetchState {
    /// One caller is fetching this key; everyone else waits on the handle.
    Pending(Arc<InFlight>),
    /// Fetch completed; the directory is published for all callers.
    Ready(PathBuf),
}

/// Concurrency-safe map from base address to downloaded directory.
///
/// Explicitly constructed and passed into the
/// [`Resolver`](crate::resolver::Resolver) rather than living in a global,
/// so tests can instantiate isolated caches.
///
/// ```rust
/// use fetch_once::cache::DownloadCache;
/// use std::path::PathBuf;
///
/// # async fn example() -> anyhow::Result<()> {
/// let cache = DownloadCache::new();
/// let dir = cache
///     .get_or_fetch("git::https://example.com/repo.git?ref=main", || async {
///         // download happens here, exactly once per key
///         Ok(PathBuf::from("/tmp/downloads/abc123"))
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct DownloadCache {
    entries: Arc<DashMap<String, FetchState>>,
}

impl Clone for DownloadCache {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
        }
    }
}

impl DownloadCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the published directory for `key`, if its fetch completed.
    ///
    /// In-flight fetches are not visible here; this never blocks.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<PathBuf> {
        self.entries.get(key).and_then(|entry| match entry.value() {
            FetchState::Ready(dir) => Some(dir.clone()),
            FetchState::Pending(_) => None,
        })
    }

    /// Number of published entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.value(), FetchState::Ready(_)))
            .count()
    }

    /// Returns true when no entry has been published yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the directory for `key`, running `fetch` if - and only if -
    /// no other caller has fetched or is fetching it.
    ///
    /// For a given key, `fetch` runs at most once across the lifetime of
    /// the cache regardless of concurrency. A hit returns immediately.
    /// Callers that lose the claim race suspend until the owning fetch
    /// completes, then receive the same directory or, on failure, a
    /// [`ResolveError::FetchFailed`] carrying the owner's rendered error.
    /// A failed fetch leaves no entry behind, so a subsequent call retries
    /// instead of replaying the failure.
    ///
    /// # Errors
    ///
    /// Propagates the fetch error unmodified to the owning caller;
    /// concurrent waiters receive [`ResolveError::FetchFailed`] with the
    /// same cause.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<PathBuf>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<PathBuf>>,
    {
        let in_flight = loop {
            match self.entries.entry(key.to_string()) {
                dashmap::mapref::entry::Entry::Occupied(entry) => match entry.get() {
                    FetchState::Ready(dir) => {
                        tracing::debug!(key, dir = %dir.display(), "download cache hit");
                        return Ok(dir.clone());
                    }
                    FetchState::Pending(existing) => {
                        let existing = Arc::clone(existing);
                        // Register interest BEFORE releasing the entry.
                        // Notify only wakes futures that are already
                        // waiting, so creating the future after drop()
                        // could miss a wakeup from a fetch that finishes
                        // in between.
                        let notified = existing.notify.notified();
                        drop(entry);

                        tracing::debug!(key, "waiting for in-flight fetch");
                        notified.await;

                        // The fetch we waited on failed: report its error
                        // rather than racing to refetch. Checked before the
                        // map so a newer caller's retry cannot mask it.
                        let failure = existing.failure.lock().unwrap().clone();
                        if let Some(reason) = failure {
                            return Err(ResolveError::FetchFailed {
                                address: key.to_string(),
                                reason,
                            }
                            .into());
                        }
                        // Success path: loop back and read the Ready entry.
                        continue;
                    }
                },
                dashmap::mapref::entry::Entry::Vacant(entry) => {
                    let in_flight = Arc::new(InFlight::default());
                    entry.insert(FetchState::Pending(Arc::clone(&in_flight)));
                    break in_flight;
                }
            }
        };

        // This caller owns the fetch for the key.
        tracing::debug!(key, "starting fetch");
        match fetch().await {
            Ok(dir) => {
                self.entries
                    .insert(key.to_string(), FetchState::Ready(dir.clone()));
                in_flight.notify.notify_waiters();
                tracing::debug!(key, dir = %dir.display(), "fetch complete, entry published");
                Ok(dir)
            }
            Err(err) => {
                // Record the cause for waiters, then clear the claim so a
                // later call retries instead of deadlocking or replaying a
                // partial result. Waiters wrap the stored string in their
                // own FetchFailed, so store the underlying cause rather
                // than re-rendering an already-wrapped failure.
                let reason = match err.downcast_ref::<ResolveError>() {
                    Some(ResolveError::FetchFailed { reason, .. }) => reason.clone(),
                    _ => format!("{err:#}"),
                };
                *in_flight.failure.lock().unwrap() = Some(reason);
                self.entries.remove(key);
                in_flight.notify.notify_waiters();
                tracing::debug!(key, "fetch failed, entry cleared");
                Err(err)
            }
        }
    }
}
