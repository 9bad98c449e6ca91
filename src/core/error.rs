//! Error handling for fetch-once.
//!
//! The crate uses a two-layer error strategy, mirroring common Rust service
//! code: strongly-typed [`ResolveError`] variants for the failure modes
//! callers may want to match on, carried inside [`anyhow::Error`] so that
//! call sites can attach context (which source string, base address, and
//! subpath were being resolved) without inventing wrapper variants.
//!
//! # Error categories
//!
//! - **Source parsing**: [`ResolveError::InvalidSource`] - the input string
//!   cannot be classified or split.
//! - **Transport**: [`ResolveError::FetchFailed`] - the downloader reported
//!   an error for a base address; carries the rendered underlying cause.
//! - **Resolution**: [`ResolveError::PathNotFound`] - the joined final path
//!   does not exist after a nominally successful fetch (base/subpath
//!   mismatch).
//! - **Git transport**: [`ResolveError::GitNotFound`] and
//!   [`ResolveError::GitCommandError`] - surfaced by the default git-backed
//!   downloader.
//!
//! None of these are recovered inside the crate. A failed fetch is never
//! published into the download cache, so a later call for the same base
//! address starts a fresh fetch attempt.

use std::fmt;
use std::path::PathBuf;

/// The error type for source resolution failures.
///
/// Each variant represents a distinct failure mode with enough context to
/// report the problem without re-deriving it from the call site. Callers
/// matching on a specific variant can use
/// [`anyhow::Error::downcast_ref`] on the error returned by
/// [`Resolver::resolve`](crate::resolver::Resolver::resolve).
// Display and Error are implemented by hand rather than derived with
// thiserror: the derive would treat the `source` field of `InvalidSource`
// (a String) as the Error::source, which does not compile.
#[derive(Debug)]
#[non_exhaustive]
pub enum ResolveError {
    /// The source string is malformed and cannot be classified or split.
    ///
    /// Raised for empty input, a forced-getter prefix with nothing after it
    /// (`git::`), or a URL scheme with an empty authority (`https://`).
    /// Malformed input is always reported, never silently treated as a
    /// local path.
    InvalidSource {
        /// The offending source string as given by the caller
        source: String,
        /// Why it could not be parsed
        reason: String,
    },

    /// The downloader failed to materialize a base address.
    ///
    /// Concurrent callers waiting on the same in-flight fetch all receive
    /// this same failure rather than each retrying independently; the cause
    /// is the winning caller's error rendered with its full context chain.
    FetchFailed {
        /// The base address (including fetch parameters) that failed
        address: String,
        /// The rendered underlying cause
        reason: String,
    },

    /// The final joined path does not exist after a successful fetch.
    ///
    /// This means the base address downloaded fine but the requested
    /// subpath names nothing inside it.
    PathNotFound {
        /// The joined path that was expected to exist
        path: PathBuf,
    },

    /// Git executable not found in PATH.
    GitNotFound,

    /// A git command returned a non-zero exit code.
    GitCommandError {
        /// The git operation that failed (e.g. "clone", "fetch", "checkout")
        operation: String,
        /// The error output from the git command
        stderr: String,
    },
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::InvalidSource { source, reason } => {
                write!(f, "invalid source '{source}': {reason}")
            }
            ResolveError::FetchFailed { address, reason } => {
                write!(f, "fetch failed for '{address}': {reason}")
            }
            ResolveError::PathNotFound { path } => {
                write!(f, "resolved path does not exist: {}", path.display())
            }
            ResolveError::GitNotFound => {
                write!(f, "git is not installed or not found in PATH")
            }
            ResolveError::GitCommandError { operation, .. } => {
                write!(f, "git operation failed: {operation}")
            }
        }
    }
}

impl std::error::Error for ResolveError {}
