//! Source string classification and splitting.
//!
//! A source string names either a local filesystem path or a remote,
//! getter-style address. Remote addresses follow the grammar
//!
//! ```text
//! [<getter>::]<scheme>://<host>/<repo>[//<subpath>][?<params>]
//! ```
//!
//! where the optional forced-getter prefix (`git::`) and the scheme mark the
//! address as fetchable, the first `//` after the scheme separates the base
//! address from a subpath inside it, and trailing `?<params>` (such as a
//! `ref=` version pin) belong to the base address even when written after
//! the subpath.
//!
//! Classification rule: a source is local when it does not match the remote
//! grammar *and* it names an existing path on the local filesystem.
//! Everything else is remote - a plain-looking path that does not exist is
//! handed to the downloader rather than guessed at, so typos surface as
//! fetch errors instead of being silently passed through.
//!
//! Both [`parse`] and [`split_base_subpath`] are pure functions; no locking
//! is needed around them.

use crate::core::ResolveError;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// A classified source string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    /// A filesystem path, relative or absolute, kept verbatim.
    Local(PathBuf),
    /// A remote address split into base and subpath.
    Remote(RemoteRef),
}

/// A remote source split into its cacheable base address and the subpath
/// selected inside it.
///
/// The base address keeps any fetch parameters attached, so two sources that
/// differ only in subpath share the same base - and therefore the same
/// download - while sources pinned to different refs do not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRef {
    /// The fetchable unit, including the forced-getter prefix and any
    /// `?<params>` suffix. Used verbatim as the download cache key.
    pub base: String,
    /// Path inside the downloaded tree; empty selects the tree root.
    pub subpath: String,
}

/// Classifies a source string as local or remote.
///
/// # Errors
///
/// Returns [`ResolveError::InvalidSource`] for input that matches neither
/// grammar: an empty string, a forced-getter prefix with nothing after it,
/// or a URL scheme with an empty remainder. Malformed input is never
/// silently treated as a local path.
pub fn parse(source: &str) -> Result<SourceRef> {
    if source.is_empty() {
        return Err(ResolveError::InvalidSource {
            source: source.to_string(),
            reason: "source string is empty".to_string(),
        }
        .into());
    }

    if is_remote_address(source) {
        validate_remote(source)?;
        let (base, subpath) = split_base_subpath(source);
        return Ok(SourceRef::Remote(RemoteRef { base, subpath }));
    }

    // Tilde expansion for the existence check only; the caller gets the
    // original string back untouched.
    let expanded = shellexpand::tilde(source);
    if Path::new(expanded.as_ref()).exists() {
        return Ok(SourceRef::Local(PathBuf::from(source)));
    }

    // Not remote-looking and not on disk: treat as remote and let the
    // downloader report the failure.
    let (base, subpath) = split_base_subpath(source);
    Ok(SourceRef::Remote(RemoteRef { base, subpath }))
}

/// Returns true when the source matches the remote-address grammar: a
/// forced-getter prefix (`git::`), a URL scheme (`https://`), or an
/// scp-style git address (`git@host:path`).
pub fn is_remote_address(source: &str) -> bool {
    forced_prefix_end(source).is_some()
        || scheme_end(source).is_some()
        || (source.starts_with("git@") && source.contains(':'))
}

/// Splits a remote source into `(base, subpath)`.
///
/// The scan for the `//` delimiter starts after the forced-getter prefix and
/// the scheme's own `//`, so `https://` never counts as a subpath break. Any
/// `?<params>` suffix found after the subpath is stripped from the subpath
/// and reattached to the base, keeping version pins on the cacheable unit:
///
/// ```
/// use fetch_once::source::split_base_subpath;
///
/// let (base, sub) =
///     split_base_subpath("git::https://example.com/repo.git//sub/dir?ref=main");
/// assert_eq!(base, "git::https://example.com/repo.git?ref=main");
/// assert_eq!(sub, "sub/dir");
/// ```
pub fn split_base_subpath(source: &str) -> (String, String) {
    let mut offset = forced_prefix_end(source).unwrap_or(0);
    if let Some(end) = scheme_end(&source[offset..]) {
        offset += end;
    }

    match source[offset..].find("//") {
        None => (source.to_string(), String::new()),
        Some(rel) => {
            let idx = offset + rel;
            let base = &source[..idx];
            let rest = &source[idx + 2..];
            match rest.find('?') {
                Some(q) => (format!("{base}{}", &rest[q..]), rest[..q].to_string()),
                None => (base.to_string(), rest.to_string()),
            }
        }
    }
}

/// Byte offset just past a forced-getter prefix (`git::`), if present.
fn forced_prefix_end(source: &str) -> Option<usize> {
    let idx = source.find("::")?;
    if idx > 0 && source[..idx].chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(idx + 2)
    } else {
        None
    }
}

/// Byte offset just past a URL scheme (`https://`), if present.
fn scheme_end(source: &str) -> Option<usize> {
    let idx = source.find("://")?;
    let scheme = &source[..idx];
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
    {
        Some(idx + 3)
    } else {
        None
    }
}

fn validate_remote(source: &str) -> Result<()> {
    let mut rest = source;
    if let Some(end) = forced_prefix_end(rest) {
        rest = &rest[end..];
        if rest.is_empty() {
            return Err(ResolveError::InvalidSource {
                source: source.to_string(),
                reason: "nothing follows the forced getter prefix".to_string(),
            }
            .into());
        }
    }
    if let Some(end) = scheme_end(rest) {
        if rest[end..].is_empty() {
            return Err(ResolveError::InvalidSource {
                source: source.to_string(),
                reason: "URL scheme with empty remainder".to_string(),
            }
            .into());
        }
    }
    Ok(())
}
