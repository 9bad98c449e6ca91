//! fetch-once - single-fetch resolution of local and remote source addresses
//!
//! This crate turns a source string into a local filesystem path. A source is
//! either a plain filesystem path (returned verbatim, never copied or
//! relocated) or a remote, getter-style address naming a fetchable base plus
//! an optional subpath inside it:
//!
//! ```text
//! git::https://github.com/example/repo.git//policies/enforce.rego?ref=v1.2.0
//! \__________________________________________/\_____________________/\________/
//!            base address                          subpath           parameters
//! ```
//!
//! The base address (including its fetch parameters) is the unit that is
//! downloaded and cached; the subpath selects a file or directory inside the
//! downloaded tree. Many concurrent callers may resolve the same base - or
//! sibling subpaths under it - and the network fetch still happens exactly
//! once per distinct base address for the lifetime of the process.
//!
//! # Architecture
//!
//! - [`source`] - source string classification and base/subpath splitting
//! - [`cache`] - the concurrency-safe, at-most-one-fetch-per-key download cache
//! - [`downloader`] - the [`Downloader`](downloader::Downloader) transport
//!   trait and the git-backed default implementation
//! - [`resolver`] - the public [`Resolver`](resolver::Resolver) orchestration
//! - [`core`] - error types shared across the crate
//!
//! # Example
//!
//! ```rust,no_run
//! use fetch_once::resolver::Resolver;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let resolver = Resolver::new()?;
//!
//! // Local paths pass through untouched.
//! let local = resolver.resolve("./policy/enforce.rego").await?;
//!
//! // Remote addresses are fetched once and reused for every subpath.
//! let dir = resolver
//!     .resolve("git::https://github.com/example/repo.git?ref=main")
//!     .await?;
//! let file = resolver
//!     .resolve("git::https://github.com/example/repo.git//policy/enforce.rego?ref=main")
//!     .await?;
//! assert!(file.starts_with(&dir));
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! [`Resolver::resolve`](resolver::Resolver::resolve) is safe to call from any
//! number of tasks with no external synchronization. Concurrent first access
//! to one base address elects a single fetcher; everyone else waits on a
//! notification and observes the same result, success or failure. Fetches for
//! distinct base addresses never block each other.
//!
//! Downloaded directories are never garbage collected by this crate; cleanup
//! is the caller's responsibility, and deleting a downloaded directory while
//! the process is still running leaves a dangling cache entry.

pub mod cache;
pub mod core;
pub mod downloader;
pub mod resolver;
pub mod source;
pub mod utils;
