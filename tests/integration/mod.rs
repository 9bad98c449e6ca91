//! Integration test suite for fetch-once
//!
//! End-to-end tests of the resolver over an injected downloader, plus a
//! small suite that exercises the real git-backed downloader against local
//! fixture repositories.
//!
//! # Running
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test organization
//!
//! - **resolver_flow**: sequential resolution behavior - local passthrough,
//!   base/subpath splitting, cache reuse, error reporting
//! - **concurrency**: at-most-one-fetch guarantees under concurrent callers,
//!   failure propagation to waiters, retry after failure
//! - **git_fixture**: the default [`GitDownloader`] against local git
//!   repositories created on the fly
//!
//! [`GitDownloader`]: fetch_once::downloader::GitDownloader


mod git_fixture;
mod resolver_flow;
