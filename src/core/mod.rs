//! Core types shared across the crate.
//!
//! Currently this is the [`ResolveError`] taxonomy; every fallible public
//! operation in the crate bottoms out in one of its variants.

pub mod error;

pub use error::ResolveError;
