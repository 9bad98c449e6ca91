//! Sequential resolution behavior: local passthrough, base/subpath
//! handling, cache reuse, and error reporting.

use crate::common::{CountingDownloader, FlakyDownloader, resolver_with};
use anyhow::Result;
use fetch_once::core::ResolveError;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn test_local_path_passes_through_unchanged() -> Result<()> {
    let temp = TempDir::new()?;
    let file = temp.path().join("enforce.rego");
    std::fs::write(&file, "package enforce")?;

    let downloader = Arc::new(CountingDownloader::default());
    let resolver = resolver_with(temp.path(), downloader.clone());

    let source = file.to_str().unwrap();
    let resolved = resolver.resolve(source).await?;

    // Exact passthrough: no copy, no normalization, zero fetches.
    assert_eq!(resolved, PathBuf::from(source));
    assert_eq!(downloader.fetch_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_sequential_identical_sources_return_identical_paths() -> Result<()> {
    let temp = TempDir::new()?;
    let downloader = Arc::new(CountingDownloader::default());
    let resolver = resolver_with(temp.path(), downloader.clone());
    let source = "git::https://example.com/policies.git//policy/enforce.rego?ref=main";

    let first = resolver.resolve(source).await?;
    let second = resolver.resolve(source).await?;

    assert_eq!(first.to_str(), second.to_str());
    assert_eq!(downloader.fetch_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_sibling_subpaths_share_one_download() -> Result<()> {
    let temp = TempDir::new()?;
    let downloader = Arc::new(CountingDownloader::default());
    let resolver = resolver_with(temp.path(), downloader.clone());

    let root = resolver
        .resolve("git::https://example.com/policies.git?ref=main")
        .await?;
    let enforce = resolver
        .resolve("git::https://example.com/policies.git//policy/enforce.rego?ref=main")
        .await?;
    let allow = resolver
        .resolve("git::https://example.com/policies.git//policy/allow.rego?ref=main")
        .await?;

    assert_eq!(downloader.fetch_count(), 1);
    assert!(enforce.starts_with(&root));
    assert!(allow.starts_with(&root));
    assert_ne!(enforce, allow);
    Ok(())
}

#[tokio::test]
async fn test_different_refs_download_separately() -> Result<()> {
    let temp = TempDir::new()?;
    let downloader = Arc::new(CountingDownloader::default());
    let resolver = resolver_with(temp.path(), downloader.clone());

    let v1 = resolver
        .resolve("git::https://example.com/policies.git//policy?ref=v1")
        .await?;
    let v2 = resolver
        .resolve("git::https://example.com/policies.git//policy?ref=v2")
        .await?;

    assert_eq!(downloader.fetch_count(), 2);
    assert_ne!(v1, v2);
    Ok(())
}

#[tokio::test]
async fn test_missing_subpath_reports_path_not_found() -> Result<()> {
    let temp = TempDir::new()?;
    let downloader = Arc::new(CountingDownloader::default());
    let resolver = resolver_with(temp.path(), downloader.clone());
    let source = "git::https://example.com/policies.git//policy/nonexistent.rego?ref=main";

    let err = resolver.resolve(source).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ResolveError>(),
        Some(ResolveError::PathNotFound { .. })
    ));
    // The error context names the source being resolved.
    assert!(format!("{err:#}").contains(source));
    Ok(())
}

#[tokio::test]
async fn test_failed_fetch_is_retried_on_next_call() -> Result<()> {
    let temp = TempDir::new()?;
    let downloader = Arc::new(FlakyDownloader::failing_first(1));
    let resolver = resolver_with(temp.path(), downloader.clone());
    let source = "git::https://example.com/policies.git//policy/enforce.rego?ref=main";

    let err = resolver.resolve(source).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ResolveError>(),
        Some(ResolveError::FetchFailed { .. })
    ));
    assert!(format!("{err:#}").contains("simulated network failure"));

    // The failure was not cached; the next call fetches fresh and the
    // partial content from the failed attempt is gone.
    let resolved = resolver.resolve(source).await?;
    assert!(resolved.exists());
    assert_eq!(downloader.fetch_count(), 2);

    let base_dir = resolved.parent().unwrap().parent().unwrap();
    assert!(!base_dir.join("partial.bin").exists());
    Ok(())
}

#[tokio::test]
async fn test_empty_source_is_invalid() -> Result<()> {
    let temp = TempDir::new()?;
    let resolver = resolver_with(temp.path(), Arc::new(CountingDownloader::default()));

    let err = resolver.resolve("").await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ResolveError>(),
        Some(ResolveError::InvalidSource { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_fetch_timeout_fails_the_resolution() -> Result<()> {
    let temp = TempDir::new()?;
    let downloader = Arc::new(CountingDownloader::with_delay(
        std::time::Duration::from_secs(10),
    ));
    let resolver = resolver_with(temp.path(), downloader.clone())
        .with_fetch_timeout(std::time::Duration::from_millis(50));

    let err = resolver
        .resolve("git::https://example.com/policies.git?ref=main")
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ResolveError>(),
        Some(ResolveError::FetchFailed { .. })
    ));
    assert!(format!("{err:#}").contains("timed out"));
    Ok(())
}
